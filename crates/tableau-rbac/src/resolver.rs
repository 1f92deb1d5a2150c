//! # Permission Resolution
//!
//! Turns the permission rules of one or more items into effective
//! capability grants.
//!
//! ## Precedence
//!
//! For each `(item, applies_to, principal, capability)`:
//!
//! 1. An explicit capability mode beats anything a template implies.
//! 2. Between explicit modes, deny beats allow.
//! 3. Between template expansions, deny beats allow.
//!
//! Unknown template names produce a [`ResolveWarning`] and no grants.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capabilities::{Capability, Effect};
use crate::kinds::ContentKind;
use crate::rules::{CapabilityGrant, PermissionRule, PrincipalRef, RuleBody};
use crate::templates::Template;

/// A non-fatal problem met while resolving rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveWarning {
    /// A rule referenced a template the static table does not know.
    UnrecognizedTemplate {
        /// Item the rule was attached to.
        content_id: String,
        /// Grantee of the rule.
        principal: PrincipalRef,
        /// Template name as sent by the server.
        template: String,
    },
}

impl std::fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveWarning::UnrecognizedTemplate {
                content_id,
                principal,
                template,
            } => write!(
                f,
                "unrecognized template '{}' for {} on {}",
                template, principal, content_id
            ),
        }
    }
}

/// Grants and warnings produced by [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Effective grants, sorted.
    pub grants: Vec<CapabilityGrant>,
    /// Rules that could not be resolved.
    pub warnings: Vec<ResolveWarning>,
}

#[derive(Default)]
struct Slot {
    explicit: Option<Effect>,
    template: Option<Effect>,
}

impl Slot {
    fn effective(&self) -> Option<Effect> {
        self.explicit.or(self.template)
    }
}

type GrantKey = (String, ContentKind, PrincipalRef, Capability);

/// Resolve a set of rules into effective grants.
///
/// Rules for several items may be mixed; grants are keyed by item. A
/// project-leader template on a project additionally expands into the
/// default-permission kinds (workbooks, data sources, flows) of that project.
///
/// # Example
///
/// ```
/// use tableau_rbac::{resolve, Capability, ContentKind, Effect, PermissionRule, PrincipalRef};
///
/// let group = PrincipalRef::group("g1");
/// let rules = vec![
///     PermissionRule::template("w1", ContentKind::Workbook, group.clone(), "Viewer"),
///     PermissionRule::explicit(
///         "w1",
///         ContentKind::Workbook,
///         group.clone(),
///         vec![(Capability::ExportData, Effect::Deny)],
///     ),
/// ];
///
/// let resolution = resolve(&rules);
/// let export = resolution
///     .grants
///     .iter()
///     .find(|g| g.capability == Capability::ExportData)
///     .unwrap();
/// assert_eq!(export.effect, Effect::Deny);
/// assert!(resolution.warnings.is_empty());
/// ```
pub fn resolve(rules: &[PermissionRule]) -> Resolution {
    let mut slots: BTreeMap<GrantKey, Slot> = BTreeMap::new();
    let mut warnings = Vec::new();

    for rule in rules {
        match &rule.body {
            RuleBody::Explicit(capabilities) => {
                for (capability, effect) in capabilities {
                    let slot = slots
                        .entry(key(rule, rule.applies_to, capability))
                        .or_default();
                    slot.explicit = Some(merge(slot.explicit, *effect));
                }
            }
            RuleBody::Template(name) => {
                let Some(template) = Template::parse(name) else {
                    tracing::warn!(
                        content_id = %rule.content_id,
                        principal = %rule.principal,
                        template = %name,
                        "Skipping unrecognized permission template"
                    );
                    warnings.push(ResolveWarning::UnrecognizedTemplate {
                        content_id: rule.content_id.clone(),
                        principal: rule.principal.clone(),
                        template: name.clone(),
                    });
                    continue;
                };

                for kind in expansion_kinds(rule.applies_to, template) {
                    for (capability, effect) in template.expand(kind) {
                        let slot = slots.entry(key(rule, kind, &capability)).or_default();
                        slot.template = Some(merge(slot.template, effect));
                    }
                }
            }
        }
    }

    let grants = slots
        .into_iter()
        .filter_map(|((content_id, applies_to, principal, capability), slot)| {
            slot.effective().map(|effect| CapabilityGrant {
                content_id,
                applies_to,
                principal,
                capability,
                effect,
            })
        })
        .collect();

    Resolution { grants, warnings }
}

fn key(rule: &PermissionRule, applies_to: ContentKind, capability: &Capability) -> GrantKey {
    (
        rule.content_id.clone(),
        applies_to,
        rule.principal.clone(),
        capability.clone(),
    )
}

fn merge(current: Option<Effect>, next: Effect) -> Effect {
    match current {
        Some(effect) => effect.combine(next),
        None => next,
    }
}

fn expansion_kinds(applies_to: ContentKind, template: Template) -> Vec<ContentKind> {
    let mut kinds = vec![applies_to];
    if applies_to == ContentKind::Project && template.is_project_leader() {
        kinds.extend_from_slice(ContentKind::default_permission_kinds());
    }
    kinds
}
