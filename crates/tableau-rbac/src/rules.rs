//! # Permission Rules and Grants
//!
//! A [`PermissionRule`] is what the server reports for one grantee on one
//! item: either a template name or an explicit capability list. Resolution
//! turns rules into [`CapabilityGrant`]s, the flattened unit of the report.

use serde::{Deserialize, Serialize};

use crate::capabilities::{Capability, Effect};
use crate::kinds::{ContentKind, PrincipalKind};

/// A reference to a user or group by ID.
///
/// Ordered by kind, then ID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrincipalRef {
    /// User or group.
    pub kind: PrincipalKind,
    /// Principal ID.
    pub id: String,
}

impl PrincipalRef {
    /// Reference a user.
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::User,
            id: id.into(),
        }
    }

    /// Reference a group.
    pub fn group(id: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Group,
            id: id.into(),
        }
    }

    /// Whether this references a group.
    pub fn is_group(&self) -> bool {
        self.kind == PrincipalKind::Group
    }
}

impl std::fmt::Display for PrincipalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A user or group with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Principal ID.
    pub id: String,
    /// Display name (user name or group name).
    pub name: String,
    /// User or group.
    pub kind: PrincipalKind,
    /// Email address, for users that have one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Principal {
    /// Create a user principal.
    pub fn user(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: PrincipalKind::User,
            email: None,
        }
    }

    /// Create a group principal.
    pub fn group(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: PrincipalKind::Group,
            email: None,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Reference to this principal.
    pub fn to_ref(&self) -> PrincipalRef {
        PrincipalRef {
            kind: self.kind,
            id: self.id.clone(),
        }
    }
}

/// What a rule grants: a template, or an explicit capability list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleBody {
    /// A template by name. The name is kept verbatim so unknown templates can
    /// be reported.
    Template(String),
    /// Explicit capability modes.
    Explicit(Vec<(Capability, Effect)>),
}

/// One grantee's permissions on one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Item the rule is attached to.
    pub content_id: String,
    /// Kind of content the rule governs. Equal to the item's kind, except for
    /// a project's default permissions for the content inside it.
    pub applies_to: ContentKind,
    /// Grantee.
    pub principal: PrincipalRef,
    /// Template or explicit capabilities.
    pub body: RuleBody,
}

impl PermissionRule {
    /// Create a template rule.
    pub fn template(
        content_id: impl Into<String>,
        applies_to: ContentKind,
        principal: PrincipalRef,
        template: impl Into<String>,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            applies_to,
            principal,
            body: RuleBody::Template(template.into()),
        }
    }

    /// Create an explicit rule.
    pub fn explicit(
        content_id: impl Into<String>,
        applies_to: ContentKind,
        principal: PrincipalRef,
        capabilities: Vec<(Capability, Effect)>,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            applies_to,
            principal,
            body: RuleBody::Explicit(capabilities),
        }
    }

    /// Whether the rule is template-based.
    pub fn is_template(&self) -> bool {
        matches!(self.body, RuleBody::Template(_))
    }
}

/// A resolved allow/deny of one capability for one principal on one item.
///
/// Ordered by item, applies_to, principal, capability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CapabilityGrant {
    /// Item the grant is attached to.
    pub content_id: String,
    /// Kind of content the capability governs.
    pub applies_to: ContentKind,
    /// Grantee.
    pub principal: PrincipalRef,
    /// The capability.
    pub capability: Capability,
    /// Allow or deny.
    pub effect: Effect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_ref_ordering() {
        let mut refs = vec![
            PrincipalRef::group("b"),
            PrincipalRef::user("z"),
            PrincipalRef::group("a"),
        ];
        refs.sort();
        assert_eq!(
            refs,
            vec![
                PrincipalRef::user("z"),
                PrincipalRef::group("a"),
                PrincipalRef::group("b"),
            ]
        );
    }

    #[test]
    fn test_principal_to_ref() {
        let alice = Principal::user("u1", "alice").with_email("alice@example.com");
        assert_eq!(alice.to_ref(), PrincipalRef::user("u1"));
        assert_eq!(alice.email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_rule_constructors() {
        let rule = PermissionRule::template("w1", ContentKind::Workbook, PrincipalRef::group("g1"), "Viewer");
        assert!(rule.is_template());

        let rule = PermissionRule::explicit(
            "w1",
            ContentKind::Workbook,
            PrincipalRef::user("u1"),
            vec![(Capability::Read, Effect::Allow)],
        );
        assert!(!rule.is_template());
    }

    #[test]
    fn test_principal_ref_display() {
        assert_eq!(PrincipalRef::group("g1").to_string(), "group:g1");
    }
}
