//! JSON wire types of the Tableau REST API.
//!
//! Only the fields the exporter reads are modelled; everything else in a
//! response is ignored. Collections arrive wrapped twice
//! (`{"projects": {"project": [...]}}`) and an empty collection may be sent
//! as `{}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use tableau_rbac::{
    Capability, ContentItem, ContentKind, ContentPermissions, Effect, PermissionRule, Principal,
    PrincipalRef, Template,
};

use crate::error::{ApiError, ApiResult};

/// Pagination block of a listing response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    #[serde(default, deserialize_with = "flexible_u32")]
    pub page_number: u32,
    /// Requested page size.
    #[serde(default, deserialize_with = "flexible_u32")]
    pub page_size: u32,
    /// Total number of items across all pages.
    #[serde(default, deserialize_with = "flexible_u32")]
    pub total_available: u32,
}

// Counters are strings in some server versions and numbers in others.
fn flexible_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid counter: {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid counter: '{}'", s))),
        Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!(
            "invalid counter: {}",
            other
        ))),
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    /// Pagination counters, absent on unpaginated endpoints.
    #[serde(default)]
    pub pagination: Option<Pagination>,
    /// The collection wrapper(s), keyed by collection name.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Page {
    /// Items of `collection`, each stored under `element`.
    pub fn items<T: DeserializeOwned>(&self, collection: &str, element: &str) -> ApiResult<Vec<T>> {
        let Some(wrapper) = self.body.get(collection) else {
            return Ok(Vec::new());
        };
        let parse = |value: &Value| {
            serde_json::from_value::<T>(value.clone()).map_err(|e| {
                ApiError::InvalidResponse(format!("malformed {} entry: {}", element, e))
            })
        };
        match wrapper.get(element) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(values)) => values.iter().map(parse).collect(),
            Some(single) => Ok(vec![parse(single)?]),
        }
    }

    /// Whether no further page needs to be requested.
    ///
    /// Stops on an empty or short page, once `totalAvailable` is covered, or
    /// when the endpoint is not paginated at all.
    pub fn is_last(&self, page_number: u32, page_size: u32, received: usize) -> bool {
        if received == 0 || received < page_size as usize {
            return true;
        }
        match self.pagination {
            Some(pagination) => {
                u64::from(page_number) * u64::from(page_size)
                    >= u64::from(pagination.total_available)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IdRef {
    #[serde(default)]
    id: String,
}

/// A content item as listed by `/projects`, `/workbooks`, `/datasources`,
/// `/views` or `/flows`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireContent {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    parent_project_id: Option<String>,
    #[serde(default)]
    project: Option<IdRef>,
    #[serde(default)]
    workbook: Option<IdRef>,
    #[serde(default)]
    owner: Option<IdRef>,
    #[serde(default)]
    content_permissions: Option<String>,
}

impl WireContent {
    /// Convert into a [`ContentItem`] of the listed kind.
    pub fn into_item(self, kind: ContentKind) -> ContentItem {
        let parent = match kind {
            ContentKind::Project => self.parent_project_id,
            _ => self.project.map(|p| p.id),
        }
        .filter(|id| !id.is_empty());

        let mut item = ContentItem::new(self.id, self.name, kind);
        item.parent_project_id = parent;
        item.workbook_id = self
            .workbook
            .map(|w| w.id)
            .filter(|id| !id.is_empty() && kind == ContentKind::View);
        item.owner_id = self.owner.map(|o| o.id).filter(|id| !id.is_empty());
        if kind == ContentKind::Project {
            item.content_permissions = self
                .content_permissions
                .as_deref()
                .and_then(ContentPermissions::parse);
        }
        item
    }
}

/// A user as listed by `/users` or `/groups/{id}/users`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<WireUser> for Principal {
    fn from(user: WireUser) -> Self {
        // Sign-in names are unique; full names are not.
        let name = if user.name.is_empty() {
            user.full_name.unwrap_or_default()
        } else {
            user.name
        };
        let principal = Principal::user(user.id, name);
        match user.email.filter(|e| !e.is_empty()) {
            Some(email) => principal.with_email(email),
            None => principal,
        }
    }
}

/// A group as listed by `/groups`.
#[derive(Debug, Clone, Deserialize)]
pub struct WireGroup {
    id: String,
    #[serde(default)]
    name: String,
}

impl From<WireGroup> for Principal {
    fn from(group: WireGroup) -> Self {
        Principal::group(group.id, group.name)
    }
}

/// Body of a permissions or default-permissions response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionsResponse {
    #[serde(default)]
    permissions: Permissions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Permissions {
    #[serde(default)]
    grantee_capabilities: Vec<GranteeCapabilities>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GranteeCapabilities {
    #[serde(default)]
    user: Option<IdRef>,
    #[serde(default)]
    group: Option<IdRef>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    capabilities: WireCapabilities,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireCapabilities {
    #[serde(default)]
    capability: Vec<WireCapability>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireCapability {
    name: String,
    #[serde(default)]
    mode: String,
}

impl GranteeCapabilities {
    fn principal(&self) -> Option<PrincipalRef> {
        let non_empty = |r: &Option<IdRef>| r.as_ref().map(|r| r.id.clone()).filter(|id| !id.is_empty());
        non_empty(&self.group)
            .map(PrincipalRef::group)
            .or_else(|| non_empty(&self.user).map(PrincipalRef::user))
    }
}

impl PermissionsResponse {
    /// Convert into permission rules, in server order.
    ///
    /// A grantee yields a template rule for an explicit `template` attribute
    /// and for every allowed capability whose name is a template name, plus
    /// one explicit rule holding the remaining capabilities.
    pub fn into_rules(self, content_id: &str, applies_to: ContentKind) -> Vec<PermissionRule> {
        let mut rules = Vec::new();

        for grantee in self.permissions.grantee_capabilities {
            let Some(principal) = grantee.principal() else {
                debug!(content_id, "Skipping grantee without user or group");
                continue;
            };

            if let Some(template) = grantee.template.as_deref().filter(|t| !t.trim().is_empty()) {
                rules.push(PermissionRule::template(
                    content_id,
                    applies_to,
                    principal.clone(),
                    template.trim(),
                ));
            }

            let mut explicit = Vec::new();
            for capability in &grantee.capabilities.capability {
                let Some(effect) = Effect::parse(&capability.mode) else {
                    debug!(
                        content_id,
                        capability = %capability.name,
                        mode = %capability.mode,
                        "Dropping capability with unknown mode"
                    );
                    continue;
                };

                let parsed = Capability::parse(&capability.name);
                let names_template = matches!(parsed, Capability::Other(_) | Capability::ProjectLeader)
                    && Template::parse(&capability.name).is_some();

                if names_template && effect == Effect::Allow {
                    rules.push(PermissionRule::template(
                        content_id,
                        applies_to,
                        principal.clone(),
                        capability.name.trim(),
                    ));
                } else {
                    explicit.push((parsed, effect));
                }
            }

            if !explicit.is_empty() {
                rules.push(PermissionRule::explicit(
                    content_id, applies_to, principal, explicit,
                ));
            }
        }

        rules
    }
}

/// Sign-in request body.
#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest<'a> {
    credentials: SignInCredentials<'a>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInCredentials<'a> {
    personal_access_token_name: &'a str,
    personal_access_token_secret: &'a str,
    site: SiteRef<'a>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteRef<'a> {
    content_url: &'a str,
}

impl<'a> SignInRequest<'a> {
    /// Personal-access-token credentials for a site.
    pub fn personal_access_token(name: &'a str, secret: &'a str, site: &'a str) -> Self {
        Self {
            credentials: SignInCredentials {
                personal_access_token_name: name,
                personal_access_token_secret: secret,
                site: SiteRef { content_url: site },
            },
        }
    }
}

/// Sign-in response body.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInResponse {
    /// Session credentials.
    pub credentials: SessionCredentials,
}

/// Token and site identity returned by sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCredentials {
    /// Session token.
    pub token: String,
    /// Site signed in to.
    pub site: SignedInSite,
    /// Signed-in user.
    #[serde(default)]
    pub user: Option<SignedInUser>,
}

/// Site part of a sign-in response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedInSite {
    /// Site LUID.
    pub id: String,
    /// Site content URL.
    #[serde(default)]
    pub content_url: String,
}

/// User part of a sign-in response.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedInUser {
    /// User LUID.
    pub id: String,
}

/// Error body returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error details.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    /// Numeric error code, e.g. `401002`.
    #[serde(default)]
    pub code: String,
    /// Short summary.
    #[serde(default)]
    pub summary: String,
    /// Longer explanation.
    #[serde(default)]
    pub detail: String,
}

/// Best human-readable message for an error body.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse { error }) => {
            let text = match (error.summary.is_empty(), error.detail.is_empty()) {
                (false, false) => format!("{}: {}", error.summary, error.detail),
                (false, true) => error.summary,
                (true, false) => error.detail,
                (true, true) => "Unknown error".to_string(),
            };
            if error.code.is_empty() {
                text
            } else {
                format!("{} (code {})", text, error.code)
            }
        }
        Err(_) if body.trim().is_empty() => "Unknown error".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
