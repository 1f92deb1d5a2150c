//! Tableau REST API client.
//!
//! HTTP client for the read-only part of the REST API the exporter needs:
//! sign-in/out, paginated content and principal listings, permissions and
//! default permissions, and group membership.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};

use tableau_rbac::{ContentItem, ContentKind, PermissionRule, Principal};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::retry::{with_retry_if, RetryConfig};
use crate::site::Site;
use crate::wire::{
    error_message, Page, PermissionsResponse, SignInRequest, SignInResponse, WireContent,
    WireGroup, WireUser,
};

/// Session token header.
pub const AUTH_HEADER: &str = "X-Tableau-Auth";

/// Tableau REST API client.
///
/// Holds no session state; every call takes the [`Site`] returned by
/// [`sign_in`](Self::sign_in).
#[derive(Clone)]
pub struct TableauClient {
    /// HTTP client instance.
    client: Client,

    /// Client configuration.
    config: ClientConfig,

    /// Retry policy for rate-limited and transient failures.
    retry: RetryConfig,
}

impl std::fmt::Debug for TableauClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableauClient")
            .field("server_url", &self.config.server_url)
            .field("api_version", &self.config.api_version)
            .finish()
    }
}

impl TableauClient {
    /// Create a new client.
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let client = Client::builder().timeout(config.timeout()).build()?;
        let retry = config.retry_config();

        Ok(Self {
            client,
            config,
            retry,
        })
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sign in with a personal access token.
    ///
    /// Rejected credentials, an unknown site and an unreachable server are
    /// all reported as [`ApiError::Auth`].
    #[instrument(skip(self, pat_secret), fields(server = %self.config.server_url))]
    pub async fn sign_in(
        &self,
        pat_name: &str,
        pat_secret: &str,
        site_content_url: &str,
    ) -> ApiResult<Site> {
        let api_base = self.config.api_base();
        let url = format!("{}/auth/signin", api_base);
        let body = SignInRequest::personal_access_token(pat_name, pat_secret, site_content_url);
        let (url, body) = (url.as_str(), &body);

        let result: ApiResult<SignInResponse> = with_retry_if(
            &self.retry,
            move || async move {
                let response = self
                    .client
                    .post(url)
                    .header(ACCEPT, "application/json")
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| {
                        ApiError::Auth(format!(
                            "cannot reach {}: {}",
                            self.config.server_url, e
                        ))
                    })?;
                handle_response(response).await
            },
            ApiError::is_retryable,
        )
        .await;

        let credentials = match result {
            Ok(response) => response.credentials,
            Err(ApiError::Api { status, message }) if (400..500).contains(&status) => {
                error!(status, "Sign-in rejected");
                return Err(ApiError::Auth(message));
            }
            Err(ApiError::Forbidden(message)) | Err(ApiError::NotFound(message)) => {
                error!("Sign-in rejected");
                return Err(ApiError::Auth(message));
            }
            Err(e) => return Err(e),
        };

        info!(site_id = %credentials.site.id, "Signed in");
        let site = Site::new(
            credentials.site.id,
            credentials.site.content_url,
            api_base,
            credentials.token,
        );
        Ok(match credentials.user {
            Some(user) => site.with_user(user.id),
            None => site,
        })
    }

    /// End a session. Best effort: failures are logged, not returned.
    #[instrument(skip(self, site), fields(site_id = %site.id))]
    pub async fn sign_out(&self, site: Site) {
        let url = format!("{}/auth/signout", site.api_base.trim_end_matches('/'));
        let result = self
            .client
            .post(&url)
            .header(AUTH_HEADER, site.token())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => debug!("Signed out"),
            Ok(response) => warn!(status = response.status().as_u16(), "Sign-out failed"),
            Err(e) => warn!(error = %e, "Sign-out failed"),
        }
    }

    /// Stream every item of a kind, optionally restricted to the direct
    /// children of a project.
    ///
    /// The stream is lazy and finite. Each call starts again from page 1, so
    /// a new call sees the current state of the site.
    pub fn list<'a>(
        &'a self,
        site: &'a Site,
        kind: ContentKind,
        parent: Option<&'a str>,
    ) -> BoxStream<'a, ApiResult<ContentItem>> {
        self.paginate::<WireContent>(
            site,
            kind.collection().to_string(),
            kind.collection(),
            kind.as_str(),
        )
        .map_ok(move |wire| wire.into_item(kind))
        .try_filter(move |item| {
            let keep = match parent {
                Some(parent) => item.parent_project_id.as_deref() == Some(parent),
                None => true,
            };
            futures::future::ready(keep)
        })
        .boxed()
    }

    /// Collect [`list`](Self::list) into a vector.
    #[instrument(skip(self, site, kind), fields(site_id = %site.id, kind = %kind))]
    pub async fn list_all(
        &self,
        site: &Site,
        kind: ContentKind,
        parent: Option<&str>,
    ) -> ApiResult<Vec<ContentItem>> {
        let items: Vec<ContentItem> = self.list(site, kind, parent).try_collect().await?;
        debug!(count = items.len(), "Listed content");
        Ok(items)
    }

    /// Permission rules attached directly to an item, in server order.
    #[instrument(skip(self, site, item), fields(item_id = %item.id, kind = %item.kind))]
    pub async fn get_permissions(
        &self,
        site: &Site,
        item: &ContentItem,
    ) -> ApiResult<Vec<PermissionRule>> {
        let url = site.url(&format!("{}/{}/permissions", item.kind.collection(), item.id));
        let response: PermissionsResponse = self.get_json(site, &url).await?;
        Ok(response.into_rules(&item.id, item.kind))
    }

    /// Default permission rules a project applies to new content of `kind`.
    ///
    /// Missing or unreadable defaults yield an empty list.
    #[instrument(skip(self, site, kind), fields(kind = %kind))]
    pub async fn get_default_permissions(
        &self,
        site: &Site,
        project_id: &str,
        kind: ContentKind,
    ) -> ApiResult<Vec<PermissionRule>> {
        if !ContentKind::default_permission_kinds().contains(&kind) {
            debug!("Projects hold no default permissions for this kind");
            return Ok(Vec::new());
        }

        let url = site.url(&format!(
            "projects/{}/default-permissions/{}",
            project_id,
            kind.collection()
        ));
        match self.get_json::<PermissionsResponse>(site, &url).await {
            Ok(response) => Ok(response.into_rules(project_id, kind)),
            Err(ApiError::NotFound(_)) | Err(ApiError::Forbidden(_)) => {
                debug!("Default permissions unavailable");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// All users of the site.
    #[instrument(skip(self, site), fields(site_id = %site.id))]
    pub async fn list_users(&self, site: &Site) -> ApiResult<Vec<Principal>> {
        self.paginate::<WireUser>(site, "users".to_string(), "users", "user")
            .map_ok(Principal::from)
            .try_collect()
            .await
    }

    /// All groups of the site.
    #[instrument(skip(self, site), fields(site_id = %site.id))]
    pub async fn list_groups(&self, site: &Site) -> ApiResult<Vec<Principal>> {
        self.paginate::<WireGroup>(site, "groups".to_string(), "groups", "group")
            .map_ok(Principal::from)
            .try_collect()
            .await
    }

    /// Users belonging to a group.
    #[instrument(skip(self, site))]
    pub async fn list_group_members(
        &self,
        site: &Site,
        group_id: &str,
    ) -> ApiResult<Vec<Principal>> {
        self.paginate::<WireUser>(site, format!("groups/{}/users", group_id), "users", "user")
            .map_ok(Principal::from)
            .try_collect()
            .await
    }

    /// Stream the entries of a paginated collection.
    fn paginate<'a, T>(
        &'a self,
        site: &'a Site,
        path: String,
        collection: &'static str,
        element: &'static str,
    ) -> BoxStream<'a, ApiResult<T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let page_size = self.config.page_size;

        stream::try_unfold(Some(1u32), move |next| {
            let url = site.url(&path);
            async move {
                let Some(page_number) = next else {
                    return Ok::<_, ApiError>(None);
                };

                let page_url = format!(
                    "{}?pageSize={}&pageNumber={}",
                    url, page_size, page_number
                );
                let page: Page = self.get_json(site, &page_url).await?;
                let items: Vec<T> = page.items(collection, element)?;
                debug!(
                    collection,
                    page_number,
                    received = items.len(),
                    "Fetched page"
                );

                let next = if page.is_last(page_number, page_size, items.len()) {
                    None
                } else {
                    Some(page_number + 1)
                };
                Ok(Some((stream::iter(items.into_iter().map(Ok::<T, ApiError>)), next)))
            }
        })
        .try_flatten()
        .boxed()
    }

    /// GET a JSON resource with retries.
    async fn get_json<T: DeserializeOwned>(&self, site: &Site, url: &str) -> ApiResult<T> {
        with_retry_if(
            &self.retry,
            move || async move {
                debug!(url, "GET");
                let response = self
                    .client
                    .get(url)
                    .header(AUTH_HEADER, site.token())
                    .header(ACCEPT, "application/json")
                    .send()
                    .await?;
                handle_response(response).await
            },
            ApiError::is_retryable,
        )
        .await
    }
}

/// Map a response to the decoded body or a typed error.
async fn handle_response<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        let err = ApiError::from_status(status.as_u16(), message);
        match &err {
            ApiError::Auth(message) => error!(%message, "Tableau authentication failed"),
            ApiError::NotFound(_) | ApiError::Forbidden(_) => {
                debug!(status = status.as_u16(), "Tableau API error")
            }
            other => warn!(status = status.as_u16(), error = %other, "Tableau API error"),
        }
        return Err(err);
    }

    response
        .json()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
}
