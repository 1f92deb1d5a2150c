//! Content access seam used by the exporter.

use async_trait::async_trait;
use tracing::instrument;

use tableau_rbac::{ContentItem, ContentKind, PermissionRule, Principal};

use crate::client::TableauClient;
use crate::config::ClientConfig;
use crate::error::ApiResult;
use crate::site::Site;

/// Read access to one signed-in site.
///
/// Implemented by [`Session`] over HTTP; tests substitute in-memory sites.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Every item of a kind, optionally only the direct children of a project.
    async fn list_all(
        &self,
        kind: ContentKind,
        parent: Option<&str>,
    ) -> ApiResult<Vec<ContentItem>>;

    /// Rules attached to an item.
    async fn get_permissions(&self, item: &ContentItem) -> ApiResult<Vec<PermissionRule>>;

    /// Default rules a project applies to content of `kind`.
    async fn get_default_permissions(
        &self,
        project_id: &str,
        kind: ContentKind,
    ) -> ApiResult<Vec<PermissionRule>>;

    /// All users of the site.
    async fn list_users(&self) -> ApiResult<Vec<Principal>>;

    /// All groups of the site.
    async fn list_groups(&self) -> ApiResult<Vec<Principal>>;

    /// Users belonging to a group.
    async fn list_group_members(&self, group_id: &str) -> ApiResult<Vec<Principal>>;
}

/// A client bound to a signed-in site.
#[derive(Debug)]
pub struct Session {
    client: TableauClient,
    site: Site,
}

impl Session {
    /// Build a client from `config` and sign in with a personal access token.
    #[instrument(skip(config, pat_secret), fields(server = %config.server_url))]
    pub async fn sign_in(
        config: ClientConfig,
        pat_name: &str,
        pat_secret: &str,
        site_content_url: &str,
    ) -> ApiResult<Self> {
        let client = TableauClient::new(config)?;
        let site = client
            .sign_in(pat_name, pat_secret, site_content_url)
            .await?;
        Ok(Self { client, site })
    }

    /// Wrap an existing client and site.
    pub fn new(client: TableauClient, site: Site) -> Self {
        Self { client, site }
    }

    /// Signed-in site.
    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Underlying client.
    pub fn client(&self) -> &TableauClient {
        &self.client
    }

    /// End the session.
    pub async fn sign_out(self) {
        self.client.sign_out(self.site).await;
    }
}

#[async_trait]
impl ContentApi for Session {
    async fn list_all(
        &self,
        kind: ContentKind,
        parent: Option<&str>,
    ) -> ApiResult<Vec<ContentItem>> {
        self.client.list_all(&self.site, kind, parent).await
    }

    async fn get_permissions(&self, item: &ContentItem) -> ApiResult<Vec<PermissionRule>> {
        self.client.get_permissions(&self.site, item).await
    }

    async fn get_default_permissions(
        &self,
        project_id: &str,
        kind: ContentKind,
    ) -> ApiResult<Vec<PermissionRule>> {
        self.client
            .get_default_permissions(&self.site, project_id, kind)
            .await
    }

    async fn list_users(&self) -> ApiResult<Vec<Principal>> {
        self.client.list_users(&self.site).await
    }

    async fn list_groups(&self) -> ApiResult<Vec<Principal>> {
        self.client.list_groups(&self.site).await
    }

    async fn list_group_members(&self, group_id: &str) -> ApiResult<Vec<Principal>> {
        self.client.list_group_members(&self.site, group_id).await
    }
}
