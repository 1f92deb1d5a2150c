//! Signed-in site handle.

/// An authenticated session on one site.
///
/// Created by [`TableauClient::sign_in`](crate::TableauClient::sign_in) and
/// passed explicitly to every call. Consumed by
/// [`TableauClient::sign_out`](crate::TableauClient::sign_out).
#[derive(Clone)]
pub struct Site {
    /// Site LUID.
    pub id: String,
    /// Site content URL (empty for the default site).
    pub content_url: String,
    /// Versioned API root the session was created against.
    pub api_base: String,
    /// Signed-in user LUID.
    pub user_id: Option<String>,
    token: String,
}

impl Site {
    /// Create a site handle from sign-in results.
    pub fn new(
        id: impl Into<String>,
        content_url: impl Into<String>,
        api_base: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content_url: content_url.into(),
            api_base: api_base.into(),
            user_id: None,
            token: token.into(),
        }
    }

    /// Set the signed-in user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Session token for the `X-Tableau-Auth` header.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// URL of a site-scoped resource.
    ///
    /// # Example
    ///
    /// ```
    /// use tableau_client::Site;
    ///
    /// let site = Site::new("s1", "", "https://host/api/3.23", "token");
    /// assert_eq!(
    ///     site.url("/workbooks/w1/permissions"),
    ///     "https://host/api/3.23/sites/s1/workbooks/w1/permissions"
    /// );
    /// ```
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/sites/{}/{}",
            self.api_base.trim_end_matches('/'),
            self.id,
            path.trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("id", &self.id)
            .field("content_url", &self.content_url)
            .field("api_base", &self.api_base)
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}
