//! Gogs remote: session data, the API seam used by the importer, and the
//! HTTP implementation.

pub mod client;
pub mod models;

use std::fmt;

use async_trait::async_trait;

use crate::errors::GogsError;
use crate::git::remote_url;
use crate::namespace::Owner;

pub use client::GogsClient;
pub use models::{AccessToken, Organization, Repository, User};

/// Client label used for tokens the importer creates.
pub const DEFAULT_TOKEN_NAME: &str = "gitlab2gogs";

/// Administrative account used for every remote call and the mirror push.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Connection parameters for one run. Read-only after construction.
#[derive(Debug, Clone)]
pub struct RemoteSession {
    base_url: String,
    credentials: AdminCredentials,
    token_name: String,
}

impl RemoteSession {
    pub fn new(
        base_url: &str,
        credentials: AdminCredentials,
        token_name: impl Into<String>,
    ) -> Result<Self, GogsError> {
        Ok(Self {
            base_url: remote_url::normalize_base_url(base_url)?,
            credentials,
            token_name: token_name.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_url(&self) -> String {
        format!("{}/api/v1", self.base_url)
    }

    pub fn credentials(&self) -> &AdminCredentials {
        &self.credentials
    }

    pub fn admin(&self) -> &str {
        &self.credentials.username
    }

    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    /// Authenticated git URL for `owner/name`.
    pub fn push_url(&self, owner: &str, name: &str) -> Result<String, GogsError> {
        remote_url::push_url(
            &self.base_url,
            &self.credentials.username,
            &self.credentials.password,
            owner,
            name,
        )
    }
}

/// Remote operations needed to import one repository.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Verify the administrative credentials.
    async fn authenticate(&self) -> Result<User, GogsError>;

    async fn repo_exists(&self, owner: &str, name: &str) -> Result<bool, GogsError>;

    /// Return the token named after the session's client label for
    /// `username`, creating it if absent.
    async fn ensure_token(&self, username: &str) -> Result<AccessToken, GogsError>;

    /// Create organization `id` owned by the admin account unless it exists.
    async fn ensure_organization(&self, id: &str, full_name: &str) -> Result<(), GogsError>;

    async fn create_repo(
        &self,
        token: &AccessToken,
        owner: &Owner,
        name: &str,
        description: &str,
    ) -> Result<Repository, GogsError>;

    /// Git remote URL the clone is pushed to.
    fn push_url(&self, owner: &str, name: &str) -> Result<String, GogsError>;

    /// Name of the administrative account the session runs as.
    fn admin_username(&self) -> &str;
}
