//! Gogs REST API v1 client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{debug, info, instrument};

use super::models::{
    AccessToken, CreateOrgOption, CreateRepoOption, CreateTokenOption, Organization, Repository,
    User,
};
use super::{RemoteApi, RemoteSession};
use crate::errors::GogsError;
use crate::namespace::Owner;

/// Asynchronous Gogs API client authenticated as the admin account.
#[derive(Debug, Clone)]
pub struct GogsClient {
    http: reqwest::Client,
    api_url: String,
    session: RemoteSession,
}

impl GogsClient {
    pub fn new(session: RemoteSession) -> Result<Self, GogsError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("gitlab2gogs/0.1"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        let api_url = session.api_url();
        info!(api_url = %api_url, admin = %session.admin(), "created GogsClient");
        Ok(Self {
            http,
            api_url,
            session,
        })
    }

    pub fn session(&self) -> &RemoteSession {
        &self.session
    }

    fn basic(&self, req: RequestBuilder) -> RequestBuilder {
        let creds = self.session.credentials();
        req.basic_auth(&creds.username, Some(&creds.password))
    }

    fn with_token(req: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("token {}", token.sha1))
    }

    #[instrument(skip(self))]
    pub async fn get_organization(&self, id: &str) -> Result<Option<Organization>, GogsError> {
        let url = format!("{}/orgs/{}", self.api_url, id);
        let resp = self.basic(self.http.get(&url)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_response(resp).await?;
        Ok(Some(resp.json().await?))
    }

    #[instrument(skip(self))]
    pub async fn list_tokens(&self, username: &str) -> Result<Vec<AccessToken>, GogsError> {
        let url = format!("{}/users/{}/tokens", self.api_url, username);
        let resp = check_response(self.basic(self.http.get(&url)).send().await?).await?;
        let tokens: Vec<AccessToken> = resp.json().await?;
        debug!(count = tokens.len(), "fetched tokens");
        Ok(tokens)
    }

    #[instrument(skip(self))]
    pub async fn create_token(&self, username: &str, name: &str) -> Result<AccessToken, GogsError> {
        let url = format!("{}/users/{}/tokens", self.api_url, username);
        let resp = self
            .basic(self.http.post(&url))
            .json(&CreateTokenOption { name })
            .send()
            .await?;
        let token: AccessToken = check_response(resp).await?.json().await?;
        info!(token_name = %token.name, "created access token");
        Ok(token)
    }
}

#[async_trait]
impl RemoteApi for GogsClient {
    #[instrument(skip(self))]
    async fn authenticate(&self) -> Result<User, GogsError> {
        let url = format!("{}/user", self.api_url);
        let resp = check_response(self.basic(self.http.get(&url)).send().await?).await?;
        let user: User = resp.json().await?;
        debug!(username = %user.username, "authenticated admin account");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn repo_exists(&self, owner: &str, name: &str) -> Result<bool, GogsError> {
        let url = format!("{}/repos/{}/{}", self.api_url, owner, name);
        let resp = self.basic(self.http.get(&url)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_response(resp).await?;
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn ensure_token(&self, username: &str) -> Result<AccessToken, GogsError> {
        let label = self.session.token_name();
        if let Some(token) = self
            .list_tokens(username)
            .await?
            .into_iter()
            .find(|t| t.name == label)
        {
            debug!(token_name = label, "reusing existing token");
            return Ok(token);
        }
        self.create_token(username, label).await
    }

    #[instrument(skip(self))]
    async fn ensure_organization(&self, id: &str, full_name: &str) -> Result<(), GogsError> {
        if self.get_organization(id).await?.is_some() {
            debug!("organization already exists");
            return Ok(());
        }
        let url = format!("{}/admin/users/{}/orgs", self.api_url, self.session.admin());
        let resp = self
            .basic(self.http.post(&url))
            .json(&CreateOrgOption {
                username: id,
                full_name,
            })
            .send()
            .await?;
        let org: Organization = check_response(resp).await?.json().await?;
        info!(org = %org.username, "created organization");
        Ok(())
    }

    #[instrument(skip(self, token, owner, description), fields(owner = %owner))]
    async fn create_repo(
        &self,
        token: &AccessToken,
        owner: &Owner,
        name: &str,
        description: &str,
    ) -> Result<Repository, GogsError> {
        let url = match owner {
            Owner::User { .. } => format!("{}/user/repos", self.api_url),
            Owner::Organization { id, .. } => format!("{}/org/{}/repos", self.api_url, id),
        };
        let payload = CreateRepoOption {
            name,
            description,
            private: false,
            auto_init: false,
        };
        let resp = Self::with_token(self.http.post(&url), token)
            .json(&payload)
            .send()
            .await?;
        let repo: Repository = check_response(resp).await?.json().await?;
        info!(repo = %repo.full_name, "created repository");
        Ok(repo)
    }

    fn push_url(&self, owner: &str, name: &str) -> Result<String, GogsError> {
        self.session.push_url(owner, name)
    }

    fn admin_username(&self) -> &str {
        self.session.admin()
    }
}

/// Map non-success statuses to [`GogsError`], passing successful responses
/// through.
async fn check_response(resp: Response) -> Result<Response, GogsError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GogsError::AuthenticationFailed(format!("HTTP {}", status)));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GogsError::ApiError {
        status: status.as_u16(),
        body: if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            body.trim().to_string()
        },
    })
}
