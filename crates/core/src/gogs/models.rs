//! Gogs API v1 payloads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    #[serde(alias = "login")]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

/// A personal access token. `sha1` is the secret value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub name: String,
    pub sha1: String,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("name", &self.name)
            .field("sha1", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub clone_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateTokenOption<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateOrgOption<'a> {
    pub username: &'a str,
    pub full_name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateRepoOption<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub private: bool,
    pub auto_init: bool,
}
