//! Git operations for gitlab2gogs.

pub mod cli;
pub mod remote_url;

use std::path::Path;

use async_trait::async_trait;

use crate::errors::GitError;

pub use cli::GitCli;

/// Ref counts of a clone made from a bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneSummary {
    pub branches: usize,
    pub tags: usize,
}

/// The git operations the import driver needs.
#[async_trait]
pub trait GitBackend: Send + Sync {
    /// Make a full (mirror) clone of `bundle` at `dest`.
    async fn clone_bundle(&self, bundle: &Path, dest: &Path) -> Result<CloneSummary, GitError>;

    /// Push every ref of the clone at `repo_dir` to `remote_url`.
    async fn push_mirror(&self, repo_dir: &Path, remote_url: &str) -> Result<(), GitError>;
}
