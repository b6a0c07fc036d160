//! Git operations backed by the `git` command-line client.
//!
//! libgit2 cannot read bundle files, so cloning and mirror pushing go
//! through the CLI. The resulting clone is inspected with `git2`.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use git2::Repository;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::remote_url::redact_url;
use super::{CloneSummary, GitBackend};
use crate::errors::GitError;

/// Runs `git` subprocesses.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            binary: "git".into(),
        }
    }
}

impl GitCli {
    /// Use a specific git executable instead of `git` from `$PATH`.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// `git --version`, used as a preflight check.
    pub async fn version(&self) -> Result<String, GitError> {
        let out = self.run_git(None, &["--version"]).await?;
        Ok(out.trim().to_string())
    }

    async fn run_git(&self, dir: Option<&Path>, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = Command::new(&self.binary);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let shown: Vec<String> = args.iter().map(|a| redact_url(a)).collect();
        debug!(cmd = %format!("git {}", shown.join(" ")), "running git command");

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::BinaryNotFound
            } else {
                GitError::IoError(e)
            }
        })?;

        if !output.status.success() {
            let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            for (raw, redacted) in args.iter().zip(&shown) {
                if raw != redacted {
                    stderr = stderr.replace(raw, redacted);
                }
            }
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(exit_code, %stderr, "git command failed");
            return Err(GitError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                exit_code,
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl GitBackend for GitCli {
    #[instrument(skip(self), fields(bundle = %bundle.display(), dest = %dest.display()))]
    async fn clone_bundle(&self, bundle: &Path, dest: &Path) -> Result<CloneSummary, GitError> {
        let bundle_str = bundle.to_string_lossy();
        let dest_str = dest.to_string_lossy();
        self.run_git(None, &["clone", "--mirror", "--quiet", &bundle_str, &dest_str])
            .await?;

        let summary = summarize(dest)?;
        info!(
            branches = summary.branches,
            tags = summary.tags,
            "cloned bundle"
        );
        Ok(summary)
    }

    #[instrument(skip(self, remote_url), fields(repo = %repo_dir.display(), remote = %redact_url(remote_url)))]
    async fn push_mirror(&self, repo_dir: &Path, remote_url: &str) -> Result<(), GitError> {
        self.run_git(Some(repo_dir), &["push", "--mirror", "--quiet", remote_url])
            .await?;
        info!("mirror push completed");
        Ok(())
    }
}

/// Count the branches and tags of a freshly cloned repository.
fn summarize(repo_dir: &Path) -> Result<CloneSummary, GitError> {
    let repo = Repository::open(repo_dir)?;
    let mut summary = CloneSummary::default();
    for reference in repo.references()? {
        let reference = reference?;
        if reference.is_branch() {
            summary.branches += 1;
        } else if reference.is_tag() {
            summary.tags += 1;
        }
    }
    Ok(summary)
}
