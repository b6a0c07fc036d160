//! Error types for the gitlab2gogs core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type. [`ImportError`] is the per-record taxonomy. The driver reports
//! it and moves on to the next record, except for rejected credentials,
//! which end the run.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for failures that end a whole run.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Gogs(#[from] GogsError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Archive errors
// ---------------------------------------------------------------------------

/// Errors from reading the backup archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file could not be opened or is not a valid tar archive.
    #[error("cannot open backup archive '{path}': {detail}")]
    Open { path: String, detail: String },

    /// The requested member is not present in the archive.
    #[error("archive member not found: {0}")]
    MemberNotFound(String),

    /// The member path would unpack outside the destination directory.
    #[error("archive member escapes the extraction directory: {0}")]
    UnsafePath(String),

    /// Extracting a member failed.
    #[error("failed to extract '{member}': {source}")]
    Extract {
        member: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O wrapper.
    #[error("archive I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local git operations (CLI and `git2`).
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found")]
    BinaryNotFound,

    /// A `git` command exited with a non-zero status.
    #[error("git {command} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Gogs API errors
// ---------------------------------------------------------------------------

/// Errors from Gogs REST API interactions.
#[derive(Debug, Error)]
pub enum GogsError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("Gogs HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("Gogs API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// The administrative credentials were rejected.
    #[error("Gogs authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The configured base URL cannot be used.
    #[error("invalid Gogs URL '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Per-record import errors
// ---------------------------------------------------------------------------

/// Failure of a single repository record.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Staging the bundle or cloning it failed.
    #[error("clone failed for '{bundle}': {detail}")]
    Clone { bundle: String, detail: String },

    /// The remote rejected the credentials in the middle of a run.
    #[error("credentials rejected while importing '{owner}/{name}': {source}")]
    Unauthorized {
        owner: String,
        name: String,
        #[source]
        source: GogsError,
    },

    /// Creating the destination or pushing to it failed.
    #[error("import of '{owner}/{name}' failed: {detail}")]
    Import {
        owner: String,
        name: String,
        detail: String,
    },
}

impl ImportError {
    pub(crate) fn clone_failed(bundle: &str, err: impl std::fmt::Display) -> Self {
        Self::Clone {
            bundle: bundle.to_string(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn import_failed(owner: &str, name: &str, err: impl std::fmt::Display) -> Self {
        Self::Import {
            owner: owner.to_string(),
            name: name.to_string(),
            detail: err.to_string(),
        }
    }

    /// Like [`ImportError::import_failed`], but keeps rejected credentials
    /// apart so the driver can stop the run.
    pub(crate) fn remote_failed(owner: &str, name: &str, err: GogsError) -> Self {
        match err {
            GogsError::AuthenticationFailed(_) => Self::Unauthorized {
                owner: owner.to_string(),
                name: name.to_string(),
                source: err,
            },
            other => Self::import_failed(owner, name, other),
        }
    }
}
