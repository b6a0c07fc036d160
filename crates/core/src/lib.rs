//! gitlab2gogs core library.
//!
//! This crate provides the components for migrating the repositories of a
//! GitLab backup archive into a Gogs server: the archive index, namespace
//! classification, scratch working areas, git and Gogs clients, the import
//! driver and the dry-run report.

pub mod archive;
pub mod config;
pub mod errors;
pub mod git;
pub mod gogs;
pub mod import;
pub mod namespace;
pub mod report;
pub mod workspace;

// Re-exports for convenience.
pub use archive::{BackupArchive, RepositoryRecord};
pub use config::MigrationConfig;
pub use git::{GitBackend, GitCli};
pub use gogs::{AdminCredentials, GogsClient, RemoteApi, RemoteSession};
pub use import::{ImportOutcome, ImportSummary, Importer};
pub use namespace::{ClassificationContext, KnownUsernames, Owner};
pub use report::AnalysisReport;
