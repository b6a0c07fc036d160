//! Import driver: replays every repository of a backup archive into Gogs.
//!
//! Each record moves through `Discovered -> Staged -> Cloned` and ends as
//! imported, skipped (destination already exists) or failed. A failure only
//! ends its own record and the run continues with the next one, unless the
//! remote rejected the credentials: that ends the run. The working
//! area of a record is removed on every exit path, including cancellation,
//! because it is owned by the record's future.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info, instrument, warn};

use crate::archive::{BackupArchive, RepositoryRecord};
use crate::errors::{CoreError, ImportError};
use crate::git::GitBackend;
use crate::gogs::RemoteApi;
use crate::namespace::{organization_collisions, ClassificationContext, Owner};
use crate::workspace::WorkArea;

/// Description given to every repository the importer creates.
pub fn import_description() -> String {
    Local::now()
        .format("Imported from GitLab-backup on %x at %X")
        .to_string()
}

/// Successful end state of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported { owner: Owner, name: String },
    /// The destination already existed; nothing was created or pushed.
    Skipped { owner: Owner, name: String },
}

impl ImportOutcome {
    pub fn owner(&self) -> &Owner {
        match self {
            Self::Imported { owner, .. } | Self::Skipped { owner, .. } => owner,
        }
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imported { owner, name } => write!(f, "{}/{}", owner.segment(), name),
            Self::Skipped { owner, name } => write!(
                f,
                "repository {} for {} already exists - skipping",
                name, owner
            ),
        }
    }
}

/// A record that could not be imported.
#[derive(Debug)]
pub struct RecordFailure {
    pub record: RepositoryRecord,
    pub error: ImportError,
}

/// Totals for one import run.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub failures: Vec<RecordFailure>,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.imported + self.skipped + self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    fn record(&mut self, record: &RepositoryRecord, result: Result<ImportOutcome, ImportError>) {
        match result {
            Ok(ImportOutcome::Imported { .. }) => self.imported += 1,
            Ok(ImportOutcome::Skipped { .. }) => self.skipped += 1,
            Err(error) => self.failures.push(RecordFailure {
                record: record.clone(),
                error,
            }),
        }
    }
}

/// Drives the import of an archive against a remote and a git backend.
pub struct Importer<'a, R: ?Sized, G: ?Sized> {
    archive: &'a BackupArchive,
    context: &'a ClassificationContext,
    remote: &'a R,
    git: &'a G,
    work_dir: Option<PathBuf>,
}

impl<'a, R, G> Importer<'a, R, G>
where
    R: RemoteApi + ?Sized,
    G: GitBackend + ?Sized,
{
    pub fn new(
        archive: &'a BackupArchive,
        context: &'a ClassificationContext,
        remote: &'a R,
        git: &'a G,
    ) -> Self {
        Self {
            archive,
            context,
            remote,
            git,
            work_dir: None,
        }
    }

    /// Create working areas under `dir` instead of the system temp dir.
    pub fn with_work_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.work_dir = dir;
        self
    }

    /// Import every record of the archive, one at a time, in archive order.
    ///
    /// `progress` is called with each record's result before the next
    /// record starts. Rejected credentials stop the run and are returned as
    /// the error; every other failure is collected in the summary.
    pub async fn import_all<F>(&self, mut progress: F) -> Result<ImportSummary, CoreError>
    where
        F: FnMut(&RepositoryRecord, &Result<ImportOutcome, ImportError>),
    {
        let collisions = organization_collisions(
            self.context,
            self.archive.records().map(|r| r.namespace.as_str()),
        );
        for collision in &collisions {
            warn!(
                org = %collision.id,
                groups = ?collision.groups,
                "several groups map to one organization; their repositories will share it"
            );
        }

        let mut summary = ImportSummary::default();
        for record in self.archive.records() {
            let result = self.import_record(record).await;
            if let Err(e) = &result {
                warn!(bundle = %record.bundle_path, error = %e, "record failed");
            }
            progress(record, &result);
            match result {
                Err(ImportError::Unauthorized { source, .. }) => {
                    error!(
                        imported = summary.imported,
                        skipped = summary.skipped,
                        "credentials rejected, stopping the import"
                    );
                    return Err(source.into());
                }
                result => summary.record(record, result),
            }
        }

        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            failed = summary.failures.len(),
            "import finished"
        );
        Ok(summary)
    }

    /// Stage, clone and import a single record.
    #[instrument(skip(self, record), fields(bundle = %record.bundle_path))]
    pub async fn import_record(
        &self,
        record: &RepositoryRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let clone_err = |e: &dyn fmt::Display| ImportError::clone_failed(&record.bundle_path, e);

        let area = WorkArea::create(self.work_dir.as_deref()).map_err(|e| clone_err(&e))?;
        let bundle = self
            .archive
            .extract(record, area.path())
            .await
            .map_err(|e| clone_err(&e))?;

        let clone_dir = area.clone_dir();
        self.git
            .clone_bundle(&bundle, &clone_dir)
            .await
            .map_err(|e| clone_err(&e))?;

        let owner = self.context.classify(record);
        match &owner {
            Owner::User { .. } => info!(repo = %record.name, "importing user repository"),
            Owner::Organization { .. } => {
                info!(repo = %record.name, "importing organization repository")
            }
        }
        self.import_clone(owner, &record.name, &clone_dir).await
    }

    /// Create-or-skip the destination and mirror push the clone.
    async fn import_clone(
        &self,
        owner: Owner,
        name: &str,
        clone_dir: &Path,
    ) -> Result<ImportOutcome, ImportError> {
        let segment = owner.segment().to_string();
        let remote_failed = |e| ImportError::remote_failed(&segment, name, e);

        if self
            .remote
            .repo_exists(&segment, name)
            .await
            .map_err(remote_failed)?
        {
            warn!(repo = %name, owner = %owner, "repository already exists - skipping");
            return Ok(ImportOutcome::Skipped {
                owner,
                name: name.to_string(),
            });
        }

        let token = match &owner {
            Owner::User { name: user } => self.remote.ensure_token(user).await,
            Owner::Organization { group, id } => {
                let token = self
                    .remote
                    .ensure_token(self.remote.admin_username())
                    .await
                    .map_err(remote_failed)?;
                self.remote
                    .ensure_organization(id, group)
                    .await
                    .map(|_| token)
            }
        }
        .map_err(remote_failed)?;

        self.remote
            .create_repo(&token, &owner, name, &import_description())
            .await
            .map_err(remote_failed)?;

        let url = self.remote.push_url(&segment, name).map_err(remote_failed)?;
        self.git
            .push_mirror(clone_dir, &url)
            .await
            .map_err(|e| ImportError::import_failed(&segment, name, e))?;

        Ok(ImportOutcome::Imported {
            owner,
            name: name.to_string(),
        })
    }
}
