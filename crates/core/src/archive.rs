//! Index over the repository bundles stored in a GitLab backup archive.
//!
//! A GitLab backup is a tar file. Every project repository is stored as a
//! git bundle at `repositories/<namespace>/<name>.bundle`, where the
//! namespace is a username or a (possibly nested) group path.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures::StreamExt;
use regex_lite::Regex;
use tokio::fs::File;
use tokio::io::BufReader;
use tokio_tar::Archive;
use tracing::{debug, info, instrument};

use crate::errors::ArchiveError;

static BUNDLE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^repositories/(.+)/([^/]+)\.bundle$").expect("bundle path pattern is valid")
});

/// One importable repository found in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRecord {
    /// Archive-relative path of the bundle member.
    pub bundle_path: String,
    /// Source namespace (username or group path), case as stored.
    pub namespace: String,
    /// Repository name without the `.bundle` extension.
    pub name: String,
}

impl RepositoryRecord {
    /// Build a record from an archive member path, or `None` if the path is
    /// not a repository bundle.
    pub fn from_member_path(member: &str) -> Option<Self> {
        let normalized = member.strip_prefix("./").unwrap_or(member);
        let caps = BUNDLE_PATH.captures(normalized)?;
        let namespace = caps.get(1)?.as_str();
        let name = caps.get(2)?.as_str();

        // Empty, `.` and `..` segments would stage the bundle outside the
        // working area.
        let bad_segment = |s: &str| s.is_empty() || s == "." || s == "..";
        if namespace.split('/').any(bad_segment) || bad_segment(name) {
            return None;
        }

        Some(Self {
            bundle_path: member.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

/// An opened backup archive with its repository member list cached.
#[derive(Debug, Clone)]
pub struct BackupArchive {
    path: PathBuf,
    records: Vec<RepositoryRecord>,
    member_count: usize,
}

impl BackupArchive {
    /// Open the archive at `path` and index its repository bundles.
    ///
    /// Fails if the file is missing or not a readable tar archive. An empty
    /// archive opens fine and has no records.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let open_err = |detail: String| ArchiveError::Open {
            path: path.display().to_string(),
            detail,
        };

        let mut archive = open_tar(path).await.map_err(|e| open_err(e.to_string()))?;
        let entries = archive.entries().map_err(|e| open_err(e.to_string()))?;
        let mut entries = std::pin::pin!(entries);

        let mut records = Vec::new();
        let mut member_count = 0usize;
        while let Some(entry) = entries.next().await {
            let entry = entry.map_err(|e| open_err(e.to_string()))?;
            member_count += 1;

            if !entry.header().entry_type().is_file() {
                continue;
            }
            let member = member_name(entry.path_bytes());
            match RepositoryRecord::from_member_path(&member) {
                Some(record) => {
                    debug!(bundle = %record.bundle_path, "found repository bundle");
                    records.push(record);
                }
                None => debug!(member = %member, "skipping non-bundle member"),
            }
        }

        info!(members = member_count, bundles = records.len(), "indexed backup archive");
        Ok(Self {
            path: path.to_path_buf(),
            records,
            member_count,
        })
    }

    /// Iterate the repository records in archive order.
    ///
    /// Each call starts again from the first record.
    pub fn records(&self) -> std::slice::Iter<'_, RepositoryRecord> {
        self.records.iter()
    }

    /// Number of repository bundles in the archive.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total number of members (bundles and everything else).
    pub fn member_count(&self) -> usize {
        self.member_count
    }

    /// Unpack the bundle member of `record` to `dest_dir/<bundle_path>`.
    ///
    /// Returns the path of the unpacked bundle file. A member whose path
    /// would land outside `dest_dir` is refused.
    #[instrument(skip(self), fields(bundle = %record.bundle_path))]
    pub async fn extract(
        &self,
        record: &RepositoryRecord,
        dest_dir: &Path,
    ) -> Result<PathBuf, ArchiveError> {
        let mut archive = open_tar(&self.path).await?;
        let entries = archive.entries()?;
        let mut entries = std::pin::pin!(entries);

        while let Some(entry) = entries.next().await {
            let mut entry = entry?;
            if member_name(entry.path_bytes()) != record.bundle_path {
                continue;
            }

            let relative = record
                .bundle_path
                .strip_prefix("./")
                .unwrap_or(&record.bundle_path);
            let target = dest_dir.join(relative);
            let unpacked = entry
                .unpack_in(dest_dir)
                .await
                .map_err(|source| ArchiveError::Extract {
                    member: record.bundle_path.clone(),
                    source,
                })?;
            if !unpacked {
                return Err(ArchiveError::UnsafePath(record.bundle_path.clone()));
            }

            debug!(target = %target.display(), "extracted bundle");
            return Ok(target);
        }

        Err(ArchiveError::MemberNotFound(record.bundle_path.clone()))
    }
}

async fn open_tar(path: &Path) -> Result<Archive<BufReader<File>>, ArchiveError> {
    let file = File::open(path).await?;
    Ok(Archive::new(BufReader::new(file)))
}

fn member_name(bytes: Cow<'_, [u8]>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}
