//! Scoped scratch directory for staging one bundle and its clone.
//!
//! The directory is removed when the [`WorkArea`] is dropped, whichever way
//! the import of the record ends. Git writes its object files read-only, so
//! removal first restores write permission on everything below the root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

const PREFIX: &str = "gitlab2gogs-";

/// Temporary working directory for a single record.
#[derive(Debug)]
pub struct WorkArea {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl WorkArea {
    /// Create a fresh directory under `parent`, or under the system temp
    /// directory when `parent` is `None`.
    pub fn create(parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match parent {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "created work area");
        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Destination directory for the clone of the staged bundle.
    pub fn clone_dir(&self) -> PathBuf {
        self.path.join("clone")
    }
}

impl Drop for WorkArea {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = remove(dir) {
                warn!(path = %self.path.display(), error = %e, "failed to remove work area");
            }
        }
    }
}

fn remove(dir: TempDir) -> io::Result<()> {
    clear_readonly(dir.path());
    let path = dir.path().to_path_buf();
    dir.close()?;
    debug!(path = %path.display(), "removed work area");
    Ok(())
}

/// Make every file and directory below `root` writable by its owner.
fn clear_readonly(root: &Path) {
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let mut permissions = metadata.permissions();
        if !permissions.readonly() {
            continue;
        }
        make_writable(&mut permissions);
        if let Err(e) = fs::set_permissions(entry.path(), permissions) {
            debug!(path = %entry.path().display(), error = %e, "could not clear read-only flag");
        }
    }
}

#[cfg(unix)]
fn make_writable(permissions: &mut fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
fn make_writable(permissions: &mut fs::Permissions) {
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
}
