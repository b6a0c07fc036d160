//! `analyze` subcommand: print the namespace mapping without touching Gogs.

use std::path::Path;

use anyhow::{Context, Result};

use gitlab2gogs_core::archive::BackupArchive;
use gitlab2gogs_core::namespace::{ClassificationContext, KnownUsernames};
use gitlab2gogs_core::report::AnalysisReport;

use crate::style;

pub async fn run(backupfile: &Path, usernames: KnownUsernames) -> Result<()> {
    let archive = BackupArchive::open(backupfile)
        .await
        .with_context(|| format!("failed to open backup archive {}", backupfile.display()))?;

    let context = ClassificationContext::new(usernames);
    let report = AnalysisReport::analyze(&context, archive.records());

    if report.is_empty() {
        println!(
            "{}",
            style::warn(&format!(
                "No repository bundles found ({} archive members scanned)",
                archive.member_count()
            ))
        );
        return Ok(());
    }

    print!("{}", report);
    println!();
    println!(
        "{}",
        style::dim(&format!(
            "{} repositories: {} users, {} organizations",
            report.repository_count(),
            report.users.len(),
            report.organizations.len()
        ))
    );
    Ok(())
}
