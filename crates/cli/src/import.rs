//! `import` subcommand: create the repositories on Gogs and mirror push them.

use anyhow::{bail, Context, Result};
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use gitlab2gogs_core::archive::{BackupArchive, RepositoryRecord};
use gitlab2gogs_core::config::MigrationConfig;
use gitlab2gogs_core::errors::ImportError;
use gitlab2gogs_core::git::GitCli;
use gitlab2gogs_core::gogs::{AdminCredentials, GogsClient, RemoteApi, RemoteSession};
use gitlab2gogs_core::import::{ImportOutcome, ImportSummary, Importer};
use gitlab2gogs_core::namespace::{ClassificationContext, Owner};

use crate::{expand_tilde, known_usernames, signals, style, ImportArgs};

pub async fn run(args: ImportArgs, config: &MigrationConfig) -> Result<()> {
    let url = args
        .gogsurl
        .or_else(|| config.gogs.url.clone())
        .context("--gogsurl is required (or set gogs.url in the configuration file)")?;
    let admin = args
        .gogsadmin
        .or_else(|| config.gogs.admin.clone())
        .context("--gogsadmin is required (or set gogs.admin in the configuration file)")?;
    let token_name = args
        .token_name
        .unwrap_or_else(|| config.gogs.token_name.clone());
    let work_dir = args
        .work_dir
        .or_else(|| config.import.work_dir.clone())
        .map(|dir| expand_tilde(&dir));

    let archive = BackupArchive::open(&args.backupfile)
        .await
        .with_context(|| format!("failed to open backup archive {}", args.backupfile.display()))?;

    let password = match args.gogspassword.or_else(|| config.gogs.password.clone()) {
        Some(password) => password,
        None => prompt_password(&admin)?,
    };

    let session = RemoteSession::new(&url, AdminCredentials::new(admin, password), token_name)
        .context("invalid Gogs URL")?;
    let client = GogsClient::new(session).context("failed to create Gogs client")?;
    let user = client
        .authenticate()
        .await
        .context("failed to authenticate the Gogs admin account")?;
    info!(admin = %user.username, "authenticated");

    let git = GitCli::default();
    let version = git
        .version()
        .await
        .context("git is required to import repositories")?;
    info!(%version, "found git");

    let context = ClassificationContext::new(known_usernames(config, &args.users));
    let importer = Importer::new(&archive, &context, &client, &git).with_work_dir(work_dir);

    println!(
        "{}",
        style::header(&format!(
            "Importing {} repositories into {} as {}",
            archive.len(),
            client.session().base_url(),
            user.username
        ))
    );

    let pb = ProgressBar::new(archive.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let result = tokio::select! {
        result = importer.import_all(|record, result| report_progress(&pb, record, result)) => result,
        _ = signals::wait_for_shutdown() => {
            pb.abandon();
            bail!("import interrupted; the repository in progress was not completed");
        }
    };
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            pb.abandon();
            return Err(e).context("import aborted");
        }
    };
    pb.finish_and_clear();

    print_summary(&summary);
    Ok(())
}

fn prompt_password(admin: &str) -> Result<String> {
    Password::new()
        .with_prompt(format!("Gogs password for {}", admin))
        .interact()
        .context("failed to read password")
}

fn report_progress(
    pb: &ProgressBar,
    record: &RepositoryRecord,
    result: &Result<ImportOutcome, ImportError>,
) {
    let line = match result {
        Ok(outcome @ ImportOutcome::Imported { .. }) => style::success(&format!(
            "{} {} {}",
            owner_label(outcome.owner()),
            outcome,
            style::dim(&format!("({})", record.bundle_path))
        )),
        Ok(outcome @ ImportOutcome::Skipped { .. }) => style::warn(&outcome.to_string()),
        Err(e) => style::error(&format!("{}: {}", record.bundle_path, e)),
    };
    pb.println(line);
    pb.set_message(record.name.clone());
    pb.inc(1);
}

fn owner_label(owner: &Owner) -> String {
    if owner.is_user() {
        style::user_label()
    } else {
        style::org_label()
    }
}

fn print_summary(summary: &ImportSummary) {
    println!();
    println!("{}", style::header("Summary"));
    println!("  Imported : {}", summary.imported);
    println!("  Skipped  : {}", summary.skipped);
    println!("  Failed   : {}", summary.failures.len());

    if summary.has_failures() {
        println!();
        for failure in &summary.failures {
            println!(
                "  {}",
                style::error(&format!("{}: {}", failure.record.bundle_path, failure.error))
            );
        }
    }
}
