//! gitlab2gogs command-line tool.
//!
//! Provides two subcommands: `analyze`, a dry run that shows how the
//! namespaces of a GitLab backup map onto Gogs users and organizations, and
//! `import`, which creates the repositories on a Gogs server and mirror
//! pushes every bundle into them.

mod analyze;
mod import;
mod signals;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gitlab2gogs_core::config::MigrationConfig;
use gitlab2gogs_core::namespace::KnownUsernames;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Import the repositories of a GitLab backup archive into Gogs.
#[derive(Parser, Debug)]
#[command(
    name = "gitlab2gogs",
    version,
    about = "Import the repositories of a GitLab backup archive into Gogs"
)]
struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show how the archive's namespaces map to Gogs users and organizations.
    Analyze {
        /// GitLab backup tar file.
        backupfile: PathBuf,

        /// GitLab username, to tell personal namespaces from groups.
        #[arg(short = 'u', long = "user", value_name = "NAME")]
        users: Vec<String>,
    },

    /// Import every repository of the archive into Gogs.
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// GitLab backup tar file.
    backupfile: PathBuf,

    /// GitLab username, to tell personal namespaces from groups.
    #[arg(short = 'u', long = "user", value_name = "NAME")]
    users: Vec<String>,

    /// Gogs base URL to add repositories to.
    #[arg(long, value_name = "URL")]
    gogsurl: Option<String>,

    /// Gogs admin user that adds repositories and organizations.
    #[arg(long, value_name = "NAME")]
    gogsadmin: Option<String>,

    /// Password of the Gogs admin user (prompted for when omitted).
    #[arg(long, value_name = "PASSWORD")]
    gogspassword: Option<String>,

    /// Client label of the access tokens used to create repositories.
    #[arg(long, value_name = "LABEL")]
    token_name: Option<String>,

    /// Parent directory for temporary working areas.
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { backupfile, users } => {
            analyze::run(&backupfile, known_usernames(&config, &users)).await
        }
        Commands::Import(args) => import::run(args, &config).await,
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&str>) -> Result<MigrationConfig> {
    let Some(path) = path else {
        return Ok(MigrationConfig::default());
    };
    let path = expand_tilde(Path::new(path));
    MigrationConfig::load_and_resolve(&path)
        .with_context(|| format!("failed to load configuration file {}", path.display()))
}

/// Usernames from the config file plus those given with `--user`.
fn known_usernames(config: &MigrationConfig, cli_users: &[String]) -> KnownUsernames {
    KnownUsernames::new(config.gitlab.users.iter().chain(cli_users))
}

/// Expand a leading `~/` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_args() {
        let cli = Cli::try_parse_from([
            "gitlab2gogs",
            "-vv",
            "import",
            "backup.tar",
            "-u",
            "alice",
            "--user",
            "bob",
            "--gogsurl",
            "https://gogs.example.com",
            "--gogsadmin",
            "root",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.users, ["alice", "bob"]);
        assert_eq!(args.gogsadmin.as_deref(), Some("root"));
        assert!(args.gogspassword.is_none());
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::try_parse_from(["gitlab2gogs", "analyze", "backup.tar", "-c", "g.toml"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some("g.toml"));
        assert!(matches!(cli.command, Commands::Analyze { ref users, .. } if users.is_empty()));
    }

    #[test]
    fn test_known_usernames_merge_config_and_flags() {
        let mut config = MigrationConfig::default();
        config.gitlab.users = vec!["Alice".into()];
        let names = known_usernames(&config, &["bob".to_string()]);
        assert!(names.contains("alice"));
        assert!(names.contains("BOB"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde(Path::new("/etc/g.toml")), PathBuf::from("/etc/g.toml"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/g.toml")), home.join("g.toml"));
        }
    }
}
