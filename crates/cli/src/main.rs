//! gitdesk command-line tool.
//!
//! Browses the file tree of a revision, compares revisions, lists branches
//! with default merge selections, opens pull requests, and resolves conflict
//! blocks in merged files. Configuration is read from a TOML file; every
//! setting has a default, so a bare working copy needs none.

mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gitdesk_core::config::{default_config_path, AppConfig};
use gitdesk_core::conflict::Side;
use gitdesk_core::diff::DiffAlgorithm;

use commands::{conflicts, diff, pr, style};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// gitdesk command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "gitdesk",
    version,
    about = "Browse, compare and merge branches of a Git repository"
)]
struct Cli {
    /// Path to the TOML configuration file
    /// (default: <config dir>/gitdesk/config.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository path, overriding `repository.path`.
    #[arg(short = 'C', long, global = true)]
    repo: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the file tree of a revision.
    Tree {
        /// Revision to list.
        #[arg(default_value = "HEAD")]
        revision: String,

        /// Print the tree as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compare two revisions.
    Diff {
        /// Old revision.
        from: String,

        /// New revision.
        to: String,

        /// Show a per-file summary instead of the full diff.
        #[arg(long)]
        stat: bool,

        /// Line diff algorithm: pairwise or lcs.
        #[arg(long)]
        algorithm: Option<DiffAlgorithm>,

        #[arg(long)]
        json: bool,
    },

    /// List local and remote branches and the default merge selection.
    Branches {
        /// Do not fetch the remote first.
        #[arg(long)]
        no_fetch: bool,

        #[arg(long)]
        json: bool,
    },

    /// Open a pull request.
    Pr {
        /// Pull request title.
        #[arg(short, long)]
        title: String,

        /// Pull request description.
        #[arg(short, long)]
        body: Option<String>,

        /// Source branch (default: current branch).
        #[arg(long)]
        source: Option<String>,

        /// Target branch (default: main, master, or the first remote branch).
        #[arg(long)]
        target: Option<String>,

        /// Show what would be submitted without contacting GitHub.
        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        json: bool,
    },

    /// Inspect conflict blocks in a file and optionally resolve them all.
    Conflicts {
        /// File containing conflict markers.
        file: PathBuf,

        /// Resolve every block: current or incoming.
        #[arg(long)]
        accept: Option<Side>,

        /// Write the resolved text back to the file.
        #[arg(long, requires = "accept")]
        write: bool,

        /// Do not ask before overwriting.
        #[arg(short, long)]
        yes: bool,

        #[arg(long)]
        json: bool,
    },

    /// Preview the conflicts of merging THEIRS into OURS.
    MergeCheck {
        /// Revision being merged into.
        ours: String,

        /// Revision being merged.
        theirs: String,

        /// Common ancestor (default: the merge base).
        #[arg(long)]
        base: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path (default: <config dir>/gitdesk/config.toml).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str, verbose: bool) {
    let fallback = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_logging("warn", cli.verbose);
            let output = match output {
                Some(path) => expand_tilde(&path),
                None => default_config_path().context("no config directory on this platform")?,
            };
            cmd_init(&output)
        }
        Commands::Validate => {
            init_logging("warn", cli.verbose);
            cmd_validate(&config_path(cli.config.as_deref())?)
        }
        command => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(repo) = cli.repo {
                config.repository.path = expand_tilde(&repo);
            }
            init_logging(&config.log.level, cli.verbose);
            dispatch(command, &config).await
        }
    }
}

async fn dispatch(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Tree { revision, json } => commands::tree::run(config, &revision, json).await,
        Commands::Diff {
            from,
            to,
            stat,
            algorithm,
            json,
        } => {
            diff::run(
                config,
                diff::DiffArgs {
                    from: &from,
                    to: &to,
                    stat,
                    algorithm,
                    json,
                },
            )
            .await
        }
        Commands::Branches { no_fetch, json } => commands::branches::run(config, no_fetch, json).await,
        Commands::Pr {
            title,
            body,
            source,
            target,
            dry_run,
            json,
        } => {
            pr::run(
                config,
                pr::PrArgs {
                    title,
                    body,
                    source,
                    target,
                    dry_run,
                    json,
                },
            )
            .await
        }
        Commands::Conflicts {
            file,
            accept,
            write,
            yes,
            json,
        } => conflicts::run(conflicts::ConflictsArgs {
            file: &file,
            accept,
            write,
            yes,
            json,
        }),
        Commands::MergeCheck {
            ours,
            theirs,
            base,
            json,
        } => conflicts::run_merge_check(config, &ours, &theirs, base.as_deref(), json).await,
        Commands::Init { .. } | Commands::Validate => {
            anyhow::bail!("command does not need a loaded configuration")
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Expand a leading `~/` to the home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand_tilde(path)),
        None => default_config_path().context("no config directory on this platform"),
    }
}

/// Load the config file. An explicit `--config` must exist; the default
/// location is optional and falls back to built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = config_path(explicit)?;
    if explicit.is_some() || path.exists() {
        return AppConfig::load_and_resolve(&path).context("failed to load configuration");
    }
    debug!(path = %path.display(), "no config file, using defaults");
    let mut config = AppConfig::default();
    config.resolve_env_vars();
    Ok(config)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"# gitdesk configuration
# Every key is optional; the values below are the defaults.

[repository]
# Local working copy.
path = "."
remote = "origin"

[github]
api_url = "https://api.github.com"
# "owner/repo"; derived from the remote URL when omitted.
# repo = "owner/repo"
# Name of the environment variable holding the token.
token_env = "GITHUB_TOKEN"

[diff]
# "pairwise" or "lcs"
algorithm = "pairwise"
parallel_reads = true

[merge]
fetch_before_load = true
default_targets = ["main", "master"]

[log]
level = "warn"
"#;

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    std::fs::write(output, DEFAULT_CONFIG).context("failed to write config file")?;

    println!("{}", style::success(&format!("Default configuration written to {}", output.display())));
    println!();
    println!("Next steps:");
    println!("  1. Point repository.path at your working copy");
    println!("  2. Export a token in GITHUB_TOKEN to open pull requests");
    println!("  3. Validate with: gitdesk validate --config {}", output.display());

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config.resolve_env_vars();
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Repository    : {}", config.repository.path.display());
    println!("  Remote        : {}", config.repository.remote);
    println!(
        "  GitHub repo   : {}",
        config.github.repo.as_deref().unwrap_or("(from remote URL)")
    );
    println!(
        "  GitHub token  : {}",
        if config.github.token.is_some() {
            "set"
        } else {
            "NOT SET"
        }
    );
    println!("  Diff algorithm: {:?}", config.diff.algorithm);
    println!("  Targets       : {}", config.merge.default_targets.join(", "));
    println!();
    println!("Configuration is valid.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_config_parses_and_validates() {
        let config = AppConfig::from_toml(DEFAULT_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(config.merge.default_targets, vec!["main", "master"]);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        cmd_init(&path).unwrap();
        assert!(path.exists());
        assert!(cmd_init(&path).is_err());
        cmd_validate(&path).unwrap();
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_subcommand_arguments() {
        let cli = Cli::try_parse_from([
            "gitdesk", "diff", "main", "feature", "--stat", "--algorithm", "lcs",
        ])
        .unwrap();
        match cli.command {
            Commands::Diff {
                from,
                to,
                stat,
                algorithm,
                ..
            } => {
                assert_eq!((from.as_str(), to.as_str()), ("main", "feature"));
                assert!(stat);
                assert_eq!(algorithm, Some(DiffAlgorithm::Lcs));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["gitdesk", "conflicts", "f.txt", "--accept", "theirs"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Conflicts {
                accept: Some(Side::Incoming),
                ..
            }
        ));

        assert!(Cli::try_parse_from(["gitdesk", "conflicts", "f.txt", "--write"]).is_err());
    }
}
