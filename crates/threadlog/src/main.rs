// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! threadlog - fold discussion threads into bug activity summaries.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod ingest;
mod inspect;
mod register;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use threadlog_config::ThreadlogConfig;
use threadlog_core::{RecordStore, ThreadlogError};
use threadlog_discussion::{DiscussionMerger, StoreBugLookup};

/// threadlog - fold discussion threads into bug activity summaries.
#[derive(Parser, Debug)]
#[command(name = "threadlog", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the standard lookup.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest JSON-lines message events from a file, or `-` for stdin.
    Ingest {
        #[arg(default_value = "-")]
        input: String,
    },
    /// Print one discussion as JSON.
    Discussion { source: String, id: String },
    /// Print a bug's discussion summaries.
    Bug {
        key: String,
        /// Output JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// List the discussions that reference a bug.
    BugDiscussions { key: String },
    /// Create or replace a bug record.
    RegisterBug {
        key: String,
        #[arg(long, default_value = "")]
        title: String,
        /// External id the bug is reported under; repeatable.
        #[arg(long = "reporting-id", value_name = "ID")]
        reporting_ids: Vec<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Option<ThreadlogConfig> {
    let loaded = match path {
        Some(path) => threadlog_config::load_and_validate_path(path),
        None => threadlog_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            threadlog_config::render_errors(&errors);
            None
        }
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("threadlog={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, config: &ThreadlogConfig) -> Result<ExitCode, ThreadlogError> {
    let store = threadlog_storage::open_store(&config.storage).await?;
    let result = dispatch(command, config, store.clone()).await;
    // Checkpoint even when the command failed; its error takes precedence.
    let closed = store.close().await;
    let code = result?;
    closed?;
    Ok(code)
}

async fn dispatch(
    command: Commands,
    config: &ThreadlogConfig,
    store: Arc<dyn RecordStore>,
) -> Result<ExitCode, ThreadlogError> {
    match command {
        Commands::Ingest { input } => {
            let lookup = Arc::new(StoreBugLookup::new(store.clone()));
            let merger = DiscussionMerger::new(store, lookup, config.merge.clone());
            let report = ingest::run_ingest(&merger, &input).await?;
            println!("{report}");
            Ok(if report.failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Discussion { source, id } => {
            inspect::print_discussion(store.as_ref(), &source, &id).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Bug { key, json } => {
            inspect::print_bug(store.as_ref(), &key, json).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::BugDiscussions { key } => {
            inspect::print_bug_discussions(store.as_ref(), &key).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::RegisterBug {
            key,
            title,
            reporting_ids,
        } => {
            register::register_bug(store.as_ref(), &config.merge, &key, &title, &reporting_ids)
                .await?;
            println!("registered bug {key}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(config) = load_config(cli.config.as_ref()) else {
        return ExitCode::FAILURE;
    };
    init_tracing(&config.log.level);

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("threadlog: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn register_bug_collects_repeated_reporting_ids() {
        let cli = Cli::try_parse_from([
            "threadlog",
            "register-bug",
            "k1",
            "--title",
            "KASAN: slab-out-of-bounds",
            "--reporting-id",
            "a",
            "--reporting-id",
            "b",
        ])
        .unwrap();
        match cli.command {
            Commands::RegisterBug {
                key,
                title,
                reporting_ids,
            } => {
                assert_eq!(key, "k1");
                assert_eq!(title, "KASAN: slab-out-of-bounds");
                assert_eq!(reporting_ids, vec!["a", "b"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ingest_reads_stdin_by_default() {
        let cli = Cli::try_parse_from(["threadlog", "--config", "x.toml", "ingest"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Ingest { ref input } if input == "-"));
    }

    #[test]
    #[serial_test::serial]
    fn env_overrides_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threadlog.toml");
        std::fs::write(&path, "[log]\nlevel = \"warn\"\n").unwrap();

        // SAFETY: serialized with the other env-touching tests in this binary.
        unsafe { std::env::set_var("THREADLOG_LOG_LEVEL", "debug") };
        let config = load_config(Some(&path));
        unsafe { std::env::remove_var("THREADLOG_LOG_LEVEL") };

        assert_eq!(config.unwrap().log.level, "debug");
    }

    #[test]
    #[serial_test::serial]
    fn invalid_config_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threadlog.toml");
        std::fs::write(&path, "[merge]\ndiscussion_attempts = 0\n").unwrap();
        assert!(load_config(Some(&path)).is_none());
    }
}
