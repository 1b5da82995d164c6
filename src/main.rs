//! Artifact Sync
//!
//! Entry point for the Artifact Sync CLI.

mod cli;
mod replay;
mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use artifact_sync_config::{Config, ConfigLoader, ConfigValidator, LoggingSection};
use artifact_sync_protocols::KeyValueStore;
use artifact_sync_storage::{MemoryKvStore, SqliteKvStore, StorageManager};

use cli::{Cli, Commands};
use replay::{Replayer, Trace};

fn init_tracing(logging: &LoggingSection) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = PathBuf::from(ConfigLoader::expand_path(&logging.dir));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("artifact-sync")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard stops the file writer.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = PathBuf::from(ConfigLoader::expand_path(&cli.config));
    let config = ConfigLoader::load_or_default(&config_path)?;

    init_tracing(&config.logging)?;

    match cli.command {
        Commands::Replay {
            trace,
            settle_ms,
            memory_state,
        } => run_replay(&config, &trace, Duration::from_millis(settle_ms), memory_state).await,
        Commands::CheckConfig => check_config(&config, &config_path),
    }
}

/// Replay a trace file against the configured observer and storage.
async fn run_replay(
    config: &Config,
    trace_path: &Path,
    settle: Duration,
    memory_state: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Artifact Sync v{}", env!("CARGO_PKG_VERSION"));

    let warnings = ConfigValidator::validate(config).into_result()?;
    for warning in &warnings {
        warn!("{}: {}", warning.path, warning.message);
    }

    let storage = settings::storage_section(config);
    let store: Arc<dyn KeyValueStore> = if memory_state {
        Arc::new(MemoryKvStore::new())
    } else {
        Arc::new(SqliteKvStore::open(&storage.state_path).await?)
    };
    let manager = StorageManager::from_config(&storage)?;

    let trace = Trace::load(trace_path)?;
    let replayer = Replayer {
        config: settings::observer_config(config),
        probe: settings::probe(config),
        store,
        storage: Arc::new(manager),
    };
    let summary = replayer.run(trace, settle).await?;

    println!(
        "Replayed {} steps: {} turn(s) detected, {} saved, {} failed",
        summary.steps,
        summary.observer.turns_started,
        summary.saves.saved,
        summary.saves.failed
    );
    if summary.observer.timeouts > 0 || summary.observer.duplicates > 0 {
        println!(
            "  {} timed out, {} duplicate(s) skipped",
            summary.observer.timeouts, summary.observer.duplicates
        );
    }
    Ok(())
}

/// Print validation errors and warnings for the loaded configuration.
fn check_config(config: &Config, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let result = ConfigValidator::validate(config);

    println!("Configuration: {}", path.display());
    println!("  provider: {}", config.observer.provider);
    println!("  storage:  {}", config.storage.mode);

    for error in &result.errors {
        println!("  error:   {}: {}", error.path, error.message);
    }
    for warning in &result.warnings {
        println!("  warning: {}: {}", warning.path, warning.message);
    }

    if result.is_valid() {
        println!("Configuration is valid.");
    }
    result.into_result()?;
    Ok(())
}
