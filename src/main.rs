use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reflection_engine::{
    cli::{execute_command, Cli},
    config::{Config, LogFormat},
    safety::LoggingEscalationHook,
    storage::{SnapshotStorage, SqliteStorage},
    store::ReflectionStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "Reflection engine starting...");

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    // Restore the user's snapshot, if any
    let mut store = match storage.load_snapshot(&config.user_id).await? {
        Some(saved) => {
            match ReflectionStore::from_blob(config.engine.clone(), &saved.blob) {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, user_id = %config.user_id, "Stored snapshot is unreadable");
                    return Err(e.into());
                }
            }
        }
        None => ReflectionStore::new(config.engine.clone()),
    };
    store.set_escalation_hook(Arc::new(LoggingEscalationHook));

    let dirty = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&dirty);
    store.on_change(move |_| flag.store(true, Ordering::SeqCst));

    let result = execute_command(cli.command, &mut store).await;

    if dirty.load(Ordering::SeqCst) {
        let blob = store.serialize()?;
        storage.save_snapshot(&config.user_id, &blob).await?;
        info!(user_id = %config.user_id, bytes = blob.len(), "Snapshot persisted");
    }

    if result.exit_code == 0 {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
        std::process::exit(result.exit_code);
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
