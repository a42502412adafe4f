//! `mailvault` - archives the newest messages of an IMAP folder
//!
//! Usage: `mailvault [CONFIG]`. Without an argument the configuration is
//! looked up through `MAILVAULT_CONFIG`, `./config.toml` and the user
//! configuration directory.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use mailvault_core::{Config, ImapSource, IngestionPipeline, MailStore, MessageSource};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::load(explicit.as_deref())
        .await
        .context("loading configuration")?;

    let store = open_store(&config).await?;

    info!(host = %config.imap.host, "connecting to IMAP server");
    let mut source = ImapSource::connect(&config.imap, config.ingest.queue_capacity)
        .await
        .with_context(|| format!("connecting to {}", config.imap.host))?;
    info!(username = %config.imap.username, "connected");

    let outcome = IngestionPipeline::new(&mut source, &store, config.ingest.progress_interval)
        .run(&config.imap.folder, config.ingest.batch_size)
        .await;

    if let Err(e) = source.logout().await {
        tracing::warn!(error = %e, "logout failed");
    }

    match outcome {
        Ok(report) => {
            info!(
                stored = report.processed,
                skipped = report.skipped_messages,
                "done"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(aborted) => {
            tracing::error!(error = %aborted, "ingestion aborted");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Opens the store, creating its directory first.
async fn open_store(config: &Config) -> anyhow::Result<MailStore> {
    let path = &config.database.path;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    info!(path = %path.display(), "opening database");
    let path_str = path
        .to_str()
        .with_context(|| format!("database path is not UTF-8: {}", path.display()))?;
    MailStore::new(path_str, config.database.max_connections)
        .await
        .context("opening database")
}
