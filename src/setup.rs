use std::{fs::OpenOptions, path::PathBuf, str::FromStr};

use anyhow::Result;
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

/// Set up JSON logging to a file. Transient retry traces land here rather
/// than in the caller's UI.
pub fn setup_logging(level: Option<EnvFilter>) -> Result<()> {
    let log_path = PathBuf::from("fanout.log");

    let file = OpenOptions::new().create(true).append(true).open(log_path)?;

    // Prioritize the user-provided level, otherwise read RUST_LOG, falling
    // back to "info".
    let env_filter = if let Some(filter) = level {
        filter
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let formatting_layer = BunyanFormattingLayer::new("fanout-distributor".into(), file);
    let level_filter = LevelFilter::from_str(&env_filter.to_string())?;

    let subscriber = tracing_subscriber::registry()
        .with(formatting_layer.with_filter(level_filter))
        .with(JsonStorageLayer);

    set_global_default(subscriber)?;

    Ok(())
}
