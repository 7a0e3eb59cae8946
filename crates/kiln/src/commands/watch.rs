//! Single watcher command.

use std::path::Path;

use anyhow::{Context, Result};
use kiln_config::Watched;
use kiln_server::watch_task;
use kiln_tasks::default_registry;

use super::load_config;

/// Watch one source kind until Ctrl-C.
pub async fn run(config_path: &Path, watched: Watched) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = default_registry(&config)?;

    tokio::select! {
        result = watch_task(&config, &registry, watched) => {
            result.with_context(|| format!("Watching {} failed", watched.as_str()))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Stopped watching {}", watched.as_str());
        }
    }

    Ok(())
}
