//! Full build command.

use std::path::Path;

use anyhow::Result;
use kiln_tasks::{default_registry, BUILD_TARGET};

use super::{ensure_success, load_config};

/// Run every task in dependency order.
pub async fn run(config_path: &Path) -> Result<()> {
    tracing::info!("Building...");

    let config = load_config(config_path)?;
    let registry = default_registry(&config)?;

    let reports = registry.run(&[BUILD_TARGET.to_string()], true).await?;

    ensure_success(&reports)
}
