//! Development server command.

use std::path::Path;

use anyhow::Result;
use kiln_server::{DevServer, DevServerConfig};

use super::load_config;

/// Serve the output directory with live reload.
pub async fn run(config_path: &Path, port: Option<u16>, open: bool) -> Result<()> {
    let config = load_config(config_path)?;

    let mut server = DevServerConfig::from(&config.options.server);
    if let Some(port) = port {
        server.port = port;
    }
    server.open |= open;

    if !server.base_dir.exists() {
        tracing::warn!(
            "{} does not exist yet. Run 'kiln build' to populate it.",
            server.base_dir.display()
        );
    }

    DevServer::new(server).start().await?;

    Ok(())
}
