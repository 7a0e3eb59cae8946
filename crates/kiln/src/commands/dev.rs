//! Multi-process development command.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::task::JoinSet;

/// Subcommands started side by side, each in its own process.
const PROCESSES: &[&[&str]] = &[
    &["serve"],
    &["watch", "templates"],
    &["watch", "styles"],
    &["watch", "scripts"],
];

/// Run the server and the three watchers until one exits or Ctrl-C.
pub async fn run(config_path: &Path, verbose: bool) -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate the kiln executable")?;

    let mut children = JoinSet::new();
    for args in PROCESSES {
        let name = args.join(" ");
        let mut command = Command::new(&exe);
        command.arg("--config").arg(config_path).args(*args);
        if verbose {
            command.arg("--verbose");
        }

        let mut child = command
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start 'kiln {}'", name))?;
        tracing::info!("Started 'kiln {}' (pid {})", name, child.id().unwrap_or(0));

        children.spawn(async move { (name, child.wait().await) });
    }

    tokio::select! {
        Some(joined) = children.join_next() => {
            match joined {
                Ok((name, Ok(status))) => tracing::warn!("'kiln {}' exited with {}", name, status),
                Ok((name, Err(e))) => tracing::error!("'kiln {}' failed: {}", name, e),
                Err(e) => tracing::error!("Process monitor failed: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    // Aborting the monitors drops the children, which kills them
    children.shutdown().await;

    Ok(())
}
