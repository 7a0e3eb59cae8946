//! Run tasks by name.

use std::path::Path;

use anyhow::Result;
use kiln_config::Watched;
use kiln_tasks::default_registry;

use super::{ensure_success, load_config};

/// A name accepted by `kiln run`.
#[derive(Debug, Clone, PartialEq)]
enum Target {
    /// A registered build task, or `build`
    Task(String),
    Serve,
    Watch(Watched),
    Dev,
}

impl Target {
    fn parse(name: &str) -> Self {
        match name {
            "serve" => Target::Serve,
            "watch-dev" | "dev" => Target::Dev,
            _ => match name.strip_prefix("watch:").and_then(Watched::parse) {
                Some(watched) => Target::Watch(watched),
                None => Target::Task(name.to_string()),
            },
        }
    }
}

/// Run build tasks first, then at most one long-running target.
pub async fn run(config_path: &Path, names: &[String], with_deps: bool) -> Result<()> {
    let mut tasks = Vec::new();
    let mut long_running = Vec::new();
    for target in names.iter().map(|n| Target::parse(n)) {
        match target {
            Target::Task(name) => tasks.push(name),
            other => long_running.push(other),
        }
    }

    if long_running.len() > 1 {
        anyhow::bail!("Only one of serve, watch:* and watch-dev can run at a time");
    }

    let config = load_config(config_path)?;

    if !tasks.is_empty() {
        let registry = default_registry(&config)?;
        let reports = registry.run(&tasks, with_deps).await?;
        ensure_success(&reports)?;
    }

    match long_running.pop() {
        Some(Target::Serve) => super::serve::run(config_path, None, false).await,
        Some(Target::Watch(watched)) => super::watch::run(config_path, watched).await,
        Some(Target::Dev) => super::dev::run(config_path, false).await,
        Some(Target::Task(_)) | None => Ok(()),
    }
}
