//! Subcommand implementations.

pub mod build;
pub mod dev;
pub mod init;
pub mod list;
pub mod run;
pub mod serve;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use kiln_config::Config;
use kiln_tasks::TaskReport;

/// Load the config, logging any watch globs that cannot see their inputs.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    for warning in config.check() {
        tracing::warn!("{}", warning);
    }

    Ok(config)
}

/// Fail when any task left files unbuilt.
pub fn ensure_success(reports: &[TaskReport]) -> Result<()> {
    let written: usize = reports.iter().map(|r| r.written.len()).sum();
    let duration: u64 = reports.iter().map(|r| r.duration_ms).sum();
    let failed: Vec<String> = reports
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| format!("{} ({})", r.task, r.failed))
        .collect();

    if !failed.is_empty() {
        anyhow::bail!("Files failed in: {}", failed.join(", "));
    }

    tracing::info!(
        "Ran {} task(s), wrote {} file(s) in {}ms",
        reports.len(),
        written,
        duration
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report(task: &str, failed: usize) -> TaskReport {
        TaskReport {
            task: task.to_string(),
            matched: 2,
            written: vec![PathBuf::from("dist/a")],
            failed,
            duration_ms: 5,
        }
    }

    #[test]
    fn failures_are_errors() {
        let err = ensure_success(&[report("css-bundle", 0), report("raster-optimize", 2)])
            .unwrap_err();

        assert!(err.to_string().contains("raster-optimize (2)"));
        assert!(ensure_success(&[report("css-bundle", 0)]).is_ok());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("kiln.toml");
        std::fs::write(&path, "dirs = 3").unwrap();

        assert!(load_config(&path).is_err());
    }
}
