//! Re-running one task whenever its sources change.

use std::future::Future;

use tokio::sync::mpsc;

use kiln_config::{Config, WatchOrigin, Watched};
use kiln_tasks::{Task, TaskRegistry};

use crate::error::ServerError;
use crate::watcher::{FileWatcher, WatchEvent};

/// Run `run` once per burst of changes, never two at a time.
///
/// Changes that arrive while a run is in flight are folded into a single
/// follow-up run. Returns the number of runs once `changes` closes.
pub async fn serialize_runs<F, Fut>(mut changes: mpsc::Receiver<WatchEvent>, mut run: F) -> usize
where
    F: FnMut(WatchEvent) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut runs = 0;

    while let Some(mut event) = changes.recv().await {
        loop {
            run(event).await;
            runs += 1;

            let mut pending: Option<WatchEvent> = None;
            while let Ok(next) = changes.try_recv() {
                match pending.as_mut() {
                    Some(merged) => merged.paths.extend(next.paths),
                    None => pending = Some(next),
                }
            }

            match pending {
                Some(mut merged) => {
                    merged.paths.sort();
                    merged.paths.dedup();
                    tracing::debug!("{} change(s) arrived during the run", merged.paths.len());
                    event = merged;
                }
                None => break,
            }
        }
    }

    runs
}

/// Watch the sources of `watched` and re-run its build task (without
/// predecessors) on every change. Runs until the process is stopped.
pub async fn watch_task(
    config: &Config,
    registry: &TaskRegistry,
    watched: Watched,
) -> Result<(), ServerError> {
    let task: &Task = registry
        .get(watched.task_name())
        .ok_or_else(|| kiln_tasks::TaskError::UnknownTask(watched.task_name().to_string()))?;
    let globs = config.watch_globs(watched);

    let (_watcher, changes) = FileWatcher::new(globs)?;
    match config.watch_origin(watched) {
        WatchOrigin::Configured => tracing::info!(
            "Watching {} for {} ({}, from [watch])",
            watched.as_str(),
            task.name(),
            globs.join(", ")
        ),
        WatchOrigin::TaskInputs => tracing::info!(
            "Watching {} for {} ({}): no [watch].{} set, following the task's inputs",
            watched.as_str(),
            task.name(),
            globs.join(", "),
            watched.as_str()
        ),
    }

    serialize_runs(changes, |event| async move {
        for path in &event.paths {
            tracing::info!("Changed: {}", path.display());
        }
        match task.run().await {
            Ok(report) if !report.is_success() => {
                tracing::warn!("{} left {} file(s) unbuilt", report.task, report.failed)
            }
            Ok(_) => {}
            Err(e) => tracing::error!("{}", e),
        }
    })
    .await;

    Ok(())
}
