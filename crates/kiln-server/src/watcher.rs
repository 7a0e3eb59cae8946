//! Glob-filtered file watching.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex, Weak};
use std::time::Duration;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use kiln_config::glob_base;

use crate::error::ServerError;

/// Quiet period that ends a burst of events.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// A burst of changes to matching files.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    /// Changed paths, sorted and unique
    pub paths: Vec<PathBuf>,
}

/// Watches the base directory of each glob and reports changes to files
/// matching any of them.
///
/// A base directory that does not exist yet is picked up once it is created:
/// its nearest existing ancestor is watched until then, and files already
/// inside it when it appears are reported with the next event.
pub struct FileWatcher {
    _watcher: Arc<Mutex<RecommendedWatcher>>,
}

impl FileWatcher {
    /// Start watching. Events arrive on the returned channel until the
    /// watcher is dropped.
    pub fn new(globs: &[String]) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), ServerError> {
        let cwd = std::env::current_dir().map_err(|e| ServerError::Watch(e.to_string()))?;
        let matcher = build_matcher(&cwd, globs)?;

        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(|e| ServerError::Watch(e.to_string()))?;

        let mut bases = BTreeSet::new();
        let mut pending = Vec::new();
        for glob in globs {
            let base = cwd.join(glob_base(glob));
            if bases.insert(base.clone()) && !arm(&mut watcher, &base)? {
                pending.push(base);
            }
        }

        let watcher = Arc::new(Mutex::new(watcher));
        let mut rearm = Rearm {
            watcher: Arc::downgrade(&watcher),
            pending,
            patterns: globs
                .iter()
                .map(|glob| cwd.join(glob).to_string_lossy().into_owned())
                .collect(),
        };

        std::thread::spawn(move || {
            while let Ok(first) = sync_rx.recv() {
                let mut paths = BTreeSet::new();
                rearm.on_event(&first, &mut paths);
                collect(&matcher, first, &mut paths);

                // Drain the rest of the burst
                while let Ok(event) = sync_rx.recv_timeout(DEBOUNCE) {
                    rearm.on_event(&event, &mut paths);
                    collect(&matcher, event, &mut paths);
                }

                if paths.is_empty() {
                    continue;
                }
                let event = WatchEvent {
                    paths: paths.into_iter().collect(),
                };
                if async_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Watch `base` recursively if it exists. Otherwise watch its nearest
/// existing ancestor so its creation is seen. Returns whether `base` itself
/// is now watched.
fn arm(watcher: &mut RecommendedWatcher, base: &Path) -> Result<bool, ServerError> {
    let watch_err =
        |path: &Path, e: notify::Error| ServerError::Watch(format!("{}: {}", path.display(), e));

    if base.is_dir() {
        watcher
            .watch(base, RecursiveMode::Recursive)
            .map_err(|e| watch_err(base, e))?;
        tracing::debug!("Watching {}", base.display());
        return Ok(true);
    }

    match base.ancestors().skip(1).find(|dir| dir.is_dir()) {
        Some(ancestor) => {
            watcher
                .watch(ancestor, RecursiveMode::NonRecursive)
                .map_err(|e| watch_err(ancestor, e))?;
            tracing::debug!(
                "{} does not exist yet, waiting in {}",
                base.display(),
                ancestor.display()
            );
        }
        None => tracing::warn!("Not watching {}: no such directory", base.display()),
    }
    Ok(false)
}

/// Base directories still waiting to be created.
struct Rearm {
    watcher: Weak<Mutex<RecommendedWatcher>>,
    pending: Vec<PathBuf>,
    /// Absolute glob patterns, for files that beat the watch
    patterns: Vec<String>,
}

impl Rearm {
    fn on_event(&mut self, event: &notify::Event, paths: &mut BTreeSet<PathBuf>) {
        if self.pending.is_empty() || !matches!(event.kind, EventKind::Create(_)) {
            return;
        }
        let Some(watcher) = self.watcher.upgrade() else {
            return;
        };
        let Ok(mut watcher) = watcher.lock() else {
            return;
        };

        let mut still_pending = Vec::new();
        for base in std::mem::take(&mut self.pending) {
            match arm(&mut watcher, &base) {
                Ok(true) => {
                    tracing::info!("Now watching {}", base.display());
                    paths.extend(self.existing_matches(&base));
                }
                Ok(false) => still_pending.push(base),
                Err(e) => tracing::warn!("{}", e),
            }
        }
        self.pending = still_pending;
    }

    /// Files under a newly created `base` that already match a pattern.
    fn existing_matches(&self, base: &Path) -> Vec<PathBuf> {
        self.patterns
            .iter()
            .filter(|pattern| glob_base(pattern).starts_with(base))
            .filter_map(|pattern| glob::glob(pattern).ok())
            .flat_map(|entries| entries.flatten())
            .filter(|path| path.is_file())
            .collect()
    }
}

fn collect(matcher: &GlobSet, event: notify::Event, paths: &mut BTreeSet<PathBuf>) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }
    paths.extend(event.paths.into_iter().filter(|p| matcher.is_match(p)));
}

/// Compile `globs` against `root`. `*` stays within one path component.
fn build_matcher(root: &Path, globs: &[String]) -> Result<GlobSet, ServerError> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        let absolute = root.join(glob);
        let pattern = absolute.to_string_lossy();
        let compiled = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ServerError::Watch(format!("invalid glob {}: {}", glob, e)))?;
        builder.add(compiled);
    }
    builder
        .build()
        .map_err(|e| ServerError::Watch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn star_does_not_cross_directories() {
        let matcher = build_matcher(Path::new("/site"), &["src/es6/*.js".to_string()]).unwrap();

        assert!(matcher.is_match("/site/src/es6/app.js"));
        assert!(!matcher.is_match("/site/src/es6/lib/util.js"));
        assert!(!matcher.is_match("/site/src/es6/app.ts"));
    }

    #[test]
    fn double_star_matches_nested() {
        let matcher =
            build_matcher(Path::new("/site"), &["dist/**/*.css".to_string()]).unwrap();

        assert!(matcher.is_match("/site/dist/css/app.min.css"));
    }

    #[tokio::test]
    async fn reports_matching_changes_only() {
        let temp = tempdir().unwrap();
        let glob = temp.path().join("*.scss").display().to_string();

        let (watcher, mut rx) = FileWatcher::new(&[glob]).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        fs::write(temp.path().join("main.scss"), "a { color: red; }").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("timeout waiting for file watch event")
            .expect("channel should not be closed");
        drop(watcher);

        assert!(event.paths.iter().all(|p| p.extension().unwrap() == "scss"));
        assert!(event.paths.iter().any(|p| p.ends_with("main.scss")));
    }

    #[tokio::test]
    async fn picks_up_a_base_directory_created_later() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        let glob = dist.join("**").join("*.html").display().to_string();

        let (watcher, mut rx) = FileWatcher::new(&[glob]).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::create_dir(&dist).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        fs::write(dist.join("index.html"), "<p>hi</p>").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("timeout waiting for file watch event")
            .expect("channel should not be closed");
        drop(watcher);

        assert!(event.paths.iter().any(|p| p.ends_with("dist/index.html")));
    }

    #[test]
    fn existing_files_are_found_when_a_base_appears() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(dist.join("css")).unwrap();
        fs::write(dist.join("css/app.css"), "a{}").unwrap();
        fs::write(dist.join("notes.txt"), "x").unwrap();

        let rearm = Rearm {
            watcher: Weak::new(),
            pending: vec![],
            patterns: vec![dist.join("**/*.css").display().to_string()],
        };

        assert_eq!(rearm.existing_matches(&dist), vec![dist.join("css/app.css")]);
    }
}
