//! The pipeline contract: select input files, stream them through ordered
//! stages, write what comes out.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use kiln_config::glob_base;
use kiln_transforms::TransformError;

use crate::asset::Asset;
use crate::error::TaskError;

/// A per-file transform stage.
pub trait Transform: Send + Sync {
    /// Stage name used in logs
    fn name(&self) -> &'static str;

    /// Transform one file. An error drops this file only.
    fn apply(&self, asset: Asset) -> Result<Asset, TransformError>;
}

/// One step of a pipeline.
pub enum Stage {
    /// Transform each file independently
    Each(Box<dyn Transform>),

    /// Join every file, in stream order, into a single file
    Concat { file_name: String },
}

impl Stage {
    pub fn each(transform: impl Transform + 'static) -> Self {
        Stage::Each(Box::new(transform))
    }

    fn name(&self) -> &'static str {
        match self {
            Stage::Each(t) => t.name(),
            Stage::Concat { .. } => "concat",
        }
    }
}

/// Input selector: globs evaluated one by one, in order.
#[derive(Debug, Clone)]
pub struct Input {
    globs: Vec<String>,
    skip_partials: bool,
}

impl Input {
    pub fn globs<I, S>(globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            globs: globs.into_iter().map(Into::into).collect(),
            skip_partials: false,
        }
    }

    /// Ignore files whose name starts with `_`.
    pub fn skip_partials(mut self) -> Self {
        self.skip_partials = true;
        self
    }

    pub fn patterns(&self) -> &[String] {
        &self.globs
    }

    /// Read every matched file.
    ///
    /// Each glob contributes its own matches; a glob that matches nothing
    /// leaves the others untouched. A file matched by several globs is read
    /// once. Unreadable files are logged and counted, not fatal.
    fn select(&self, task: &str) -> Result<(Vec<Asset>, usize), TaskError> {
        let mut assets = Vec::new();
        let mut seen = HashSet::new();
        let mut failed = 0;

        for pattern in &self.globs {
            let base = glob_base(pattern);
            let entries = glob::glob(pattern).map_err(|e| TaskError::Pattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;

            let mut matched = 0;
            for entry in entries {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        tracing::error!("[{}] cannot read {}: {}", task, e.path().display(), e);
                        failed += 1;
                        continue;
                    }
                };

                if !path.is_file() || !seen.insert(path.clone()) {
                    continue;
                }
                if self.skip_partials && is_partial(&path) {
                    continue;
                }
                matched += 1;

                match fs::read(&path) {
                    Ok(contents) => {
                        let relative = path
                            .strip_prefix(&base)
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|_| file_name(&path));
                        assets.push(Asset::new(path, relative, contents));
                    }
                    Err(e) => {
                        tracing::error!("[{}] cannot read {}: {}", task, path.display(), e);
                        failed += 1;
                    }
                }
            }

            if matched == 0 {
                tracing::debug!("[{}] {} matched no files", task, pattern);
            }
        }

        Ok((assets, failed))
    }
}

/// Output sink: a directory, optionally with a fixed file name.
#[derive(Debug, Clone)]
pub struct Sink {
    pub dir: PathBuf,
    pub rename: Option<String>,
}

impl Sink {
    pub fn dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rename: None,
        }
    }

    /// Write every file under this one name.
    pub fn renamed(mut self, file_name: impl Into<String>) -> Self {
        self.rename = Some(file_name.into());
        self
    }

    /// Destination of one asset.
    fn target(&self, asset: &Asset) -> PathBuf {
        match &self.rename {
            Some(name) => self.dir.join(name),
            None => self.dir.join(&asset.relative),
        }
    }
}

/// What one pipeline run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutcome {
    /// Files selected by the input
    pub matched: usize,
    /// Files written, in write order
    pub written: Vec<PathBuf>,
    /// Files dropped by a failing read, stage or write
    pub failed: usize,
}

/// A complete input → stages → sink pipeline.
pub struct Pipeline {
    input: Input,
    stages: Vec<Stage>,
    sink: Sink,
}

impl Pipeline {
    pub fn new(input: Input, sink: Sink) -> Self {
        Self {
            input,
            stages: Vec::new(),
            sink,
        }
    }

    /// Append a per-file transform.
    pub fn then(mut self, transform: impl Transform + 'static) -> Self {
        self.stages.push(Stage::each(transform));
        self
    }

    /// Append a concatenation into `file_name`.
    pub fn concat(mut self, file_name: impl Into<String>) -> Self {
        self.stages.push(Stage::Concat {
            file_name: file_name.into(),
        });
        self
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    /// Stage names in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Run to completion on the current thread (per-file stages fan out on
    /// the rayon pool).
    pub fn run(&self, task: &str) -> Result<PipelineOutcome, TaskError> {
        let (mut assets, mut failed) = self.input.select(task)?;
        let matched = assets.len() + failed;

        for stage in &self.stages {
            assets = match stage {
                Stage::Each(transform) => {
                    let results: Vec<Result<Asset, (PathBuf, TransformError)>> = assets
                        .into_par_iter()
                        .map(|asset| {
                            let source = asset.source.clone();
                            transform.apply(asset).map_err(|e| (source, e))
                        })
                        .collect();

                    let mut kept = Vec::with_capacity(results.len());
                    for result in results {
                        match result {
                            Ok(asset) => kept.push(asset),
                            Err((source, e)) => {
                                tracing::error!(
                                    "[{}] {} failed on {}: {}",
                                    task,
                                    transform.name(),
                                    source.display(),
                                    e
                                );
                                failed += 1;
                            }
                        }
                    }
                    kept
                }
                Stage::Concat { file_name } => concat(assets, file_name),
            };
        }

        let written = self.write(task, assets, &mut failed);

        Ok(PipelineOutcome {
            matched,
            written,
            failed,
        })
    }

    fn write(&self, task: &str, assets: Vec<Asset>, failed: &mut usize) -> Vec<PathBuf> {
        let mut targets: BTreeMap<PathBuf, usize> = BTreeMap::new();
        for asset in &assets {
            *targets.entry(self.sink.target(asset)).or_default() += 1;
        }
        for (target, count) in targets.iter().filter(|(_, count)| **count > 1) {
            tracing::warn!(
                "[{}] {} files write to {}; the last one wins",
                task,
                count,
                target.display()
            );
        }

        let mut written = Vec::new();
        for asset in assets {
            let target = self.sink.target(&asset);
            match write_file(&target, &asset.contents) {
                Ok(()) => {
                    tracing::debug!("[{}] wrote {}", task, target.display());
                    written.push(target);
                }
                Err(e) => {
                    tracing::error!("[{}] cannot write {}: {}", task, target.display(), e);
                    *failed += 1;
                }
            }
        }
        written
    }
}

fn concat(assets: Vec<Asset>, file_name: &str) -> Vec<Asset> {
    let Some(first) = assets.first() else {
        return Vec::new();
    };
    let source = first.source.clone();

    let mut contents = Vec::new();
    for (i, asset) in assets.into_iter().enumerate() {
        if i > 0 {
            contents.push(b'\n');
        }
        contents.extend_from_slice(&asset.contents);
    }

    vec![Asset::new(source, file_name, contents)]
}

fn write_file(target: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, contents)
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

fn file_name(path: &Path) -> PathBuf {
    path.file_name().map(PathBuf::from).unwrap_or_default()
}
