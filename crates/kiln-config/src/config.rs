//! The kiln configuration value and its `kiln.toml` loader.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::globs::glob_base;
use crate::options::Options;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("placeholder pattern is valid"));

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unknown placeholder {{{name}}} in \"{value}\" (expected src, dist or vendor)")]
    UnknownPlaceholder { name: String, value: String },
}

/// The three roots every glob is derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dirs {
    /// Source root
    pub src: String,
    /// Output root
    pub dist: String,
    /// Third-party package root
    pub vendor: String,
}

impl Default for Dirs {
    fn default() -> Self {
        Self {
            src: "src".to_string(),
            dist: "dist".to_string(),
            vendor: "node_modules".to_string(),
        }
    }
}

impl Dirs {
    pub fn src_path(&self) -> PathBuf {
        PathBuf::from(&self.src)
    }

    pub fn dist_path(&self) -> PathBuf {
        PathBuf::from(&self.dist)
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "src" => Some(&self.src),
            "dist" => Some(&self.dist),
            "vendor" => Some(&self.vendor),
            _ => None,
        }
    }
}

/// Grouped file lists. Order matters wherever files are concatenated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Files {
    /// Stylesheets concatenated into the CSS bundle, vendor first
    pub css: Vec<String>,
    /// CSS bundle file name
    pub css_bundle: String,
    /// Scripts concatenated into the JS bundle, vendor first
    pub js: Vec<String>,
    /// JS bundle file name
    pub js_bundle: String,
    /// Font globs copied to the output
    pub fonts: Vec<String>,
    /// Files copied verbatim to the output root
    pub statics: Vec<String>,
}

impl Default for Files {
    fn default() -> Self {
        Self {
            css: strings(&[
                "{vendor}/bootstrap/dist/css/bootstrap.min.css",
                "{vendor}/font-awesome/css/font-awesome.min.css",
                "{dist}/css/app.css",
            ]),
            css_bundle: "app.min.css".to_string(),
            js: strings(&[
                "{vendor}/jquery/dist/jquery.min.js",
                "{vendor}/bootstrap/dist/js/bootstrap.min.js",
                "{dist}/js/app.js",
            ]),
            js_bundle: "app.min.js".to_string(),
            fonts: strings(&[
                "{vendor}/bootstrap/dist/fonts/*.*",
                "{vendor}/font-awesome/fonts/*.*",
            ]),
            statics: strings(&["{src}/humans.txt", "{src}/sitemap.xml"]),
        }
    }
}

/// Input globs of the source-reading tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sources {
    pub templates: Vec<String>,
    pub styles: Vec<String>,
    pub scripts: Vec<String>,
    pub images: Vec<String>,
    pub svg: Vec<String>,
    pub webp: Vec<String>,
    /// Rendered pages finalized in place
    pub html: Vec<String>,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            templates: strings(&["{src}/templates/*.html"]),
            styles: strings(&["{src}/scss/*.scss"]),
            scripts: strings(&["{src}/es6/*.js"]),
            images: strings(&[
                "{src}/img/**/*.png",
                "{src}/img/**/*.jpeg",
                "{src}/img/**/*.jpg",
                "{src}/img/**/*.gif",
            ]),
            svg: strings(&["{src}/img/svg/**/*.svg"]),
            webp: strings(&[
                "{src}/img/**/*.png",
                "{src}/img/**/*.jpeg",
                "{src}/img/**/*.jpg",
            ]),
            html: strings(&["{dist}/*.html"]),
        }
    }
}

/// Globs observed by the watch tasks. Unset entries follow the input glob of
/// the task they re-run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchGlobs {
    pub templates: Option<Vec<String>>,
    pub styles: Option<Vec<String>>,
    pub scripts: Option<Vec<String>>,
}

/// Where a watch task's globs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOrigin {
    /// Set under `[watch]`
    Configured,
    /// No `[watch]` entry, so the re-run task's input globs
    TaskInputs,
}

/// A source kind with a watch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Watched {
    Templates,
    Styles,
    Scripts,
}

impl Watched {
    pub const ALL: [Watched; 3] = [Watched::Templates, Watched::Styles, Watched::Scripts];

    /// The build task re-run on change.
    pub fn task_name(self) -> &'static str {
        match self {
            Watched::Templates => "template-render",
            Watched::Styles => "style-compile",
            Watched::Scripts => "script-transpile",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Watched::Templates => "templates",
            Watched::Styles => "styles",
            Watched::Scripts => "scripts",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.as_str() == name)
    }
}

/// A configuration inconsistency worth reporting but not fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub watched: Watched,
    pub glob: String,
    pub inputs: Vec<String>,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "watch glob \"{}\" for {} never matches the files {} reads ({})",
            self.glob,
            self.watched.as_str(),
            self.watched.task_name(),
            self.inputs.join(", ")
        )
    }
}

/// Complete, immutable pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dirs: Dirs,
    pub files: Files,
    pub sources: Sources,
    pub options: Options,
    pub watch: WatchGlobs,
}

impl Config {
    /// Load `path` if it exists, defaults otherwise. Placeholders are
    /// resolved before returning.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("{} not found, using defaults", path.display());
            return Self::default().resolve();
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        tracing::info!("Loaded config from {}", path.display());
        config.resolve()
    }

    /// Default configuration rooted at the given directories.
    pub fn with_dirs(
        src: impl AsRef<Path>,
        dist: impl AsRef<Path>,
        vendor: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        Self {
            dirs: Dirs {
                src: src.as_ref().display().to_string(),
                dist: dist.as_ref().display().to_string(),
                vendor: vendor.as_ref().display().to_string(),
            },
            ..Default::default()
        }
        .resolve()
    }

    /// Expand `{src}`, `{dist}` and `{vendor}` in every glob and path.
    pub fn resolve(mut self) -> Result<Self, ConfigError> {
        let dirs = self.dirs.clone();

        let files = &mut self.files;
        for list in [
            &mut files.css,
            &mut files.js,
            &mut files.fonts,
            &mut files.statics,
        ] {
            expand_all(&dirs, list)?;
        }

        let sources = &mut self.sources;
        for list in [
            &mut sources.templates,
            &mut sources.styles,
            &mut sources.scripts,
            &mut sources.images,
            &mut sources.svg,
            &mut sources.webp,
            &mut sources.html,
        ] {
            expand_all(&dirs, list)?;
        }

        for list in [
            &mut self.watch.templates,
            &mut self.watch.styles,
            &mut self.watch.scripts,
        ]
        .into_iter()
        .flatten()
        {
            expand_all(&dirs, list)?;
        }

        let options = &mut self.options;
        expand_all(&dirs, &mut options.uncss.html)?;
        expand_all(&dirs, &mut options.server.files)?;
        options.server.base_dir = expand(&dirs, &options.server.base_dir)?;
        for dir in options.server.routes.values_mut() {
            *dir = expand(&dirs, dir)?;
        }

        Ok(self)
    }

    /// Input globs of the task behind a watch.
    pub fn inputs_for(&self, watched: Watched) -> &[String] {
        match watched {
            Watched::Templates => &self.sources.templates,
            Watched::Styles => &self.sources.styles,
            Watched::Scripts => &self.sources.scripts,
        }
    }

    /// Globs a watch task observes.
    pub fn watch_globs(&self, watched: Watched) -> &[String] {
        self.configured_watch(watched)
            .unwrap_or_else(|| self.inputs_for(watched))
    }

    /// Where the globs of a watch task come from.
    pub fn watch_origin(&self, watched: Watched) -> WatchOrigin {
        match self.configured_watch(watched) {
            Some(_) => WatchOrigin::Configured,
            None => WatchOrigin::TaskInputs,
        }
    }

    fn configured_watch(&self, watched: Watched) -> Option<&[String]> {
        match watched {
            Watched::Templates => self.watch.templates.as_deref(),
            Watched::Styles => self.watch.styles.as_deref(),
            Watched::Scripts => self.watch.scripts.as_deref(),
        }
    }

    /// Report watch globs that can never see a change to the files their task
    /// reads. The watch glob is kept as configured.
    pub fn check(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for watched in Watched::ALL {
            let inputs = self.inputs_for(watched);
            for glob in self.watch_globs(watched) {
                let base = glob_base(glob);
                let covers = inputs
                    .iter()
                    .any(|input| glob_base(input).starts_with(&base));
                if !covers {
                    warnings.push(ConfigWarning {
                        watched,
                        glob: glob.clone(),
                        inputs: inputs.to_vec(),
                    });
                }
            }
        }

        warnings
    }
}

fn expand(dirs: &Dirs, value: &str) -> Result<String, ConfigError> {
    if let Some(unknown) = PLACEHOLDER
        .captures_iter(value)
        .map(|c| c[1].to_string())
        .find(|name| dirs.lookup(name).is_none())
    {
        return Err(ConfigError::UnknownPlaceholder {
            name: unknown,
            value: value.to_string(),
        });
    }

    Ok(PLACEHOLDER
        .replace_all(value, |caps: &regex::Captures<'_>| {
            dirs.lookup(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned())
}

fn expand_all(dirs: &Dirs, values: &mut [String]) -> Result<(), ConfigError> {
    for value in values.iter_mut() {
        *value = expand(dirs, value)?;
    }
    Ok(())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
