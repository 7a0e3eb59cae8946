//! Configuration registry for kiln pipelines.
//!
//! Holds the directory set, the ordered file lists and the per-tool option
//! bundles. Every glob is written against the `{src}`, `{dist}` and
//! `{vendor}` placeholders and interpolated once when the config is loaded;
//! after that the value is read-only.

pub mod config;
pub mod globs;
pub mod options;

pub use config::{
    Config, ConfigError, ConfigWarning, Dirs, Files, Sources, WatchGlobs, WatchOrigin, Watched,
};
pub use globs::{glob_base, is_glob};
pub use options::{
    AutoprefixerOptions, HtmlMinOptions, ImageOptions, Options, SassOptions, SassStyle,
    ScriptOptions, ServerOptions, SvgOptions, TemplateOptions, UncssOptions, WebpOptions,
};
