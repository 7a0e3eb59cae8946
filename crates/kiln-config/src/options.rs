//! Per-tool option bundles.
//!
//! Each table is consumed by exactly one transform stage. Values are checked
//! only by their types here; a value the tool rejects surfaces when the stage
//! runs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// All tool options, keyed by tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub templates: TemplateOptions,
    pub sass: SassOptions,
    pub scripts: ScriptOptions,
    pub images: ImageOptions,
    pub svg: SvgOptions,
    pub webp: WebpOptions,
    pub uncss: UncssOptions,
    pub autoprefixer: AutoprefixerOptions,
    pub htmlmin: HtmlMinOptions,
    pub server: ServerOptions,
}

/// Template rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateOptions {
    /// Value of the `title` local
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    "Titulo".to_string()
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            title: default_title(),
        }
    }
}

/// Sass output style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SassStyle {
    Expanded,
    #[default]
    Compressed,
}

/// Sass compiler options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SassOptions {
    pub output_style: SassStyle,

    /// Extra `@use`/`@import` search paths
    pub load_paths: Vec<PathBuf>,
}

/// Script transpiler options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptOptions {
    /// Lowering target, e.g. `es2015`
    #[serde(default = "default_target")]
    pub target: String,
}

fn default_target() -> String {
    "es2015".to_string()
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            target: default_target(),
        }
    }
}

/// Raster compression options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,

    /// Palette size for PNG quantization (2-256)
    pub png_colors: u16,

    /// Quantize PNGs to a palette; when false PNGs are only recompressed
    pub png_quantize: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 80,
            png_colors: 256,
            png_quantize: true,
        }
    }
}

/// SVG minifier options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvgOptions {
    /// Shorten colour literals where lossless
    pub convert_colors: bool,

    /// Attribute names stripped from every element
    pub remove_attrs: Vec<String>,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            convert_colors: false,
            remove_attrs: vec!["fill".to_string()],
        }
    }
}

/// WebP encoder options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebpOptions {
    /// Lossy quality (0-100)
    pub quality: f32,
}

impl Default for WebpOptions {
    fn default() -> Self {
        Self { quality: 75.0 }
    }
}

/// Unused-CSS pruning options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncssOptions {
    /// HTML files scanned for used selectors
    pub html: Vec<String>,

    /// Selectors that are always kept
    pub ignore: Vec<String>,
}

impl Default for UncssOptions {
    fn default() -> Self {
        Self {
            html: vec!["{dist}/*.html".to_string()],
            ignore: Vec::new(),
        }
    }
}

/// Vendor prefixing options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoprefixerOptions {
    /// Browserslist queries
    pub browsers: Vec<String>,
}

impl Default for AutoprefixerOptions {
    fn default() -> Self {
        Self {
            browsers: vec!["last 5 versions".to_string()],
        }
    }
}

/// HTML minifier options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlMinOptions {
    pub collapse_whitespace: bool,
    pub remove_comments: bool,
}

impl Default for HtmlMinOptions {
    fn default() -> Self {
        Self {
            collapse_whitespace: true,
            remove_comments: false,
        }
    }
}

/// Development server options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,

    /// Directory served at `/`
    pub base_dir: String,

    /// File served for directory requests
    pub index: String,

    /// Extra URL prefix to directory mounts
    pub routes: BTreeMap<String, String>,

    /// Output globs whose changes reload connected browsers
    pub files: Vec<String>,

    /// Open a browser once listening
    pub open: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        let routes = [
            ("/node_modules", "{vendor}"),
            ("/dist/css", "{dist}/css"),
            ("/dist/js", "{dist}/js"),
            ("/dist/fonts", "{dist}/fonts"),
        ]
        .into_iter()
        .map(|(route, dir)| (route.to_string(), dir.to_string()))
        .collect();

        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            base_dir: "{dist}".to_string(),
            index: "index.html".to_string(),
            routes,
            files: vec![
                "{dist}/**/*.html".to_string(),
                "{dist}/**/*.css".to_string(),
                "{dist}/**/*.js".to_string(),
            ],
            open: false,
        }
    }
}
