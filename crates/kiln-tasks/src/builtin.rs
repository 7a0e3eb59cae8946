//! The built-in asset tasks.

use kiln_config::Config;

use crate::error::TaskError;
use crate::pipeline::{Input, Pipeline, Sink};
use crate::registry::{Task, TaskRegistry};
use crate::stages::{
    AddPrefixes, CompileSass, ConvertWebp, MinifyCss, MinifyHtml, MinifyJs, OptimizeRaster,
    OptimizeSvg, PruneUnusedCss, RenderTemplate, ResolveReferences, Transpile,
};

pub const TEMPLATE_RENDER: &str = "template-render";
pub const STYLE_COMPILE: &str = "style-compile";
pub const SCRIPT_TRANSPILE: &str = "script-transpile";
pub const RASTER_OPTIMIZE: &str = "raster-optimize";
pub const VECTOR_OPTIMIZE: &str = "vector-optimize";
pub const WEBP_CONVERT: &str = "webp-convert";
pub const FONTS_COPY: &str = "fonts-copy";
pub const STATICS_COPY: &str = "statics-copy";
pub const CSS_BUNDLE: &str = "css-bundle";
pub const JS_BUNDLE: &str = "js-bundle";
pub const HTML_FINALIZE: &str = "html-finalize";

/// Register every built-in task against `config`.
///
/// Each stage is handed a copy of just the options it uses.
pub fn default_registry(config: &Config) -> Result<TaskRegistry, TaskError> {
    let dist = config.dirs.dist_path();
    let files = &config.files;
    let sources = &config.sources;
    let options = &config.options;

    let mut registry = TaskRegistry::new();

    registry.register(
        Task::new(
            TEMPLATE_RENDER,
            Pipeline::new(
                Input::globs(&sources.templates).skip_partials(),
                Sink::dir(&dist).renamed("index.html"),
            )
            .then(RenderTemplate::new(&options.templates.title, files)),
        )
        .describe("Render page templates into the output root"),
    )?;

    registry.register(
        Task::new(
            STYLE_COMPILE,
            Pipeline::new(
                Input::globs(&sources.styles).skip_partials(),
                Sink::dir(dist.join("css")).renamed("app.css"),
            )
            .then(CompileSass::new(options.sass.clone())),
        )
        .describe("Compile Sass sources into app.css"),
    )?;

    registry.register(
        Task::new(
            SCRIPT_TRANSPILE,
            Pipeline::new(
                Input::globs(&sources.scripts),
                Sink::dir(dist.join("js")).renamed("app.js"),
            )
            .then(Transpile::new(&options.scripts.target)),
        )
        .describe("Transpile modern scripts into app.js"),
    )?;

    registry.register(
        Task::new(
            RASTER_OPTIMIZE,
            Pipeline::new(Input::globs(&sources.images), Sink::dir(dist.join("img")))
                .then(OptimizeRaster::new(options.images.clone())),
        )
        .describe("Compress PNG, JPEG and GIF images"),
    )?;

    let svg = OptimizeSvg::new(options.svg.clone()).map_err(|e| TaskError::Setup {
        task: VECTOR_OPTIMIZE.to_string(),
        message: e.to_string(),
    })?;
    registry.register(
        Task::new(
            VECTOR_OPTIMIZE,
            Pipeline::new(Input::globs(&sources.svg), Sink::dir(dist.join("img/svg")))
                .then(svg),
        )
        .describe("Minify SVG images"),
    )?;

    registry.register(
        Task::new(
            WEBP_CONVERT,
            Pipeline::new(Input::globs(&sources.webp), Sink::dir(dist.join("img/webp")))
                .then(ConvertWebp::new(options.webp.clone())),
        )
        .describe("Encode WebP copies of raster images"),
    )?;

    registry.register(
        Task::new(
            FONTS_COPY,
            Pipeline::new(Input::globs(&files.fonts), Sink::dir(dist.join("fonts"))),
        )
        .describe("Copy vendor fonts"),
    )?;

    registry.register(
        Task::new(
            STATICS_COPY,
            Pipeline::new(Input::globs(&files.statics), Sink::dir(&dist)),
        )
        .describe("Copy static files to the output root"),
    )?;

    registry.register(
        Task::new(
            CSS_BUNDLE,
            Pipeline::new(Input::globs(&files.css), Sink::dir(dist.join("css")))
                .concat(&files.css_bundle)
                .then(PruneUnusedCss::new(options.uncss.clone()))
                .then(AddPrefixes::new(options.autoprefixer.clone()))
                .then(MinifyCss),
        )
        .describe("Bundle, prune, prefix and minify stylesheets")
        .after([STYLE_COMPILE, TEMPLATE_RENDER]),
    )?;

    registry.register(
        Task::new(
            JS_BUNDLE,
            Pipeline::new(Input::globs(&files.js), Sink::dir(dist.join("js")))
                .concat(&files.js_bundle)
                .then(MinifyJs),
        )
        .describe("Bundle and minify scripts")
        .after([SCRIPT_TRANSPILE]),
    )?;

    registry.register(
        Task::new(
            HTML_FINALIZE,
            Pipeline::new(Input::globs(&sources.html), Sink::dir(&dist))
                .then(ResolveReferences::new(files))
                .then(MinifyHtml::new(options.htmlmin.clone())),
        )
        .describe("Point pages at the bundles and minify them")
        .after([TEMPLATE_RENDER, CSS_BUNDLE, JS_BUNDLE]),
    )?;

    Ok(registry)
}
