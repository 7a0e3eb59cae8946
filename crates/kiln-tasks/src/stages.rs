//! Pipeline stages wrapping the transform adapters.
//!
//! Each stage captures only the option values its tool reads.

use std::fs;

use kiln_config::{
    AutoprefixerOptions, Files, HtmlMinOptions, ImageOptions, SassOptions, SvgOptions,
    UncssOptions, WebpOptions,
};
use kiln_transforms::{
    css, html, images, scripts, NeuQuantizer, Quantizer, SvgOptimizer, TemplateEngine,
    TransformError,
};

use crate::asset::Asset;
use crate::pipeline::Transform;

/// Render a template with the `title` and `files` locals.
pub struct RenderTemplate {
    engine: TemplateEngine,
}

impl RenderTemplate {
    pub fn new(title: &str, files: &Files) -> Self {
        Self {
            engine: TemplateEngine::new(title, files),
        }
    }
}

impl Transform for RenderTemplate {
    fn name(&self) -> &'static str {
        "render"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let rendered = self.engine.render(&asset.source, asset.text()?)?;
        asset.set_text(rendered);
        Ok(asset)
    }
}

/// Compile Sass/SCSS to CSS.
pub struct CompileSass {
    options: SassOptions,
}

impl CompileSass {
    pub fn new(options: SassOptions) -> Self {
        Self { options }
    }
}

impl Transform for CompileSass {
    fn name(&self) -> &'static str {
        "sass"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let compiled = css::compile_sass(&asset.source, asset.text()?, &self.options)?;
        asset.set_text(compiled);
        asset.with_extension("css");
        Ok(asset)
    }
}

/// Lower modern script syntax.
pub struct Transpile {
    target: String,
}

impl Transpile {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Transform for Transpile {
    fn name(&self) -> &'static str {
        "transpile"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let out = scripts::transpile(&asset.source, asset.text()?, &self.target)?;
        asset.set_text(out);
        Ok(asset)
    }
}

/// Minify a script.
pub struct MinifyJs;

impl Transform for MinifyJs {
    fn name(&self) -> &'static str {
        "minify-js"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let out = scripts::minify_js(asset.text()?)?;
        asset.set_text(out);
        Ok(asset)
    }
}

/// Compress PNG, JPEG and GIF files.
pub struct OptimizeRaster {
    options: ImageOptions,
    quantizer: Box<dyn Quantizer>,
}

impl OptimizeRaster {
    pub fn new(options: ImageOptions) -> Self {
        Self::with_quantizer(options, NeuQuantizer::default())
    }

    pub fn with_quantizer(options: ImageOptions, quantizer: impl Quantizer + 'static) -> Self {
        Self {
            options,
            quantizer: Box::new(quantizer),
        }
    }
}

impl Transform for OptimizeRaster {
    fn name(&self) -> &'static str {
        "optimize-raster"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let before = asset.contents.len();
        asset.contents = images::optimize_raster(
            &asset.contents,
            &asset.extension(),
            &self.options,
            self.quantizer.as_ref(),
        )?;
        tracing::debug!(
            "{}: {} -> {} bytes",
            asset.relative.display(),
            before,
            asset.contents.len()
        );
        Ok(asset)
    }
}

/// Minify SVG documents.
pub struct OptimizeSvg {
    optimizer: SvgOptimizer,
}

impl OptimizeSvg {
    pub fn new(options: SvgOptions) -> Result<Self, TransformError> {
        Ok(Self {
            optimizer: SvgOptimizer::new(options)?,
        })
    }
}

impl Transform for OptimizeSvg {
    fn name(&self) -> &'static str {
        "optimize-svg"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let out = self.optimizer.optimize(asset.text()?)?;
        asset.set_text(out);
        Ok(asset)
    }
}

/// Encode raster images as WebP.
pub struct ConvertWebp {
    options: WebpOptions,
}

impl ConvertWebp {
    pub fn new(options: WebpOptions) -> Self {
        Self { options }
    }
}

impl Transform for ConvertWebp {
    fn name(&self) -> &'static str {
        "webp"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        asset.contents = images::to_webp(&asset.contents, &self.options)?;
        asset.with_extension("webp");
        Ok(asset)
    }
}

/// Drop CSS rules unused by the configured pages.
///
/// Pages are read when the stage runs, so they reflect the latest render.
pub struct PruneUnusedCss {
    options: UncssOptions,
}

impl PruneUnusedCss {
    pub fn new(options: UncssOptions) -> Self {
        Self { options }
    }

    fn pages(&self) -> Result<Vec<String>, TransformError> {
        let mut pages = Vec::new();
        for pattern in &self.options.html {
            let entries = glob::glob(pattern).map_err(|e| {
                TransformError::Css(format!("invalid page glob {}: {}", pattern, e))
            })?;
            for path in entries.flatten().filter(|p| p.is_file()) {
                match fs::read_to_string(&path) {
                    Ok(page) => pages.push(page),
                    Err(e) => tracing::warn!("Skipping page {}: {}", path.display(), e),
                }
            }
        }
        Ok(pages)
    }
}

impl Transform for PruneUnusedCss {
    fn name(&self) -> &'static str {
        "prune-css"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let pages = self.pages()?;
        let out = css::prune_unused(asset.text()?, &pages, &self.options.ignore)?;
        asset.set_text(out);
        Ok(asset)
    }
}

/// Add vendor prefixes for the configured browsers.
pub struct AddPrefixes {
    options: AutoprefixerOptions,
}

impl AddPrefixes {
    pub fn new(options: AutoprefixerOptions) -> Self {
        Self { options }
    }
}

impl Transform for AddPrefixes {
    fn name(&self) -> &'static str {
        "prefix-css"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let out = css::add_prefixes(asset.text()?, &self.options.browsers)?;
        asset.set_text(out);
        Ok(asset)
    }
}

/// Minify a stylesheet.
pub struct MinifyCss;

impl Transform for MinifyCss {
    fn name(&self) -> &'static str {
        "minify-css"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let out = css::minify_css(asset.text()?)?;
        asset.set_text(out);
        Ok(asset)
    }
}

/// Swap build blocks for single bundle references.
///
/// Blocks that name no path point at the bundles listed in `files`.
pub struct ResolveReferences {
    bundles: html::BundleRefs,
}

impl ResolveReferences {
    pub fn new(files: &Files) -> Self {
        Self {
            bundles: html::BundleRefs::from_files(files),
        }
    }
}

impl Transform for ResolveReferences {
    fn name(&self) -> &'static str {
        "resolve-refs"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let resolved = html::resolve_references(asset.text()?, &self.bundles);
        tracing::debug!(
            "{}: {} build block(s) replaced",
            asset.relative.display(),
            resolved.replaced
        );
        asset.set_text(resolved.html);
        Ok(asset)
    }
}

/// Minify markup.
pub struct MinifyHtml {
    options: HtmlMinOptions,
}

impl MinifyHtml {
    pub fn new(options: HtmlMinOptions) -> Self {
        Self { options }
    }
}

impl Transform for MinifyHtml {
    fn name(&self) -> &'static str {
        "minify-html"
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let out = html::minify_html(asset.text()?, &self.options);
        asset.set_text(out);
        Ok(asset)
    }
}
