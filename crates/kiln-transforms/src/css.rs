//! Stylesheet transforms: Sass compilation, unused-rule pruning, vendor
//! prefixing and minification.

use std::path::Path;
use std::sync::LazyLock;

use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;
use regex::Regex;
use scraper::Html;

use kiln_config::{SassOptions, SassStyle};

use crate::error::TransformError;

/// Pseudo-elements and state-dependent pseudo-classes. They never match a
/// static document, so they are stripped before a selector is looked up.
static DYNAMIC_PSEUDO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ::[A-Za-z-]+(?:\([^()]*\))?
        | :(?:-[a-z]+-)?(?:
            hover|focus-within|focus-visible|focus|active|visited|link|any-link|target
            |checked|disabled|enabled|indeterminate|default|required|optional
            |valid|invalid|in-range|out-of-range|read-only|read-write
            |placeholder-shown|placeholder|selection
            |before|after|first-line|first-letter
          )\b",
    )
    .expect("pseudo pattern is valid")
});

/// Compile a Sass/SCSS source.
///
/// `path` is the file the source came from; its directory is searched first
/// for `@use`/`@import` targets, then `options.load_paths`.
pub fn compile_sass(
    path: &Path,
    source: &str,
    options: &SassOptions,
) -> Result<String, TransformError> {
    let style = match options.output_style {
        SassStyle::Compressed => grass::OutputStyle::Compressed,
        SassStyle::Expanded => grass::OutputStyle::Expanded,
    };

    let mut grass_options = grass::Options::default().style(style);
    if let Some(dir) = path.parent() {
        grass_options = grass_options.load_path(dir);
    }
    grass_options = grass_options.load_paths(&options.load_paths);

    grass::from_string(source.to_string(), &grass_options)
        .map_err(|e| TransformError::Sass(format!("{}: {}", path.display(), e)))
}

/// Remove style rules whose selectors match nothing in `pages`.
///
/// Each selector of a rule is tested on its own; the rule is dropped once no
/// selector is left. Conditional groups (`@media`, `@supports`) are pruned
/// recursively and dropped when emptied. Selectors listed in `ignore` and
/// selectors that cannot be evaluated against a static document are kept.
pub fn prune_unused(
    css: &str,
    pages: &[String],
    ignore: &[String],
) -> Result<String, TransformError> {
    if pages.is_empty() {
        return Err(TransformError::Css(
            "no HTML pages to check selectors against".to_string(),
        ));
    }

    let usage = UsageIndex {
        documents: pages.iter().map(|p| Html::parse_document(p)).collect(),
        ignore,
    };

    let mut sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| TransformError::Css(format!("CSS parse error: {}", e)))?;

    let before = count_style_rules(&sheet.rules);
    prune_rules(&mut sheet.rules, &usage);
    tracing::debug!(
        "Pruned {} of {} style rules",
        before - count_style_rules(&sheet.rules),
        before
    );

    let printed = sheet
        .to_css(PrinterOptions::default())
        .map_err(|e| TransformError::Css(format!("CSS print error: {}", e)))?;

    Ok(printed.code)
}

/// Add the vendor prefixes required by a browserslist query set.
pub fn add_prefixes(css: &str, browsers: &[String]) -> Result<String, TransformError> {
    let targets = browser_targets(browsers)?;

    let mut sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| TransformError::Css(format!("CSS parse error: {}", e)))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..Default::default()
        })
        .map_err(|e| TransformError::Css(format!("CSS prefix error: {}", e)))?;

    let printed = sheet
        .to_css(PrinterOptions {
            targets,
            ..Default::default()
        })
        .map_err(|e| TransformError::Css(format!("CSS print error: {}", e)))?;

    Ok(printed.code)
}

/// Minify CSS using lightningcss.
pub fn minify_css(css: &str) -> Result<String, TransformError> {
    let mut sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| TransformError::Css(format!("CSS parse error: {}", e)))?;

    sheet
        .minify(MinifyOptions::default())
        .map_err(|e| TransformError::Css(format!("CSS minify error: {}", e)))?;

    let minified = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|e| TransformError::Css(format!("CSS minify error: {}", e)))?;

    Ok(minified.code)
}

fn browser_targets(queries: &[String]) -> Result<Targets, TransformError> {
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| TransformError::Css(format!("invalid browsers query: {}", e)))?;

    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Selector usage across a set of parsed pages.
struct UsageIndex<'a> {
    documents: Vec<Html>,
    ignore: &'a [String],
}

impl UsageIndex<'_> {
    #[allow(clippy::let_and_return)]
    fn is_used(&self, selector: &str) -> bool {
        if self.ignore.iter().any(|kept| kept == selector) {
            return true;
        }

        let stripped = DYNAMIC_PSEUDO.replace_all(selector, "");
        let stripped = stripped.trim();
        if stripped.is_empty() {
            return true;
        }

        // Bound so the parse result is dropped before `stripped`
        let used = match scraper::Selector::parse(stripped) {
            Ok(parsed) => self
                .documents
                .iter()
                .any(|doc| doc.select(&parsed).next().is_some()),
            Err(_) => true,
        };
        used
    }
}

fn prune_rules(rules: &mut CssRuleList<'_>, usage: &UsageIndex<'_>) {
    rules.0.retain_mut(|rule| match rule {
        CssRule::Style(style) => {
            style.selectors.0.retain(|selector| {
                selector
                    .to_css_string(PrinterOptions::default())
                    .map(|text| usage.is_used(&text))
                    .unwrap_or(true)
            });
            !style.selectors.0.is_empty()
        }
        CssRule::Media(media) => {
            prune_rules(&mut media.rules, usage);
            !media.rules.0.is_empty()
        }
        CssRule::Supports(supports) => {
            prune_rules(&mut supports.rules, usage);
            !supports.rules.0.is_empty()
        }
        _ => true,
    });
}

fn count_style_rules(rules: &CssRuleList<'_>) -> usize {
    rules
        .0
        .iter()
        .map(|rule| match rule {
            CssRule::Style(_) => 1,
            CssRule::Media(media) => count_style_rules(&media.rules),
            CssRule::Supports(supports) => count_style_rules(&supports.rules),
            _ => 0,
        })
        .sum()
}
