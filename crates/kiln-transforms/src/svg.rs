//! SVG minification.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use kiln_config::SvgOptions;

use crate::error::TransformError;

static PROLOG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\?xml.*?\?>").expect("prolog pattern is valid"));

static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!DOCTYPE[^>\[]*(?:\[.*?\])?\s*>").expect("doctype pattern is valid")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

static EDITOR_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<metadata\b[^>]*/>|<metadata\b.*?</metadata\s*>|<sodipodi:namedview\b[^>]*/>|<sodipodi:namedview\b.*?</sodipodi:namedview\s*>",
    )
    .expect("editor element pattern is valid")
});

static EDITOR_ATTRS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\s+(?:xmlns:(?:sodipodi|inkscape|sketch|rdf|dc|cc)|(?:sodipodi|inkscape|sketch):[\w.-]+)\s*=\s*(?:"[^"]*"|'[^']*')"#,
    )
    .expect("editor attribute pattern is valid")
});

static BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("whitespace pattern is valid"));

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([0-9a-fA-F]{6})\b").expect("color pattern is valid"));

/// Minifies SVG documents with a fixed option set.
pub struct SvgOptimizer {
    options: SvgOptions,
    removed_attrs: Option<Regex>,
}

impl SvgOptimizer {
    pub fn new(options: SvgOptions) -> Result<Self, TransformError> {
        let removed_attrs = if options.remove_attrs.is_empty() {
            None
        } else {
            let names: Vec<String> = options
                .remove_attrs
                .iter()
                .map(|name| regex::escape(name))
                .collect();
            let pattern = format!(
                r#"\s+(?:{})\s*=\s*(?:"[^"]*"|'[^']*')"#,
                names.join("|")
            );
            Some(Regex::new(&pattern).map_err(|e| {
                TransformError::Unsupported(format!("invalid remove_attrs entry: {}", e))
            })?)
        };

        Ok(Self {
            options,
            removed_attrs,
        })
    }

    /// Minify one document.
    pub fn optimize(&self, svg: &str) -> Result<String, TransformError> {
        if !svg.contains("<svg") {
            return Err(TransformError::Unsupported(
                "not an SVG document".to_string(),
            ));
        }

        let mut out = PROLOG.replace_all(svg, "").into_owned();
        out = DOCTYPE.replace_all(&out, "").into_owned();
        out = COMMENT.replace_all(&out, "").into_owned();
        out = EDITOR_ELEMENTS.replace_all(&out, "").into_owned();
        out = EDITOR_ATTRS.replace_all(&out, "").into_owned();

        if let Some(re) = &self.removed_attrs {
            out = re.replace_all(&out, "").into_owned();
        }

        if self.options.convert_colors {
            out = HEX_COLOR
                .replace_all(&out, |caps: &Captures<'_>| shorten_hex(&caps[1]))
                .into_owned();
        }

        out = BETWEEN_TAGS.replace_all(&out, "><").into_owned();
        Ok(out.trim().to_string())
    }
}

/// `#aabbcc` to `#abc` when each channel repeats its digit.
fn shorten_hex(hex: &str) -> String {
    let lower = hex.to_ascii_lowercase();
    let b = lower.as_bytes();
    if b[0] == b[1] && b[2] == b[3] && b[4] == b[5] {
        format!("#{}{}{}", b[0] as char, b[2] as char, b[4] as char)
    } else {
        format!("#{}", lower)
    }
}
