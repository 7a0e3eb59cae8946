//! Markup transforms: build-block reference resolution and whitespace
//! minification.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use kiln_config::{Files, HtmlMinOptions};

/// `<!-- build:TYPE(alt) [PATH] -->...<!-- endbuild -->`
static BUILD_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<!--\s*build:([A-Za-z]+)(?:\([^)]*\))?(?:\s+([^\s-]\S*))?[^>]*?-->.*?<!--\s*endbuild\s*-->",
    )
    .expect("build block pattern is valid")
});

static RAW_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
    )
    .expect("raw element pattern is valid")
});

static RAW_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<kiln-raw-(\d+)>").expect("placeholder pattern is valid"));

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

static BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("whitespace pattern is valid"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("tag pattern is valid"));

static AROUND_BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s*(</?(?:address|article|aside|blockquote|body|br|dd|div|dl|dt|fieldset|figcaption|figure|footer|form|h[1-6]|head|header|hr|html|li|link|main|meta|nav|ol|option|p|section|table|tbody|td|tfoot|th|thead|title|tr|ul)\b[^>]*>)\s*",
    )
    .expect("block tag pattern is valid")
});

/// Bundle references used by build blocks that name no path.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleRefs {
    pub css: String,
    pub js: String,
}

impl BundleRefs {
    /// `css/<css_bundle>` and `js/<js_bundle>`, where the bundle tasks write.
    pub fn from_files(files: &Files) -> Self {
        Self {
            css: format!("css/{}", files.css_bundle),
            js: format!("js/{}", files.js_bundle),
        }
    }
}

impl Default for BundleRefs {
    fn default() -> Self {
        Self::from_files(&Files::default())
    }
}

/// Result of resolving build blocks in a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRefs {
    pub html: String,
    /// Number of blocks replaced
    pub replaced: usize,
}

/// Replace each build block with a single reference to its bundle.
///
/// `css` blocks become a stylesheet `<link>`, `js` blocks a `<script>`,
/// `remove` blocks disappear. A `css` or `js` block without a path points at
/// the matching entry of `bundles`. Blocks of any other type are left
/// untouched. The output contains no markers of a handled type, so resolving
/// it again changes nothing.
pub fn resolve_references(html: &str, bundles: &BundleRefs) -> ResolvedRefs {
    let mut replaced = 0;

    let out = BUILD_BLOCK.replace_all(html, |caps: &Captures<'_>| {
        let kind = caps[1].to_ascii_lowercase();
        let path = caps.get(2).map(|m| m.as_str());

        let tag = match kind.as_str() {
            "css" => format!(
                r#"<link rel="stylesheet" href="{}">"#,
                path.unwrap_or(&bundles.css)
            ),
            "js" => format!(r#"<script src="{}"></script>"#, path.unwrap_or(&bundles.js)),
            "remove" => String::new(),
            other => {
                tracing::warn!(
                    "Unknown build block type '{}' for {}",
                    other,
                    path.unwrap_or("(no path)")
                );
                return caps[0].to_string();
            }
        };

        replaced += 1;
        tag
    });

    ResolvedRefs {
        html: out.into_owned(),
        replaced,
    }
}

/// Minify markup.
///
/// With `collapse_whitespace`, whitespace-only text between tags is removed,
/// other whitespace runs in text become a single space, and whitespace next
/// to block-level tags is trimmed. Tags and their attribute values are not
/// touched. `pre`, `textarea`, `script` and `style`
/// contents are left byte-for-byte intact. With `remove_comments`, comments
/// are dropped except conditional comments.
pub fn minify_html(html: &str, options: &HtmlMinOptions) -> String {
    let mut raw_blocks: Vec<String> = Vec::new();
    let mut out = RAW_ELEMENT
        .replace_all(html, |caps: &Captures<'_>| {
            raw_blocks.push(caps[0].to_string());
            format!("<kiln-raw-{}>", raw_blocks.len() - 1)
        })
        .into_owned();

    if options.remove_comments {
        out = COMMENT
            .replace_all(&out, |caps: &Captures<'_>| {
                let comment = &caps[0];
                if comment.starts_with("<!--[if") || comment.starts_with("<!--<![endif") {
                    comment.to_string()
                } else {
                    String::new()
                }
            })
            .into_owned();
    }

    if options.collapse_whitespace {
        out = BETWEEN_TAGS.replace_all(&out, "><").into_owned();
        out = collapse_text(&out);
        out = AROUND_BLOCK_TAG.replace_all(&out, "$1").into_owned();
        out = out.trim().to_string();
    }

    RAW_PLACEHOLDER
        .replace_all(&out, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| raw_blocks.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

/// Collapse whitespace runs in the text between tags.
fn collapse_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for tag in TAG.find_iter(html) {
        out.push_str(&WHITESPACE_RUN.replace_all(&html[last..tag.start()], " "));
        out.push_str(tag.as_str());
        last = tag.end();
    }
    out.push_str(&WHITESPACE_RUN.replace_all(&html[last..], " "));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Titulo</title>
    <!-- build:css css/app.min.css -->
    <link rel="stylesheet" href="/node_modules/bootstrap/dist/css/bootstrap.min.css">
    <link rel="stylesheet" href="/dist/css/app.css">
    <!-- endbuild -->
  </head>
  <body>
    <p>Hello   <b>big</b>   world</p>
    <!-- build:js js/app.min.js -->
    <script src="/node_modules/jquery/dist/jquery.min.js"></script>
    <script src="/dist/js/app.js"></script>
    <!-- endbuild -->
  </body>
</html>
"#;

    #[test]
    fn replaces_blocks_with_single_tags() {
        let resolved = resolve_references(PAGE, &BundleRefs::default());

        assert_eq!(resolved.replaced, 2);
        assert!(resolved
            .html
            .contains(r#"<link rel="stylesheet" href="css/app.min.css">"#));
        assert!(resolved
            .html
            .contains(r#"<script src="js/app.min.js"></script>"#));
        assert!(!resolved.html.contains("bootstrap.min.css"));
        assert!(!resolved.html.contains("build:"));
        assert!(!resolved.html.contains("endbuild"));
    }

    #[test]
    fn resolving_twice_is_a_no_op() {
        let once = resolve_references(PAGE, &BundleRefs::default());
        let twice = resolve_references(&once.html, &BundleRefs::default());

        assert_eq!(twice.replaced, 0);
        assert_eq!(twice.html, once.html);
    }

    #[test]
    fn accepts_alternate_search_path_and_remove_blocks() {
        let html = "<!-- build:js(.tmp) js/a.js --><script src=x></script><!-- endbuild -->\
                    <!-- build:remove dev --><script src=dev.js></script><!-- endbuild -->";

        let resolved = resolve_references(html, &BundleRefs::default());

        assert_eq!(resolved.html, r#"<script src="js/a.js"></script>"#);
        assert_eq!(resolved.replaced, 2);
    }

    #[test]
    fn leaves_unknown_block_types() {
        let html = "<!-- build:img x.png --><img src=y.png><!-- endbuild -->";

        let resolved = resolve_references(html, &BundleRefs::default());

        assert_eq!(resolved.replaced, 0);
        assert_eq!(resolved.html, html);
    }

    #[test]
    fn collapses_whitespace_nodes() {
        let resolved = resolve_references(PAGE, &BundleRefs::default());
        let min = minify_html(&resolved.html, &HtmlMinOptions::default());

        assert_eq!(
            min,
            "<!DOCTYPE html><html><head><title>Titulo</title><link rel=\"stylesheet\" href=\"css/app.min.css\"></head>\
             <body><p>Hello <b>big</b> world</p><script src=\"js/app.min.js\"></script></body></html>"
        );
    }

    #[test]
    fn keeps_raw_element_contents() {
        let html = "<div>\n  <pre>  a\n   b</pre>\n  <script>\nvar  x = 1;\n</script>\n</div>";

        let min = minify_html(html, &HtmlMinOptions::default());

        assert_eq!(min, "<div><pre>  a\n   b</pre><script>\nvar  x = 1;\n</script></div>");
    }

    #[test]
    fn removes_comments_but_keeps_conditionals() {
        let options = HtmlMinOptions {
            collapse_whitespace: false,
            remove_comments: true,
        };
        let html = "<p>a</p><!-- note --><!--[if IE]><p>ie</p><![endif]-->";

        assert_eq!(
            minify_html(html, &options),
            "<p>a</p><!--[if IE]><p>ie</p><![endif]-->"
        );
    }

    #[test]
    fn bare_blocks_point_at_the_bundles() {
        let html = "<head>\n<!-- build:css -->\n<link rel=\"stylesheet\" href=\"/dist/css/app.css\">\n<!-- endbuild -->\n</head>\n\
                    <body>\n<!-- build:js -->\n<script src=\"/dist/js/app.js\"></script>\n<!-- endbuild -->\n</body>";
        let bundles = BundleRefs {
            css: "css/site.min.css".to_string(),
            js: "js/site.min.js".to_string(),
        };

        let resolved = resolve_references(html, &bundles);

        assert_eq!(resolved.replaced, 2);
        assert_eq!(
            resolved.html,
            "<head>\n<link rel=\"stylesheet\" href=\"css/site.min.css\">\n</head>\n\
             <body>\n<script src=\"js/site.min.js\"></script>\n</body>"
        );
        assert_eq!(resolve_references(&resolved.html, &bundles).replaced, 0);
    }

    #[test]
    fn bundle_refs_follow_file_lists() {
        assert_eq!(
            BundleRefs::default(),
            BundleRefs {
                css: "css/app.min.css".to_string(),
                js: "js/app.min.js".to_string(),
            }
        );
    }

    #[test]
    fn leaves_attribute_values_alone() {
        let html = "<p title=\"a   b\">\n  one    two\n</p>\n<meta content=\"x\n  y\">";

        let min = minify_html(html, &HtmlMinOptions::default());

        assert_eq!(min, "<p title=\"a   b\">one two</p><meta content=\"x\n  y\">");
    }
}
