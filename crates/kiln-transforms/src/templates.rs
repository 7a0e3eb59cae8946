//! Template engine for rendering page templates.

use std::path::Path;

use minijinja::{context, path_loader, AutoEscape, Environment, Value};

use kiln_config::Files;

use crate::error::TransformError;

/// Renders page templates with a fixed set of locals.
///
/// Every render sees exactly two values: `title` and `files`, the full
/// file-list configuration, so templates can enumerate bundle inputs, fonts
/// and static files. Locals are emitted as written: auto-escaping is off, so
/// paths keep their `/` inside scripts and comments.
pub struct TemplateEngine {
    locals: Value,
}

impl TemplateEngine {
    /// Create an engine with the given locals.
    pub fn new(title: &str, files: &Files) -> Self {
        Self {
            locals: context! {
                title => title,
                files => files,
            },
        }
    }

    /// Render a template source.
    ///
    /// `path` names the template and roots the loader, so `{% extends %}` and
    /// `{% include %}` resolve against siblings of the template file.
    pub fn render(&self, path: &Path, source: &str) -> Result<String, TransformError> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        if let Some(dir) = path.parent() {
            env.set_loader(path_loader(dir));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template.html".to_string());

        env.add_template_owned(name.clone(), source.to_string())?;

        let tmpl = env.get_template(&name)?;
        Ok(tmpl.render(&self.locals)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn renders_title_and_files() {
        let engine = TemplateEngine::new("Home", &Files::default());

        let html = engine
            .render(
                Path::new("index.html"),
                "<title>{{ title }}</title>{% for f in files.statics %}[{{ f }}]{% endfor %}",
            )
            .unwrap();

        assert!(html.contains("<title>Home</title>"));
        assert!(html.contains("[{src}/humans.txt]"));
        assert!(!html.contains("&#x2f;"));
    }

    #[test]
    fn keeps_paths_raw_inside_scripts() {
        let engine = TemplateEngine::new("T", &Files::default());

        let html = engine
            .render(
                Path::new("index.html"),
                "<script>var fonts = \"{{ files.fonts[0] }}\";</script>",
            )
            .unwrap();

        assert_eq!(
            html,
            "<script>var fonts = \"{vendor}/bootstrap/dist/fonts/*.*\";</script>"
        );
    }

    #[test]
    fn exposes_bundle_names() {
        let engine = TemplateEngine::new("T", &Files::default());

        let html = engine
            .render(
                Path::new("index.html"),
                "<link href=\"css/{{ files.css_bundle }}\">",
            )
            .unwrap();

        assert_eq!(html, "<link href=\"css/app.min.css\">");
    }

    #[test]
    fn resolves_partials_next_to_template() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("layout.html"),
            "<body>{% block body %}{% endblock %}</body>",
        )
        .unwrap();

        let engine = TemplateEngine::new("T", &Files::default());
        let html = engine
            .render(
                &temp.path().join("index.html"),
                "{% extends \"layout.html\" %}{% block body %}hi{% endblock %}",
            )
            .unwrap();

        assert_eq!(html, "<body>hi</body>");
    }

    #[test]
    fn reports_syntax_errors() {
        let engine = TemplateEngine::new("T", &Files::default());

        let err = engine
            .render(Path::new("broken.html"), "{% for x in %}")
            .unwrap_err();

        assert!(matches!(err, TransformError::Template(_)));
    }
}
