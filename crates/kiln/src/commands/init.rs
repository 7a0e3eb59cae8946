//! Scaffold a kiln project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Files written by `kiln init`, relative to the project root.
const SCAFFOLD: &[(&str, &str)] = &[
    ("kiln.toml", DEFAULT_CONFIG),
    ("src/templates/index.html", DEFAULT_TEMPLATE),
    ("src/templates/_layout.html", DEFAULT_LAYOUT),
    ("src/scss/main.scss", DEFAULT_STYLES),
    ("src/scss/_variables.scss", DEFAULT_VARIABLES),
    ("src/es6/app.js", DEFAULT_SCRIPT),
    ("src/humans.txt", DEFAULT_HUMANS),
    ("src/sitemap.xml", DEFAULT_SITEMAP),
];

/// Write the starter files under `root`. Existing files are kept unless
/// `yes` is set.
pub fn run(root: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing kiln...");

    for dir in ["src/img/svg"] {
        fs::create_dir_all(root.join(dir))
            .with_context(|| format!("Failed to create {}", dir))?;
    }

    let mut skipped = 0;
    for (relative, contents) in SCAFFOLD {
        let path = root.join(relative);
        if path.exists() && !yes {
            tracing::warn!("{} already exists. Use --yes to overwrite.", relative);
            skipped += 1;
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", relative))?;
        tracing::info!("Created {}", relative);
    }

    if skipped > 0 {
        tracing::info!("Kept {} existing file(s)", skipped);
    }
    tracing::info!("Initialization complete!");
    tracing::info!("Run 'kiln build' then 'kiln dev' to start working.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Kiln configuration
#
# Every glob may use {src}, {dist} and {vendor}; they expand to the
# directories below.

[dirs]
src = "src"
dist = "dist"
vendor = "node_modules"

[files]
# Concatenated in this order into css_bundle / js_bundle
css = [
  "{vendor}/bootstrap/dist/css/bootstrap.min.css",
  "{vendor}/font-awesome/css/font-awesome.min.css",
  "{dist}/css/app.css",
]
css_bundle = "app.min.css"
js = [
  "{vendor}/jquery/dist/jquery.min.js",
  "{vendor}/bootstrap/dist/js/bootstrap.min.js",
  "{dist}/js/app.js",
]
js_bundle = "app.min.js"
fonts = [
  "{vendor}/bootstrap/dist/fonts/*.*",
  "{vendor}/font-awesome/fonts/*.*",
]
statics = ["{src}/humans.txt", "{src}/sitemap.xml"]

[options.templates]
title = "Titulo"

[options.sass]
output_style = "compressed"

[options.scripts]
target = "es2015"

[options.autoprefixer]
browsers = ["last 5 versions"]

[options.htmlmin]
collapse_whitespace = true

[options.server]
port = 3000
base_dir = "{dist}"
index = "index.html"

[options.server.routes]
"/node_modules" = "{vendor}"
"/dist/css" = "{dist}/css"
"/dist/js" = "{dist}/js"
"/dist/fonts" = "{dist}/fonts"
"#;

const DEFAULT_LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{{ title }}</title>
    <!-- build:css css/app.min.css -->
    <link rel="stylesheet" href="/node_modules/bootstrap/dist/css/bootstrap.min.css">
    <link rel="stylesheet" href="/node_modules/font-awesome/css/font-awesome.min.css">
    <link rel="stylesheet" href="/dist/css/app.css">
    <!-- endbuild -->
  </head>
  <body>
    {% block body %}{% endblock %}
    <!-- build:js js/app.min.js -->
    <script src="/node_modules/jquery/dist/jquery.min.js"></script>
    <script src="/node_modules/bootstrap/dist/js/bootstrap.min.js"></script>
    <script src="/dist/js/app.js"></script>
    <!-- endbuild -->
  </body>
</html>
"#;

const DEFAULT_TEMPLATE: &str = r#"{% extends "_layout.html" %}
{% block body %}
    <main class="container">
      <h1 class="page-title">{{ title }}</h1>
      <p>Edit <code>src/templates/index.html</code> to get started.</p>
    </main>
{% endblock %}
"#;

const DEFAULT_VARIABLES: &str = r#"$brand: #2c3e50;
$spacing: 1.5rem;
"#;

const DEFAULT_STYLES: &str = r#"@import "variables";

.page-title {
  color: $brand;
  margin-top: $spacing;
}
"#;

const DEFAULT_SCRIPT: &str = r#"const ready = (fn) => document.addEventListener('DOMContentLoaded', fn);

ready(() => {
  const title = document.querySelector('.page-title');
  if (title) {
    title.dataset.ready = 'true';
  }
});
"#;

const DEFAULT_HUMANS: &str = r#"/* TEAM */
Developer: Your name

/* SITE */
Built with: kiln
"#;

const DEFAULT_SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/</loc>
  </url>
</urlset>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_a_loadable_project() {
        let temp = tempdir().unwrap();

        run(temp.path(), false).unwrap();

        for (relative, _) in SCAFFOLD {
            assert!(temp.path().join(relative).is_file(), "missing {relative}");
        }
        assert!(temp.path().join("src/img/svg").is_dir());

        let config = kiln_config::Config::load(&temp.path().join("kiln.toml")).unwrap();
        assert_eq!(config, kiln_config::Config::default().resolve().unwrap());
    }

    #[test]
    fn keeps_existing_files_without_yes() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("kiln.toml"), "# mine").unwrap();

        run(temp.path(), false).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("kiln.toml")).unwrap(),
            "# mine"
        );

        run(temp.path(), true).unwrap();
        assert!(fs::read_to_string(temp.path().join("kiln.toml"))
            .unwrap()
            .contains("[dirs]"));
    }
}
