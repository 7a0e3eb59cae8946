//! End-to-end runs of the built-in tasks against a scratch project.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgba, RgbaImage};
use kiln_config::Config;
use kiln_tasks::builtin::{
    FONTS_COPY, HTML_FINALIZE, RASTER_OPTIMIZE, STYLE_COMPILE, TEMPLATE_RENDER,
};
use kiln_tasks::{default_registry, TaskError};
use tempfile::{tempdir, TempDir};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>{{ title }}</title>
    <!-- build:css css/app.min.css -->
    <link rel="stylesheet" href="/node_modules/bootstrap/dist/css/bootstrap.min.css">
    <link rel="stylesheet" href="/dist/css/app.css">
    <!-- endbuild -->
  </head>
  <body>
    <section class="hero">
      <button class="btn">Go</button>
    </section>
    <!-- build:js -->
    <script src="/node_modules/bootstrap/dist/js/bootstrap.min.js"></script>
    <script src="/dist/js/app.js"></script>
    <!-- endbuild -->
  </body>
</html>
"#;

struct Project {
    _temp: TempDir,
    src: PathBuf,
    dist: PathBuf,
    vendor: PathBuf,
}

impl Project {
    fn new() -> Self {
        let temp = tempdir().unwrap();
        let root = temp.path().to_path_buf();
        Self {
            src: root.join("src"),
            dist: root.join("dist"),
            vendor: root.join("node_modules"),
            _temp: temp,
        }
    }

    fn write(&self, path: PathBuf, contents: impl AsRef<[u8]>) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn config(&self) -> Config {
        Config::with_dirs(&self.src, &self.dist, &self.vendor).unwrap()
    }

    /// A small site. font-awesome and jquery are deliberately absent.
    fn site(self) -> Self {
        self.write(self.src.join("templates/index.html"), PAGE);
        self.write(
            self.src.join("scss/main.scss"),
            "$accent: #336699;\n.hero { color: $accent; }\n.never-used { margin: 0; }\n",
        );
        self.write(self.src.join("scss/_vars.scss"), "$unused: 1;\n");
        self.write(
            self.src.join("es6/app.js"),
            "const greet = (name) => `hello ${name}`;\nwindow.greet = greet;\n",
        );
        self.write(self.src.join("humans.txt"), "/* TEAM */\n");
        self.write(
            self.vendor.join("bootstrap/dist/css/bootstrap.min.css"),
            ".btn{color:red}.modal{display:none}",
        );
        self.write(
            self.vendor.join("bootstrap/dist/js/bootstrap.min.js"),
            "window.bootstrapLoaded = function () { return true; };\n",
        );
        self.write(
            self.vendor.join("bootstrap/dist/fonts/glyphicons.woff"),
            b"wOFF-font-bytes",
        );
        self
    }
}

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn png(path: &Path) {
    let img: RgbaImage =
        ImageBuffer::from_fn(32, 32, |x, y| Rgba([(x * 8) as u8, (y * 8) as u8, 64, 255]));
    img.save(path).unwrap();
}

#[tokio::test]
async fn full_build_produces_the_output_layout() {
    let project = Project::new().site();
    let registry = default_registry(&project.config()).unwrap();

    let reports = registry.run(&targets(&["build"]), true).await.unwrap();

    assert_eq!(reports.len(), 11);
    assert!(reports.iter().all(|r| r.is_success()), "{reports:#?}");

    let dist = &project.dist;
    for file in [
        "index.html",
        "css/app.css",
        "css/app.min.css",
        "js/app.js",
        "js/app.min.js",
        "fonts/glyphicons.woff",
        "humans.txt",
    ] {
        assert!(dist.join(file).is_file(), "missing {file}");
    }

    // Finalized page points at the bundles only
    let page = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(page.contains(r#"<link rel="stylesheet" href="css/app.min.css">"#));
    assert!(page.contains(r#"<script src="js/app.min.js"></script>"#));
    assert!(page.contains("<title>Titulo</title>"));
    assert!(!page.contains("bootstrap.min.css"));
    assert!(!page.contains("endbuild"));
    assert!(!page.contains(">\n"));

    // Only selectors used by the rendered page survive
    let css = fs::read_to_string(dist.join("css/app.min.css")).unwrap();
    assert!(css.contains(".btn"));
    assert!(css.contains(".hero"));
    assert!(!css.contains(".modal"));
    assert!(!css.contains(".never-used"));
}

#[tokio::test]
async fn js_bundle_is_no_larger_than_its_inputs() {
    let project = Project::new().site();
    let config = project.config();
    let registry = default_registry(&config).unwrap();

    registry
        .run(&targets(&["script-transpile"]), true)
        .await
        .unwrap();
    let inputs: usize = config
        .files
        .js
        .iter()
        .filter_map(|path| fs::metadata(path).ok())
        .map(|meta| meta.len() as usize + 1)
        .sum();

    registry.run(&targets(&["js-bundle"]), false).await.unwrap();

    let bundle = fs::metadata(project.dist.join("js/app.min.js")).unwrap();
    assert!((bundle.len() as usize) <= inputs);
}

#[tokio::test]
async fn html_finalize_is_idempotent() {
    let project = Project::new().site();
    let registry = default_registry(&project.config()).unwrap();
    registry.run(&targets(&[HTML_FINALIZE]), true).await.unwrap();
    let once = fs::read_to_string(project.dist.join("index.html")).unwrap();

    registry
        .run(&targets(&[HTML_FINALIZE]), false)
        .await
        .unwrap();

    let twice = fs::read_to_string(project.dist.join("index.html")).unwrap();
    assert_eq!(once, twice);
}

#[tokio::test]
async fn renamed_output_is_a_single_file() {
    let project = Project::new().site();
    project.write(project.src.join("scss/extra.scss"), ".extra { padding: 1px; }");
    let registry = default_registry(&project.config()).unwrap();

    let reports = registry
        .run(&targets(&[STYLE_COMPILE]), false)
        .await
        .unwrap();

    assert_eq!(reports[0].matched, 2);
    let written: Vec<_> = fs::read_dir(project.dist.join("css")).unwrap().collect();
    assert_eq!(written.len(), 1);
    assert!(project.dist.join("css/app.css").is_file());
}

#[tokio::test]
async fn empty_font_directory_does_not_hide_the_other() {
    let project = Project::new().site();
    fs::create_dir_all(project.vendor.join("font-awesome/fonts")).unwrap();
    project.write(
        project.vendor.join("bootstrap/dist/fonts/glyphicons.ttf"),
        b"ttf",
    );
    let registry = default_registry(&project.config()).unwrap();

    let reports = registry.run(&targets(&[FONTS_COPY]), false).await.unwrap();

    assert_eq!(reports[0].written.len(), 2);
    assert!(project.dist.join("fonts/glyphicons.ttf").is_file());
    assert!(project.dist.join("fonts/glyphicons.woff").is_file());
}

#[tokio::test]
async fn corrupt_image_is_counted_and_skipped() {
    let project = Project::new();
    fs::create_dir_all(project.src.join("img/icons")).unwrap();
    png(&project.src.join("img/icons/good.png"));
    project.write(project.src.join("img/bad.png"), b"not a png");
    let registry = default_registry(&project.config()).unwrap();

    let reports = registry
        .run(&targets(&[RASTER_OPTIMIZE]), false)
        .await
        .unwrap();

    assert_eq!(reports[0].matched, 2);
    assert_eq!(reports[0].failed, 1);
    assert!(!reports[0].is_success());
    assert!(project.dist.join("img/icons/good.png").is_file());
    assert!(!project.dist.join("img/bad.png").exists());
}

#[tokio::test]
async fn template_partials_are_not_rendered_as_pages() {
    let project = Project::new().site();
    project.write(
        project.src.join("templates/_layout.html"),
        "<main>{% block body %}{% endblock %}</main>",
    );
    let registry = default_registry(&project.config()).unwrap();

    let reports = registry
        .run(&targets(&[TEMPLATE_RENDER]), false)
        .await
        .unwrap();

    assert_eq!(reports[0].written, vec![project.dist.join("index.html")]);
}

#[test]
fn unknown_task_is_rejected() {
    let project = Project::new();
    let registry = default_registry(&project.config()).unwrap();

    let err = registry.plan(&targets(&["gzip"]), true).unwrap_err();

    assert!(matches!(err, TaskError::UnknownTask(_)));
}
