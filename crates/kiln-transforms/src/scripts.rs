//! Script transforms built on oxc: syntax lowering and minification.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::error::TransformError;

/// Lower modern syntax in `source` down to `target` (e.g. `es2015`).
pub fn transpile(path: &Path, source: &str, target: &str) -> Result<String, TransformError> {
    let options = TransformOptions::from_target(target)
        .map_err(|e| TransformError::Script(format!("invalid target {}: {}", target, e)))?;

    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_default();

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        return Err(script_error(path, &parsed.errors));
    }
    let mut program = parsed.program;

    let semantic = SemanticBuilder::new().build(&program);
    if !semantic.errors.is_empty() {
        return Err(script_error(path, &semantic.errors));
    }
    let scoping = semantic.semantic.into_scoping();

    let transformed =
        Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(script_error(path, &transformed.errors));
    }

    Ok(Codegen::new().build(&program).code)
}

/// Minify a classic (non-module) script: compress, mangle, print compact.
pub fn minify_js(source: &str) -> Result<String, TransformError> {
    let allocator = Allocator::default();

    let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        return Err(script_error(Path::new("<bundle>"), &parsed.errors));
    }
    let mut program = parsed.program;

    let minified = Minifier::new(MinifierOptions::default()).build(&allocator, &mut program);

    Ok(Codegen::new()
        .with_options(CodegenOptions::minify())
        .with_scoping(minified.scoping)
        .build(&program)
        .code)
}

fn script_error(path: &Path, errors: &[impl std::fmt::Display]) -> TransformError {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    TransformError::Script(format!("{}: {}", path.display(), messages.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowers_arrow_functions_and_classes() {
        let out = transpile(
            Path::new("app.js"),
            "const add = (a, b) => a + b;\nclass Greeter { hi() { return `hi ${add(1, 2)}`; } }",
            "es2015",
        )
        .unwrap();

        assert!(out.contains("class Greeter"));
        assert!(out.contains("=>"));

        let es5 = transpile(
            Path::new("app.js"),
            "const f = (x) => x ** 2;",
            "es2015",
        )
        .unwrap();
        assert!(!es5.contains("**"));
    }

    #[test]
    fn rejects_invalid_target() {
        let err = transpile(Path::new("app.js"), "1;", "es1999").unwrap_err();
        assert!(matches!(err, TransformError::Script(_)));
    }

    #[test]
    fn reports_syntax_errors_with_path() {
        let err = transpile(Path::new("src/es6/bad.js"), "let = ;", "es2015").unwrap_err();
        assert!(err.to_string().contains("src/es6/bad.js"));
    }

    #[test]
    fn minified_output_is_smaller() {
        let source = r#"
function computeTotal(items) {
    var runningTotal = 0;
    for (var index = 0; index < items.length; index++) {
        runningTotal = runningTotal + items[index].price;
    }
    return runningTotal;
}
window.computeTotal = computeTotal;
"#;

        let minified = minify_js(source).unwrap();

        assert!(minified.len() < source.len());
        assert!(minified.contains("computeTotal"));
    }
}
