//! Glob helpers shared by the task inputs, watchers and config checks.

use std::path::{Path, PathBuf};

const GLOB_CHARS: [char; 4] = ['*', '?', '[', '{'];

/// Whether a pattern contains any glob metacharacter.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_CHARS)
}

/// The base directory of a glob: its leading components without wildcards.
///
/// Matched files are written relative to this base, so `src/img/**/*.png`
/// maps `src/img/icons/a.png` to `icons/a.png`. A literal path has its parent
/// directory as base.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);

    if !is_glob(pattern) {
        return path.parent().map(Path::to_path_buf).unwrap_or_default();
    }

    let mut base = PathBuf::new();
    for component in path.components() {
        if component.as_os_str().to_string_lossy().contains(GLOB_CHARS) {
            break;
        }
        base.push(component);
    }
    base
}
