//! A file travelling through a pipeline.

use std::path::{Path, PathBuf};

use kiln_transforms::TransformError;

/// One file in a task's stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// Path the file was read from
    pub source: PathBuf,

    /// Output path relative to the sink directory
    pub relative: PathBuf,

    /// Current contents
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(source: impl Into<PathBuf>, relative: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            relative: relative.into(),
            contents,
        }
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.contents).map_err(|e| {
            TransformError::Unsupported(format!("{} is not UTF-8: {}", self.source.display(), e))
        })
    }

    pub fn set_text(&mut self, text: String) {
        self.contents = text.into_bytes();
    }

    /// Lower-cased extension of the output path.
    pub fn extension(&self) -> String {
        self.relative
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn with_extension(&mut self, extension: &str) {
        self.relative.set_extension(extension);
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_binary_as_text() {
        let asset = Asset::new("a.png", "a.png", vec![0xff, 0xfe, 0x00]);
        assert!(asset.text().is_err());
    }

    #[test]
    fn swaps_extension_of_output_path_only() {
        let mut asset = Asset::new("src/img/a/b.PNG", "a/b.PNG", vec![]);
        assert_eq!(asset.extension(), "png");

        asset.with_extension("webp");

        assert_eq!(asset.relative, PathBuf::from("a/b.webp"));
        assert_eq!(asset.source(), Path::new("src/img/a/b.PNG"));
    }
}
