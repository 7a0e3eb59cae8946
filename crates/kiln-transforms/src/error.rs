//! Transform error type.

/// Errors raised by a single transform applied to a single file.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Template error: {0}")]
    Template(String),

    #[error("Sass error: {0}")]
    Sass(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("CSS error: {0}")]
    Css(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Unsupported input: {0}")]
    Unsupported(String),
}

impl From<minijinja::Error> for TransformError {
    fn from(e: minijinja::Error) -> Self {
        TransformError::Template(e.to_string())
    }
}

impl From<image::ImageError> for TransformError {
    fn from(e: image::ImageError) -> Self {
        TransformError::Image(e.to_string())
    }
}
