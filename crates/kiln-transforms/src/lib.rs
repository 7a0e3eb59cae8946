//! Transform adapters used by kiln pipeline stages.
//!
//! Each module wraps one external tool behind a small function or type that
//! takes file contents in and hands transformed contents back. Nothing here
//! touches the output directory; reading and writing belong to the pipeline.

pub mod css;
pub mod error;
pub mod html;
pub mod images;
pub mod scripts;
pub mod svg;
pub mod templates;

pub use error::TransformError;
pub use images::{NeuQuantizer, Quantized, Quantizer};
pub use svg::SvgOptimizer;
pub use templates::TemplateEngine;
