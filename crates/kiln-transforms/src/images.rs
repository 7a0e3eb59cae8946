//! Raster image compression and WebP conversion.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, RgbaImage};

use kiln_config::{ImageOptions, WebpOptions};

use crate::error::TransformError;

/// A palette-reduced image: one palette index per pixel.
#[derive(Debug, Clone)]
pub struct Quantized {
    /// RGBA palette entries
    pub palette: Vec<[u8; 4]>,
    /// Row-major palette indices
    pub indices: Vec<u8>,
}

/// Reduces an image to at most `colors` palette entries.
pub trait Quantizer: Send + Sync {
    fn quantize(&self, image: &RgbaImage, colors: usize) -> Quantized;
}

/// NeuQuant neural-network quantizer.
#[derive(Debug, Clone)]
pub struct NeuQuantizer {
    /// 1 (best, slowest) to 30 (fastest)
    pub sample_factor: i32,
}

impl Default for NeuQuantizer {
    fn default() -> Self {
        Self { sample_factor: 10 }
    }
}

impl Quantizer for NeuQuantizer {
    fn quantize(&self, image: &RgbaImage, colors: usize) -> Quantized {
        let nq = color_quant::NeuQuant::new(self.sample_factor, colors, image.as_raw());

        let palette = nq
            .color_map_rgba()
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();

        let indices = image
            .pixels()
            .map(|p| nq.index_of(&p.0) as u8)
            .collect();

        Quantized { palette, indices }
    }
}

/// Compress a PNG, JPEG or GIF.
///
/// PNGs are quantized through `quantizer` (when enabled) and written as
/// indexed PNGs at maximum compression; JPEGs are re-encoded at the configured
/// quality; GIFs pass through. The original bytes are returned whenever the
/// result would not be smaller.
pub fn optimize_raster(
    bytes: &[u8],
    extension: &str,
    options: &ImageOptions,
    quantizer: &dyn Quantizer,
) -> Result<Vec<u8>, TransformError> {
    let format = ImageFormat::from_extension(extension)
        .ok_or_else(|| TransformError::Unsupported(format!("image type .{}", extension)))?;

    let optimized = match format {
        ImageFormat::Png => {
            let img = image::load_from_memory_with_format(bytes, format)?;
            if options.png_quantize {
                quantized_png(&img.to_rgba8(), options.png_colors, quantizer)?
            } else {
                recompressed_png(&img)?
            }
        }
        ImageFormat::Jpeg => {
            let img = image::load_from_memory_with_format(bytes, format)?;
            let mut out = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut out, options.jpeg_quality.clamp(1, 100));
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
            out
        }
        ImageFormat::Gif => {
            tracing::debug!("GIF passed through unchanged");
            return Ok(bytes.to_vec());
        }
        other => {
            return Err(TransformError::Unsupported(format!(
                "image format {:?}",
                other
            )))
        }
    };

    if optimized.len() < bytes.len() {
        Ok(optimized)
    } else {
        tracing::debug!(
            "Optimized size {} not below original {}, keeping original",
            optimized.len(),
            bytes.len()
        );
        Ok(bytes.to_vec())
    }
}

/// Encode an image as lossy WebP.
pub fn to_webp(bytes: &[u8], options: &WebpOptions) -> Result<Vec<u8>, TransformError> {
    let img = image::load_from_memory(bytes)?;
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());

    let encoder = webp::Encoder::from_image(&rgba)
        .map_err(|e| TransformError::Image(format!("WebP encoder: {}", e)))?;

    Ok(encoder.encode(options.quality.clamp(0.0, 100.0)).to_vec())
}

fn quantized_png(
    rgba: &RgbaImage,
    colors: u16,
    quantizer: &dyn Quantizer,
) -> Result<Vec<u8>, TransformError> {
    let quantized = quantizer.quantize(rgba, usize::from(colors.clamp(2, 256)));

    let rgb: Vec<u8> = quantized
        .palette
        .iter()
        .flat_map(|c| [c[0], c[1], c[2]])
        .collect();
    let alpha: Vec<u8> = quantized.palette.iter().map(|c| c[3]).collect();

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, rgba.width(), rgba.height());
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(rgb);
        encoder.set_trns(alpha);
        encoder.set_compression(png::Compression::Best);

        let mut writer = encoder.write_header().map_err(png_error)?;
        writer
            .write_image_data(&quantized.indices)
            .map_err(png_error)?;
        writer.finish().map_err(png_error)?;
    }
    Ok(out)
}

fn recompressed_png(img: &DynamicImage) -> Result<Vec<u8>, TransformError> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

fn png_error(e: png::EncodingError) -> TransformError {
    TransformError::Image(format!("PNG encode error: {}", e))
}
