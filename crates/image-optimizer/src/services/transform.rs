//! Decode, resize and re-encode source images.
//!
//! Everything here is synchronous and CPU bound; async callers should run it
//! on the blocking pool.

use image::{
    DynamicImage, ImageFormat, ImageReader, Limits, codecs::jpeg::JpegEncoder,
    imageops::FilterType,
};
use std::io::Cursor;

use crate::{
    errors::{TransformError, TransformResult},
    models::{ImageInfo, MAX_QUALITY, MAX_WIDTH},
};

const SUPPORTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Tallest output the resize will produce.
pub const MAX_OUTPUT_HEIGHT: u32 = 10 * MAX_WIDTH;

/// Largest source width or height the decoder accepts.
pub const MAX_SOURCE_DIMENSION: u32 = 16_384;

/// Decoder allocation ceiling.
const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

/// Short lowercase name for a detected format, `"unknown"` when undetected.
pub fn format_name(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Jpeg) => "jpeg",
        Some(ImageFormat::Png) => "png",
        Some(ImageFormat::Gif) => "gif",
        Some(ImageFormat::WebP) => "webp",
        Some(other) => other.extensions_str().first().copied().unwrap_or("unknown"),
        None => "unknown",
    }
}

/// Height that keeps the aspect ratio at `target_width`, never below one pixel.
///
/// Saturates at `u32::MAX` for extreme aspect ratios.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scaled_height(src_width: u32, src_height: u32, target_width: u32) -> u32 {
    if src_width == 0 {
        return 1;
    }
    let height = (f64::from(src_height) * f64::from(target_width) / f64::from(src_width)).round();
    (height as u32).max(1)
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

pub struct TransformPipeline;

impl TransformPipeline {
    /// Resize `bytes` to `width` (height follows the aspect ratio) and encode as JPEG at `quality`.
    ///
    /// Both downscaling and upscaling use a Lanczos3 filter. Transparency is
    /// flattened because JPEG has no alpha channel. The output size is checked
    /// from the image header before any pixels are decoded.
    ///
    /// # Errors
    /// [`TransformError::Decode`] naming the detected format (or `"unknown"`)
    /// when the input cannot be decoded or exceeds the decoder limits,
    /// [`TransformError::OutputTooLarge`] when the output would be taller than
    /// [`MAX_OUTPUT_HEIGHT`], [`TransformError::Encode`] when the JPEG encoder fails.
    pub fn transform(bytes: &[u8], width: u32, quality: u32) -> TransformResult<Vec<u8>> {
        let format = Self::detect(bytes)?;
        let width = width.max(1);

        let (src_width, src_height) = Self::reader(bytes, format)
            .into_dimensions()
            .map_err(|e| decode_error(format, &e))?;
        let height = scaled_height(src_width, src_height, width);
        if height > MAX_OUTPUT_HEIGHT {
            return Err(TransformError::OutputTooLarge {
                width,
                height,
                max_height: MAX_OUTPUT_HEIGHT,
            });
        }

        let source = Self::reader(bytes, format)
            .decode()
            .map_err(|e| decode_error(format, &e))?;
        let resized = source.resize_exact(width, height, FilterType::Lanczos3);

        Self::encode_jpeg(&resized, quality)
    }

    /// Read dimensions and format from the image header without decoding pixels.
    ///
    /// # Errors
    /// [`TransformError::Decode`] when the header cannot be read.
    pub fn inspect(bytes: &[u8]) -> TransformResult<ImageInfo> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode {
                format: "unknown".to_string(),
                message: e.to_string(),
            })?;

        let format = format_name(reader.format());
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| TransformError::Decode {
                format: format.to_string(),
                message: e.to_string(),
            })?;

        Ok(ImageInfo {
            width,
            height,
            format: format.to_string(),
        })
    }

    /// Sniff the format from magic bytes and require one we decode.
    fn detect(bytes: &[u8]) -> TransformResult<ImageFormat> {
        let detected = image::guess_format(bytes).ok();
        detected
            .filter(|f| SUPPORTED_FORMATS.contains(f))
            .ok_or_else(|| TransformError::Decode {
                format: format_name(detected).to_string(),
                message: "unsupported or unrecognized image data".to_string(),
            })
    }

    fn reader(bytes: &[u8], format: ImageFormat) -> ImageReader<Cursor<&[u8]>> {
        let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
        reader.limits(decode_limits());
        reader
    }

    fn encode_jpeg(image: &DynamicImage, quality: u32) -> TransformResult<Vec<u8>> {
        let quality = u8::try_from(quality.clamp(1, MAX_QUALITY)).unwrap_or(90);
        let rgb = image.to_rgb8();

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode_image(&rgb)
            .map_err(|e| TransformError::Encode {
                message: e.to_string(),
            })?;
        Ok(out)
    }
}

fn decode_error(format: ImageFormat, err: &image::ImageError) -> TransformError {
    TransformError::Decode {
        format: format_name(Some(format)).to_string(),
        message: err.to_string(),
    }
}
