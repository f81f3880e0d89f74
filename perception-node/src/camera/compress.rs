use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, ColorType, GenericImageView};

use super::{EncodedImage, RawFrame};
use crate::error::Result;

pub const JPEG_MIME: &str = "image/jpeg";

/// Downscales so the longest side is at most `max_dimension` and re-encodes
/// as JPEG. CPU bound; callers run it on the blocking pool.
pub fn compress_frame(frame: &RawFrame, max_dimension: u32, quality: u8) -> Result<EncodedImage> {
    let decoded = image::load_from_memory(&frame.data)?;
    let (width, height) = decoded.dimensions();

    let resized = if width.max(height) > max_dimension {
        decoded.resize(max_dimension, max_dimension, FilterType::Triangle)
    } else {
        decoded
    };

    let rgb = resized.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;

    Ok(EncodedImage {
        bytes,
        mime_type: JPEG_MIME,
        width: rgb.width(),
        height: rgb.height(),
    })
}
