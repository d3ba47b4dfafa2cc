//! Image encoding: decode uploads, encode JPEG/PNG, wrap as base64.
//!
//! Page images sent to the AI gateway are JPEG at a configurable quality:
//! table scans are photographs of text, and JPEG at 95 keeps them legible at
//! a fraction of the PNG size. User-facing image outputs (QR, edited images)
//! are PNG so transparency survives.

use crate::error::EngineError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Decode an uploaded image (PNG, JPEG).
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, EngineError> {
    image::load_from_memory(bytes).map_err(|e| EngineError::UnsupportedInputFormat(e.to_string()))
}

/// Encode as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, EngineError> {
    let mut buf = Vec::new();
    let rgb = img.to_rgb8();
    JpegEncoder::new_with_quality(&mut Cursor::new(&mut buf), quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| EngineError::EngineInternalFailure(format!("JPEG encoding failed: {e}")))?;
    debug!("Encoded {}x{} → {} bytes JPEG (q={})", img.width(), img.height(), buf.len(), quality);
    Ok(buf)
}

/// Encode as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, EngineError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| EngineError::EngineInternalFailure(format!("PNG encoding failed: {e}")))?;
    Ok(buf)
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 returned by the AI service.
pub fn from_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let bytes = encode_jpeg(&red(), 90).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn png_decodes_back_to_same_size() {
        let bytes = encode_png(&red()).unwrap();
        let img = decode_image(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (10, 10));
    }

    #[test]
    fn garbage_is_unsupported_format() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedInputFormat(_)));
    }

    #[test]
    fn base64_round_trip_trims() {
        let b64 = to_base64(b"abc");
        assert_eq!(from_base64(&format!(" {b64}\n")).unwrap(), b"abc");
    }
}
