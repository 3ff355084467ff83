// SPDX-License-Identifier: GPL-3.0-only

//! Still and composite image encoding
//!
//! - Stills: JPEG at a fixed quality (90 by default)
//! - Composites: PNG (lossless)
//!
//! Heavy encode/decode work runs on the blocking pool.

use crate::errors::{PhotoError, RenderError};
use image::{ImageFormat, RgbImage, RgbaImage};
use std::sync::Arc;
use tracing::debug;

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }
}

/// One cropped, mirrored, JPEG-encoded snapshot
///
/// Immutable once created; cloning shares the encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillImage {
    /// Zero-based slot in the capture sequence
    pub index: usize,
    /// Encoded JPEG bytes
    pub jpeg: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

impl StillImage {
    /// Encode a processed frame as a still
    pub fn encode(index: usize, image: &RgbImage, quality: u8) -> Result<Self, PhotoError> {
        let jpeg = encode_jpeg(image, quality)?;
        Ok(Self {
            index,
            jpeg: Arc::from(jpeg),
            width: image.width(),
            height: image.height(),
        })
    }

    /// Wrap already-encoded JPEG bytes, reading the dimensions from the header
    pub fn from_jpeg(index: usize, jpeg: Vec<u8>) -> Result<Self, PhotoError> {
        let decoded = decode_still_bytes(&jpeg)?;
        Ok(Self {
            index,
            width: decoded.width(),
            height: decoded.height(),
            jpeg: Arc::from(jpeg),
        })
    }

    /// Decode back to pixels
    pub fn decode(&self) -> Result<RgbImage, PhotoError> {
        decode_still_bytes(&self.jpeg)
    }
}

/// Encode image as JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, PhotoError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100));

    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

    debug!(size = buffer.len(), quality, "JPEG encoding complete");
    Ok(buffer)
}

/// Encode image as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Vec::new();

    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {}", e)))?;

    debug!(size = buffer.len(), "PNG encoding complete");
    Ok(buffer)
}

fn decode_still_bytes(bytes: &[u8]) -> Result<RgbImage, PhotoError> {
    image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map(|img| img.to_rgb8())
        .map_err(|e| PhotoError::DecodeFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_extensions() {
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Png.extension(), "png");
    }

    #[test]
    fn test_still_keeps_dimensions() {
        let image = RgbImage::from_pixel(40, 30, image::Rgb([10, 200, 30]));
        let still = StillImage::encode(2, &image, 90).unwrap();
        assert_eq!((still.width, still.height), (40, 30));
        assert_eq!(still.index, 2);
        // JPEG SOI marker
        assert_eq!(&still.jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(still.decode().unwrap().dimensions(), (40, 30));
    }

    #[test]
    fn test_png_signature() {
        let png = encode_png(&RgbaImage::new(3, 2)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        assert!(matches!(
            StillImage::from_jpeg(0, vec![1, 2, 3]),
            Err(PhotoError::DecodeFailed(_))
        ));
    }
}
