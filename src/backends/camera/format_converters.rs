// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion utilities for camera backends
//!
//! Every backend hands RGBA8 frames to the capture pipeline; these helpers
//! turn the raw device formats into that.

use super::types::{BackendError, BackendResult};

/// Convert YUYV (YUV 4:2:2) to RGBA
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients for YUV to RGB conversion.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> BackendResult<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    let stride = (stride as usize).max(w * 2);
    if data.len() < stride * (h.saturating_sub(1)) + w * 2 {
        return Err(BackendError::FormatNotSupported(format!(
            "YUYV buffer too small for {}x{}: {} bytes",
            width,
            height,
            data.len()
        )));
    }

    let mut rgba = Vec::with_capacity(w * h * 4);
    for row in 0..h {
        let line = &data[row * stride..row * stride + w * 2];
        for chunk in line.chunks_exact(4) {
            let y0 = chunk[0] as f32;
            let u = chunk[1] as f32 - 128.0;
            let y1 = chunk[2] as f32;
            let v = chunk[3] as f32 - 128.0;

            for y in [y0, y1] {
                rgba.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
                rgba.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
                rgba.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
                rgba.push(255);
            }
        }
        // Odd widths leave a trailing half-pair
        if w % 2 == 1 {
            let last = &line[line.len() - 2..];
            let y = last[0];
            rgba.extend_from_slice(&[y, y, y, 255]);
        }
    }

    Ok(rgba)
}

/// Decode an MJPG buffer to RGBA
///
/// Returns `(rgba, width, height)`; the JPEG's own dimensions win over
/// whatever the device negotiated.
pub fn mjpeg_to_rgba(data: &[u8]) -> BackendResult<(Vec<u8>, u32, u32)> {
    let image = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map_err(|e| BackendError::FormatNotSupported(format!("MJPG decode failed: {}", e)))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((rgba.into_raw(), width, height))
}

/// Expand packed RGB24 to RGBA
pub fn rgb_to_rgba(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(3)
        .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_gray_is_gray() {
        // Two pixels of Y=128 with neutral chroma
        let data = [128u8, 128, 128, 128];
        let rgba = yuyv_to_rgba(&data, 2, 1, 4).unwrap();
        assert_eq!(rgba, vec![128, 128, 128, 255, 128, 128, 128, 255]);
    }

    #[test]
    fn test_yuyv_respects_stride() {
        // Row padding bytes (0xFF) must be skipped
        let data = [
            16u8, 128, 16, 128, 0xFF, 0xFF, //
            235, 128, 235, 128, 0xFF, 0xFF,
        ];
        let rgba = yuyv_to_rgba(&data, 2, 2, 6).unwrap();
        assert_eq!(rgba.len(), 2 * 2 * 4);
        assert_eq!(&rgba[0..4], &[16, 16, 16, 255]);
        assert_eq!(&rgba[8..12], &[235, 235, 235, 255]);
    }

    #[test]
    fn test_yuyv_rejects_short_buffer() {
        assert!(yuyv_to_rgba(&[0u8; 4], 4, 2, 8).is_err());
    }

    #[test]
    fn test_rgb_to_rgba() {
        assert_eq!(rgb_to_rgba(&[1, 2, 3, 4, 5, 6]), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_mjpeg_roundtrip_dimensions() {
        let img = image::RgbImage::from_pixel(8, 6, image::Rgb([200, 10, 10]));
        let mut jpeg = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();
        let (rgba, w, h) = mjpeg_to_rgba(&jpeg).unwrap();
        assert_eq!((w, h), (8, 6));
        assert_eq!(rgba.len(), 8 * 6 * 4);
    }
}
