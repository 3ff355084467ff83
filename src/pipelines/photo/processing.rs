// SPDX-License-Identifier: GPL-3.0-only

//! Still image post-processing
//!
//! Every captured frame is cut down to a centered 4:3 region and mirrored
//! horizontally (selfie view) before encoding. The crop geometry works from
//! whatever resolution the device actually delivered.

use crate::backends::camera::types::CameraFrame;
use crate::constants::TARGET_ASPECT;
use crate::errors::PhotoError;
use image::{RgbImage, RgbaImage};
use tracing::debug;

/// Width and height units of the 4:3 still
const ASPECT_UNITS: (u32, u32) = (4, 3);

/// Source rectangle of a centered crop, in source pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub start_x: f64,
    pub start_y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    /// Compute the centered crop of a `src_width` x `src_height` frame to `aspect`
    ///
    /// Wider sources lose their sides, taller (or equal) sources lose top and
    /// bottom. An exact match yields the whole frame with a zero origin.
    pub fn centered(src_width: u32, src_height: u32, aspect: f64) -> Self {
        let w = f64::from(src_width);
        let h = f64::from(src_height);

        if w / h > aspect {
            let width = h * aspect;
            Self {
                start_x: (w - width) / 2.0,
                start_y: 0.0,
                width,
                height: h,
            }
        } else {
            let height = w / aspect;
            Self {
                start_x: 0.0,
                start_y: (h - height) / 2.0,
                width: w,
                height,
            }
        }
    }

    /// Centered 4:3 crop
    pub fn four_by_three(src_width: u32, src_height: u32) -> Self {
        Self::centered(src_width, src_height, TARGET_ASPECT)
    }

    /// Aspect ratio of the crop
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Output canvas size in whole pixels
    ///
    /// Snapped down to the largest exact `4k x 3k` size that fits the crop, so
    /// odd source sizes still give an exact 4:3 still.
    pub fn pixel_size(&self) -> (u32, u32) {
        let k = (self.width as u32 / ASPECT_UNITS.0).min(self.height as u32 / ASPECT_UNITS.1);
        (k * ASPECT_UNITS.0, k * ASPECT_UNITS.1)
    }

    /// Integer source origin that centres the pixel-sized region
    fn pixel_origin(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        let (w, h) = self.pixel_size();
        (
            src_width.saturating_sub(w) / 2,
            src_height.saturating_sub(h) / 2,
        )
    }
}

/// Crop a frame to 4:3 and optionally mirror it
pub fn crop_and_mirror(frame: &CameraFrame, mirror: bool) -> Result<RgbImage, PhotoError> {
    let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.data.to_vec())
        .ok_or_else(|| PhotoError::CaptureFailed("frame buffer has the wrong size".into()))?;
    crop_image(&rgba, mirror)
}

/// Crop an RGBA image to 4:3 and optionally mirror it
pub fn crop_image(source: &RgbaImage, mirror: bool) -> Result<RgbImage, PhotoError> {
    let (src_w, src_h) = source.dimensions();
    let crop = CropRect::four_by_three(src_w, src_h);
    let (w, h) = crop.pixel_size();
    if w == 0 || h == 0 {
        return Err(PhotoError::CaptureFailed(format!(
            "frame {}x{} is too small to crop",
            src_w, src_h
        )));
    }
    let (x, y) = crop.pixel_origin(src_w, src_h);

    debug!(src_w, src_h, x, y, w, h, mirror, "Cropping frame to 4:3");

    let mut cropped = image::imageops::crop_imm(source, x, y, w, h).to_image();
    if mirror {
        image::imageops::flip_horizontal_in_place(&mut cropped);
    }

    Ok(image::DynamicImage::ImageRgba8(cropped).to_rgb8())
}
