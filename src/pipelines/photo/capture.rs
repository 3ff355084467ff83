// SPDX-License-Identifier: GPL-3.0-only

//! Single still capture from a live stream
//!
//! Grab one frame, crop it to 4:3, mirror it, encode it. This runs inline on
//! the sequencer's timeline; it never yields.

use super::encoding::StillImage;
use super::processing::crop_and_mirror;
use crate::backends::camera::CameraStream;
use crate::backends::camera::types::BackendError;
use crate::constants::camera::STILL_JPEG_QUALITY;
use crate::errors::PhotoError;
use tracing::{debug, info};

/// Per-shot processing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Mirror horizontally (selfie view)
    pub mirror: bool,
    /// JPEG quality (0-100)
    pub jpeg_quality: u8,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            mirror: true,
            jpeg_quality: STILL_JPEG_QUALITY,
        }
    }
}

/// Photo capture handler
pub struct PhotoCapture;

impl PhotoCapture {
    /// Capture one still for slot `index`
    ///
    /// # Returns
    /// * `Ok(StillImage)` - Cropped, mirrored JPEG
    /// * `Err(PhotoError)` - Grab, crop or encode failed
    pub fn capture_still(
        stream: &mut dyn CameraStream,
        index: usize,
        settings: &CaptureSettings,
    ) -> Result<StillImage, PhotoError> {
        let frame = stream.grab_frame().map_err(|e| match e {
            BackendError::NoFrame => PhotoError::NoFrameAvailable,
            other => PhotoError::CaptureFailed(other.to_string()),
        })?;

        debug!(
            width = frame.width,
            height = frame.height,
            "Frame captured from stream"
        );

        let processed = crop_and_mirror(&frame, settings.mirror)?;
        let still = StillImage::encode(index, &processed, settings.jpeg_quality)?;

        info!(
            shot = index,
            width = still.width,
            height = still.height,
            bytes = still.jpeg.len(),
            "Still captured"
        );
        Ok(still)
    }
}
