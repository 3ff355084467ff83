// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources for the virtual camera
//!
//! Image files on disk, or a generated test pattern when no files are given.

use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame};
use crate::constants::file_formats;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Load an image file as an RGBA camera frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    debug!(path = %path.display(), "Loading image as frame");

    let image = image::open(path)
        .map_err(|e| BackendError::Other(format!("Failed to load {}: {}", path.display(), e)))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    CameraFrame::from_rgba(width, height, rgba.into_raw())
}

/// Collect the image files a file source will cycle through
///
/// A directory expands to its image files in name order; files are taken as given.
pub fn collect_image_paths(inputs: &[PathBuf]) -> BackendResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| {
                    path.extension()
                        .and_then(|e| e.to_str())
                        .map(|e| file_formats::is_image_extension(&e.to_lowercase()))
                        .unwrap_or(false)
                })
                .collect();
            found.sort();
            paths.extend(found);
        } else if input.is_file() {
            paths.push(input.clone());
        } else {
            warn!(path = %input.display(), "Skipping missing source path");
        }
    }

    if paths.is_empty() {
        return Err(BackendError::DeviceNotFound(
            "no image files for file source".into(),
        ));
    }

    info!(count = paths.len(), "File source ready");
    Ok(paths)
}

/// Generate a test pattern frame
///
/// Horizontal red ramp, vertical green ramp and a blue band on the left
/// quarter, so crops and mirrors are visible in the output.
pub fn synthetic_frame(width: u32, height: u32, seed: u8) -> BackendResult<CameraFrame> {
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let r = ((x as u64 * 255) / u64::from(width.max(1))) as u8;
            let g = ((y as u64 * 255) / u64::from(height.max(1))) as u8;
            let b = if x < width / 4 { 255 } else { seed };
            data.extend_from_slice(&[r, g, b, 255]);
        }
    }
    CameraFrame::from_rgba(width, height, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_frame_layout() {
        let frame = synthetic_frame(8, 4, 7).unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
        assert_eq!(frame.pixel(0, 0), [0, 0, 255, 255]);
        assert_eq!(frame.pixel(7, 0)[2], 7);
        assert!(frame.pixel(7, 0)[0] > frame.pixel(1, 0)[0]);
    }

    #[test]
    fn test_collect_rejects_empty_input() {
        assert!(matches!(
            collect_image_paths(&[]),
            Err(BackendError::DeviceNotFound(_))
        ));
    }
}
