// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::camera::{IDEAL_HEIGHT, IDEAL_WIDTH};
use std::sync::Arc;
use std::time::Instant;

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Front-facing (selfie) camera
    #[default]
    User,
    /// Rear/world-facing camera
    Environment,
}

/// Parameters for opening a camera stream
///
/// The ideal size is a hint; backends report what they actually delivered
/// through [`super::CameraStream::resolution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Device index among enumerated cameras
    pub device_index: usize,
    /// Preferred frame width
    pub ideal_width: u32,
    /// Preferred frame height
    pub ideal_height: u32,
    /// Preferred facing direction
    pub facing: FacingMode,
    /// Audio is never captured by the booth
    pub audio: bool,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            device_index: 0,
            ideal_width: IDEAL_WIDTH,
            ideal_height: IDEAL_HEIGHT,
            facing: FacingMode::User,
            audio: false,
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Human-readable device name
    pub name: String,
    /// Path to capture device (e.g. /dev/video0, or a virtual source label)
    pub path: String,
    /// Driver name, when the backend knows it
    pub driver: Option<String>,
}

/// A single RGBA8 frame grabbed from a stream
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA pixels (`width * height * 4` bytes)
    pub data: Arc<[u8]>,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a frame from packed RGBA data, validating its size
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> BackendResult<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(BackendError::FormatNotSupported(format!(
                "RGBA frame {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: Arc::from(data),
            captured_at: Instant::now(),
        })
    }

    /// Row stride in bytes
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// RGBA value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = y as usize * self.stride() + x as usize * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Failed to initialize device or stream
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
    /// Camera device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    /// The platform denied access to the device
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Format not supported
    #[error("Format not supported: {0}")]
    FormatNotSupported(String),
    /// Stream has been stopped
    #[error("Stream is not active")]
    NotActive,
    /// No frame has arrived yet
    #[error("No frame available")]
    NoFrame,
    /// General I/O error
    #[error("I/O error: {0}")]
    IoError(String),
    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(err.to_string()),
            _ => BackendError::IoError(err.to_string()),
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
