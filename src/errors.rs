// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the photo booth

use crate::backends::camera::types::BackendError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    /// Still capture errors
    #[error("Photo error: {0}")]
    Photo(#[from] PhotoError),
    /// Composite rendering errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
    /// Storage/filesystem errors
    #[error("Storage error: {0}")]
    Storage(String),
    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Camera acquisition errors
///
/// All of these are fatal to the current capture attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    /// No camera devices found
    #[error("No camera devices found")]
    NoCameraFound,
    /// The platform refused access to the device
    #[error("Camera permission denied")]
    PermissionDenied,
    /// Camera initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
    /// Stream stopped while it was still needed
    #[error("Camera stream stopped")]
    StreamStopped,
    /// Backend error
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Still capture errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhotoError {
    /// No frame available for capture
    #[error("No frame available for capture")]
    NoFrameAvailable,
    /// Capture failed
    #[error("Capture failed: {0}")]
    CaptureFailed(String),
    /// Encoding failed
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
    /// Decoding an encoded still failed
    #[error("Decoding failed: {0}")]
    DecodeFailed(String),
}

/// Composite rendering errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// Nothing to draw
    #[error("No still images to render")]
    EmptySequence,
    /// Canvas could not be allocated or drawn on
    #[error("Canvas error: {0}")]
    Canvas(String),
    /// Text overlay could not be built
    #[error("Text error: {0}")]
    Text(String),
    /// PNG export failed
    #[error("Export failed: {0}")]
    Encode(String),
}

impl CameraError {
    /// Message shown to the user when acquisition fails
    pub fn user_message(&self) -> &'static str {
        match self {
            CameraError::NoCameraFound | CameraError::PermissionDenied => {
                "CAMERA ERROR: Permission denied or no device found."
            }
            _ => "CAMERA ERROR: Could not start the camera.",
        }
    }
}

impl From<BackendError> for CameraError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DeviceNotFound(_) => CameraError::NoCameraFound,
            BackendError::PermissionDenied(_) => CameraError::PermissionDenied,
            BackendError::InitializationFailed(msg) => CameraError::InitializationFailed(msg),
            BackendError::NotActive => CameraError::StreamStopped,
            other => CameraError::Backend(other.to_string()),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Camera(err.into())
    }
}

// Conversion from String for ad-hoc CLI errors
impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        let err: AppError = CameraError::NoCameraFound.into();
        assert_eq!(err.to_string(), "Camera error: No camera devices found");

        let err: AppError = RenderError::EmptySequence.into();
        assert!(err.to_string().starts_with("Render error:"));
    }

    #[test]
    fn backend_errors_map_to_acquisition_failures() {
        assert_eq!(
            CameraError::from(BackendError::PermissionDenied("/dev/video0".into())),
            CameraError::PermissionDenied
        );
        assert_eq!(
            CameraError::from(BackendError::DeviceNotFound("none".into())),
            CameraError::NoCameraFound
        );
    }

    #[test]
    fn acquisition_failures_share_user_message() {
        assert_eq!(
            CameraError::PermissionDenied.user_message(),
            CameraError::NoCameraFound.user_message()
        );
    }
}
