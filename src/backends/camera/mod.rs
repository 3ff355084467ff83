// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! The booth only needs one thing from a camera: a live stream it can grab
//! RGBA frames from, and a way to stop that stream when it is done.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Capture Sequencer  │  ← owns the stream, stops it on teardown
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← enumeration + stream acquisition
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌─────────┐
//!   │ V4L2 │  │ Virtual │
//!   └──────┘  └─────────┘
//! ```

pub mod format_converters;
pub mod types;
#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub mod v4l2;

pub use types::*;

use tracing::debug;

/// Camera backend trait
///
/// Backends enumerate devices and hand out streams. A stream is owned by
/// exactly one consumer.
pub trait CameraBackend: Send + Sync {
    /// Enumerate available cameras
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Open a live video stream
    ///
    /// Permission problems must surface as [`BackendError::PermissionDenied`]
    /// and absent devices as [`BackendError::DeviceNotFound`].
    fn open_stream(&self, request: &StreamRequest) -> BackendResult<Box<dyn CameraStream>>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// A live camera stream
pub trait CameraStream: Send {
    /// Actual frame size delivered by the device
    ///
    /// This may differ from the requested ideal size.
    fn resolution(&self) -> (u32, u32);

    /// Grab the most recent frame
    fn grab_frame(&mut self) -> BackendResult<CameraFrame>;

    /// Stop every track of the stream
    ///
    /// Must be idempotent. After this, [`Self::grab_frame`] returns
    /// [`BackendError::NotActive`].
    fn stop(&mut self);

    /// Whether the stream is still delivering frames
    fn is_active(&self) -> bool;
}

/// Check the parts of a request every backend treats the same way
///
/// Streams are video only, so asking for audio fails. Webcams carry no facing
/// metadata; the indexed device is used whatever the facing preference.
pub fn check_request(request: &StreamRequest) -> BackendResult<()> {
    if request.audio {
        return Err(BackendError::FormatNotSupported(
            "audio capture is not supported".into(),
        ));
    }
    if request.facing != FacingMode::User {
        debug!(
            device_index = request.device_index,
            facing = ?request.facing,
            "No facing metadata, using the indexed device"
        );
    }
    Ok(())
}

/// Get the default backend for this platform
#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub fn get_backend() -> Box<dyn CameraBackend> {
    Box::new(v4l2::V4l2Backend::new())
}

/// Get the default backend for this platform
#[cfg(not(all(target_os = "linux", feature = "v4l2")))]
pub fn get_backend() -> Box<dyn CameraBackend> {
    Box::new(crate::backends::virtual_camera::VirtualBackend::failing(
        BackendError::DeviceNotFound("no camera backend built for this platform".into()),
    ))
}
