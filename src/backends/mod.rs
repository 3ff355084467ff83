// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! # Modules
//!
//! - [`camera`]: Camera backend traits, shared frame types and the V4L2 webcam backend
//! - [`virtual_camera`]: File-backed and generated camera streams

pub mod camera;
pub mod virtual_camera;
