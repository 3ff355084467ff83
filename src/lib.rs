// SPDX-License-Identifier: GPL-3.0-only

//! Photo Booth - timed four-cut webcam capture and composite rendering
//!
//! This library provides the core of the booth: acquiring a camera stream,
//! running the countdown-and-capture sequence, and composing the shots into
//! one styled PNG.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera backend abstraction (V4L2, virtual)
//! - [`pipelines`]: Capture sequencing and composite rendering
//! - [`config`]: User configuration handling
//! - [`storage`]: Saving composites to disk
//!
//! # Example
//!
//! ```ignore
//! let backend = photo_booth::backends::camera::get_backend();
//! let mut sequencer = CaptureSequencer::open(
//!     backend.as_ref(),
//!     &StreamRequest::default(),
//!     SequencerOptions::default(),
//!     |stills| println!("got {} stills", stills.len()),
//! );
//! sequencer.start();
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use pipelines::composite::{
    CompositeImage, CompositeSession, CompositeSpec, FilterType, LayoutType, ThemeType,
};
pub use pipelines::photo::{CaptureSequencer, SequencerOptions, SequencerState, StillImage};
