// SPDX-License-Identifier: GPL-3.0-only

//! Photo capture pipeline
//!
//! ```text
//! Camera Stream → Countdown → Grab → Crop 4:3 → Mirror → JPEG → Still Image
//!                     ↑                                            │
//!                     └──────────── next shot (x4) ◄───────────────┘
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Sequencing**: intermission and countdown on one cancellable timeline
//! 2. **Capture**: grab the latest frame from the stream
//! 3. **Post-Processing**: centered 4:3 crop and selfie mirror
//! 4. **Encoding**: JPEG at quality 90

pub mod capture;
pub mod encoding;
pub mod processing;
pub mod sequencer;

pub use capture::{CaptureSettings, PhotoCapture};
pub use encoding::{EncodingFormat, StillImage, encode_jpeg, encode_png};
pub use processing::{CropRect, crop_and_mirror, crop_image};
pub use sequencer::{
    CancelToken, CaptureSequencer, CompletionCallback, SequencerOptions, SequencerState,
    ShotPhase,
};
