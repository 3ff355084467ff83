// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines for the photo booth
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  Photo Pipeline   │ ──▶ │ Still Images │
//! │   (RGBA)     │     │  - Countdown      │     │  (JPEG x4)   │
//! │              │     │  - Crop 4:3       │     │              │
//! │              │     │  - Mirror         │     │              │
//! └──────────────┘     └───────────────────┘     └──────┬───────┘
//!                                                       │
//! ┌──────────────┐     ┌───────────────────┐            │
//! │  PNG Strip   │ ◀── │ Composite Pipeline│ ◀──────────┘
//! │              │     │  - Layout         │  ◀── layout / filter / theme
//! │              │     │  - Filters        │
//! │              │     │  - Text overlays  │
//! └──────────────┘     └───────────────────┘
//! ```
//!
//! Data flows one way. The composite pipeline is re-run whenever the stills
//! or the selection change.
//!
//! # Modules
//!
//! - [`photo`]: Timed multi-shot capture and still encoding
//! - [`composite`]: Strip/grid/film compositing and PNG export

pub mod composite;
pub mod photo;
