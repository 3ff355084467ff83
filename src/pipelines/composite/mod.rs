// SPDX-License-Identifier: GPL-3.0-only

//! Composite pipeline
//!
//! Turns the still sequence into one styled PNG:
//!
//! ```text
//! Still Images ─► decode (parallel) ─► layout ─► filter ─► draw ─► PNG
//!                                        ▲          ▲        ▲
//!                                      layout     filter   theme
//! ```
//!
//! [`CompositeSession`] re-renders from scratch whenever the stills or the
//! selection change, and only the latest request is published.

pub mod filters;
pub mod layout;
pub mod renderer;
pub mod session;
pub mod text;
pub mod theme;

pub use filters::{FilterOp, FilterType, apply_filter};
pub use layout::LayoutType;
pub use renderer::{
    CompositeImage, CompositeSpec, RenderContext, compose, decode_all, render_canvas,
    render_composite,
};
pub use session::{CompositeSession, RenderOutput};
pub use text::monospace_family;
pub use theme::{Palette, Rgb, ThemeType};

/// Unknown layout, filter or theme name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseSpecError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

impl ParseSpecError {
    fn new<const N: usize>(kind: &'static str, value: &str, names: [&str; N]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: names.join(", "),
        }
    }
}
