// SPDX-License-Identifier: GPL-3.0-only

//! Photo filters
//!
//! Each filter is a fixed chain of color operations with CSS filter-function
//! semantics (grayscale, sepia, saturate, brightness, contrast), applied left
//! to right with the result clamped after every step.

use super::ParseSpecError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Filter applied to every photo on the composite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// No processing (displays as "NORM")
    #[default]
    Normal,
    /// Grayscale with a contrast boost
    Bw,
    /// Brown tint, slightly flattened
    Sepia,
    /// Light sepia, punchy contrast and color
    Vintage,
    /// Brighter, softer and less saturated
    Dreamy,
}

/// One color operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    Grayscale(f32),
    Sepia(f32),
    Saturate(f32),
    Brightness(f32),
    Contrast(f32),
}

impl FilterType {
    pub const ALL: [FilterType; 5] = [
        FilterType::Normal,
        FilterType::Bw,
        FilterType::Sepia,
        FilterType::Vintage,
        FilterType::Dreamy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterType::Normal => "normal",
            FilterType::Bw => "bw",
            FilterType::Sepia => "sepia",
            FilterType::Vintage => "vintage",
            FilterType::Dreamy => "dreamy",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            FilterType::Normal => "NORM",
            FilterType::Bw => "B&W",
            FilterType::Sepia => "SEPIA",
            FilterType::Vintage => "RETRO",
            FilterType::Dreamy => "SOFT",
        }
    }

    /// Operation chain, in application order
    pub fn ops(&self) -> &'static [FilterOp] {
        use FilterOp::*;
        match self {
            FilterType::Normal => &[],
            FilterType::Bw => &[Grayscale(1.0), Contrast(1.2)],
            FilterType::Sepia => &[Sepia(0.8), Contrast(0.9)],
            FilterType::Vintage => &[Sepia(0.4), Contrast(1.2), Brightness(0.9), Saturate(1.5)],
            FilterType::Dreamy => &[Brightness(1.1), Contrast(0.9), Saturate(0.8)],
        }
    }
}

impl FilterOp {
    /// 3x3 color matrix for the matrix-style operations
    fn matrix(&self) -> Option<[[f32; 3]; 3]> {
        match *self {
            FilterOp::Grayscale(amount) => {
                let a = 1.0 - amount.clamp(0.0, 1.0);
                Some([
                    [0.2126 + 0.7874 * a, 0.7152 - 0.7152 * a, 0.0722 - 0.0722 * a],
                    [0.2126 - 0.2126 * a, 0.7152 + 0.2848 * a, 0.0722 - 0.0722 * a],
                    [0.2126 - 0.2126 * a, 0.7152 - 0.7152 * a, 0.0722 + 0.9278 * a],
                ])
            }
            FilterOp::Sepia(amount) => {
                let a = 1.0 - amount.clamp(0.0, 1.0);
                Some([
                    [0.393 + 0.607 * a, 0.769 - 0.769 * a, 0.189 - 0.189 * a],
                    [0.349 - 0.349 * a, 0.686 + 0.314 * a, 0.168 - 0.168 * a],
                    [0.272 - 0.272 * a, 0.534 - 0.534 * a, 0.131 + 0.869 * a],
                ])
            }
            FilterOp::Saturate(s) => Some([
                [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
            ]),
            FilterOp::Brightness(_) | FilterOp::Contrast(_) => None,
        }
    }
}

/// Apply one operation to normalised RGB values in-place
#[inline]
fn apply_op_rgb(r: &mut f32, g: &mut f32, b: &mut f32, op: &FilterOp) {
    match op {
        FilterOp::Brightness(k) => {
            *r = (*r * k).clamp(0.0, 1.0);
            *g = (*g * k).clamp(0.0, 1.0);
            *b = (*b * k).clamp(0.0, 1.0);
        }

        FilterOp::Contrast(k) => {
            *r = ((*r - 0.5) * k + 0.5).clamp(0.0, 1.0);
            *g = ((*g - 0.5) * k + 0.5).clamp(0.0, 1.0);
            *b = ((*b - 0.5) * k + 0.5).clamp(0.0, 1.0);
        }

        matrix_op => {
            let Some(m) = matrix_op.matrix() else {
                return;
            };
            let (ri, gi, bi) = (*r, *g, *b);
            *r = (m[0][0] * ri + m[0][1] * gi + m[0][2] * bi).clamp(0.0, 1.0);
            *g = (m[1][0] * ri + m[1][1] * gi + m[1][2] * bi).clamp(0.0, 1.0);
            *b = (m[2][0] * ri + m[2][1] * gi + m[2][2] * bi).clamp(0.0, 1.0);
        }
    }
}

/// Apply a filter to an image in-place
///
/// `Normal` leaves the pixels untouched.
pub fn apply_filter(image: &mut RgbImage, filter: FilterType) {
    let ops = filter.ops();
    if ops.is_empty() {
        return;
    }

    for pixel in image.pixels_mut() {
        let mut r = pixel[0] as f32 / 255.0;
        let mut g = pixel[1] as f32 / 255.0;
        let mut b = pixel[2] as f32 / 255.0;

        for op in ops {
            apply_op_rgb(&mut r, &mut g, &mut b, op);
        }

        pixel[0] = (r * 255.0).round() as u8;
        pixel[1] = (g * 255.0).round() as u8;
        pixel[2] = (b * 255.0).round() as u8;
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterType {
    type Err = ParseSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseSpecError::new("filter", s, Self::ALL.map(|f| f.name())))
    }
}
