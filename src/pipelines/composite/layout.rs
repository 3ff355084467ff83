// SPDX-License-Identifier: GPL-3.0-only

//! Canvas geometry for each layout
//!
//! All layouts share the same cell size (400x300), padding, header and
//! footer bands. They differ only in how cells are arranged.

use super::ParseSpecError;
use crate::constants::TOTAL_SHOTS;
use crate::constants::composite::{
    CELL_HEIGHT, CELL_WIDTH, FOOTER_HEIGHT, GAP, HEADER_HEIGHT, PADDING,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Photo arrangement on the composite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    /// Vertical stack, one column
    #[default]
    Strip,
    /// Two columns by two rows
    Grid,
    /// Horizontal strip, one row
    Film,
}

impl LayoutType {
    pub const ALL: [LayoutType; 3] = [LayoutType::Strip, LayoutType::Grid, LayoutType::Film];

    pub fn name(&self) -> &'static str {
        match self {
            LayoutType::Strip => "strip",
            LayoutType::Grid => "grid",
            LayoutType::Film => "film",
        }
    }

    /// Canvas size in pixels for a full set of shots
    pub fn canvas_size(&self) -> (u32, u32) {
        let bands = 2 * PADDING + HEADER_HEIGHT + FOOTER_HEIGHT;
        match self {
            LayoutType::Strip => (
                2 * PADDING + CELL_WIDTH,
                bands + 4 * CELL_HEIGHT + 3 * GAP,
            ),
            LayoutType::Grid => (3 * PADDING + 2 * CELL_WIDTH, bands + 2 * CELL_HEIGHT + GAP),
            LayoutType::Film => (2 * PADDING + 4 * CELL_WIDTH + 3 * GAP, bands + CELL_HEIGHT),
        }
    }

    /// (column, row) of the cell holding shot `index`
    pub fn grid_position(&self, index: usize) -> (usize, usize) {
        match self {
            LayoutType::Strip => (0, index),
            LayoutType::Grid => (index % 2, index / 2),
            LayoutType::Film => (index, 0),
        }
    }

    /// Top-left pixel of the cell holding shot `index`
    ///
    /// Grid columns are separated by a full padding rather than the gap.
    pub fn cell_origin(&self, index: usize) -> (u32, u32) {
        let (col, row) = self.grid_position(index);
        let (col, row) = (col as u32, row as u32);
        let start_y = PADDING + HEADER_HEIGHT;
        match self {
            LayoutType::Strip => (PADDING, start_y + row * (CELL_HEIGHT + GAP)),
            LayoutType::Grid => (
                PADDING + col * (CELL_WIDTH + PADDING),
                start_y + row * (CELL_HEIGHT + GAP),
            ),
            LayoutType::Film => (PADDING + col * (CELL_WIDTH + GAP), start_y),
        }
    }

    /// Cell origins for every shot slot, in order
    pub fn cell_origins(&self) -> [(u32, u32); TOTAL_SHOTS] {
        std::array::from_fn(|i| self.cell_origin(i))
    }
}

impl fmt::Display for LayoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutType {
    type Err = ParseSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseSpecError::new("layout", s, Self::ALL.map(|l| l.name())))
    }
}
