// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Number of snapshots in one booth session
pub const TOTAL_SHOTS: usize = 4;

/// Still image aspect ratio (width / height)
pub const TARGET_ASPECT: f64 = 4.0 / 3.0;

/// Capture sequencing defaults
///
/// These are the defaults for [`crate::config::SequenceTiming`]; the sequencer
/// reads the configured values, not these constants directly.
pub mod timing {
    use super::Duration;

    /// First countdown value shown before each shot (3, 2, 1)
    pub const COUNTDOWN_FROM: u8 = 3;

    /// How long each countdown value is held
    pub const COUNTDOWN_TICK: Duration = Duration::from_millis(1000);

    /// Pause between shots ("NEXT SHOT...")
    pub const INTERMISSION: Duration = Duration::from_millis(2000);

    /// Flash indicator duration after each capture
    pub const FLASH: Duration = Duration::from_millis(200);

    /// Total pause after each capture, flash included
    pub const POST_CAPTURE: Duration = Duration::from_millis(500);

    /// Hold after the last shot before handing the stills over ("PROCESSING...")
    pub const PROCESSING: Duration = Duration::from_millis(1000);
}

/// Camera acquisition defaults
pub mod camera {
    /// Ideal stream width requested from the device
    pub const IDEAL_WIDTH: u32 = 1280;

    /// Ideal stream height requested from the device
    pub const IDEAL_HEIGHT: u32 = 720;

    /// Still image JPEG quality (0-100)
    pub const STILL_JPEG_QUALITY: u8 = 90;

    /// Number of attempts per slot under the default retry policy
    pub const DEFAULT_CAPTURE_ATTEMPTS: u32 = 3;
}

/// Composite canvas geometry (pixels)
pub mod composite {
    /// Width of one photo cell
    pub const CELL_WIDTH: u32 = 400;

    /// Height of one photo cell (4:3)
    pub const CELL_HEIGHT: u32 = 300;

    /// Outer padding, also the column spacing in the grid layout
    pub const PADDING: u32 = 40;

    /// Spacing between neighbouring cells
    pub const GAP: u32 = 20;

    /// Header band height (title + subtitle)
    pub const HEADER_HEIGHT: u32 = 120;

    /// Footer band height (timestamp + caption)
    pub const FOOTER_HEIGHT: u32 = 80;

    /// Outer dashed border inset from the canvas edge
    pub const BORDER_INSET: f32 = 10.0;

    /// Outer dashed border stroke width
    pub const BORDER_WIDTH: f32 = 4.0;

    /// Outer dashed border dash pattern (on, off)
    pub const BORDER_DASH: [f32; 2] = [10.0, 10.0];

    /// Extra size of the backing rectangle on each side of a cell
    pub const BACKING_OUTSET: u32 = 5;

    /// Alpha of the backing rectangle (theme primary color at 0x40)
    pub const BACKING_ALPHA: u8 = 0x40;

    /// Title text
    pub const TITLE: &str = "LIFE 4 CUTS";

    /// Decorative line under the title
    pub const SUBTITLE: &str = "(｡♥‿♥｡)";

    /// Fixed caption under the footer timestamp
    pub const CAPTION: &str = "Made with ASCII Booth";

    /// Font family stack used for every text draw
    pub const FONT_FAMILY: &str = "'Courier New', monospace";

    /// File name prefix of downloaded composites
    pub const DOWNLOAD_PREFIX: &str = "ascii-4-cuts";
}

/// File format helpers
pub mod file_formats {
    /// Supported image file extensions for file-backed camera sources
    pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

    /// Check if an extension (lowercase, without dot) is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext)
    }
}
