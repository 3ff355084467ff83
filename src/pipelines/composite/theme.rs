// SPDX-License-Identifier: GPL-3.0-only

//! Color themes

use super::ParseSpecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::from_hex(0xffffff);

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// `#rrggbb`, as used in SVG fills
    pub fn css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_skia(self, alpha: u8) -> resvg::tiny_skia::Color {
        resvg::tiny_skia::Color::from_rgba8(self.r, self.g, self.b, alpha)
    }
}

/// Colors a theme draws with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Canvas fill
    pub background: Rgb,
    /// Border, title, backing rectangles and timestamp
    pub primary: Rgb,
    /// Subtitle and caption
    pub accent: Rgb,
}

/// Composite color theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeType {
    #[default]
    Milk,
    Dark,
    Blue,
    Peach,
}

impl ThemeType {
    pub const ALL: [ThemeType; 4] = [
        ThemeType::Milk,
        ThemeType::Dark,
        ThemeType::Blue,
        ThemeType::Peach,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ThemeType::Milk => "milk",
            ThemeType::Dark => "dark",
            ThemeType::Blue => "blue",
            ThemeType::Peach => "peach",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            ThemeType::Milk => "MILK",
            ThemeType::Dark => "DARK",
            ThemeType::Blue => "SKY",
            ThemeType::Peach => "PEACH",
        }
    }

    pub fn palette(&self) -> Palette {
        let (background, primary, accent) = match self {
            ThemeType::Milk => (0xfff5fa, 0xff69b4, 0xff1493),
            ThemeType::Dark => (0x1a1a1a, 0xff69b4, 0xffffff),
            ThemeType::Blue => (0xe0f2fe, 0x0284c7, 0x0ea5e9),
            ThemeType::Peach => (0xfff7ed, 0xea580c, 0xf97316),
        };
        Palette {
            background: Rgb::from_hex(background),
            primary: Rgb::from_hex(primary),
            accent: Rgb::from_hex(accent),
        }
    }
}

impl fmt::Display for ThemeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThemeType {
    type Err = ParseSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseSpecError::new("theme", s, Self::ALL.map(|t| t.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palettes() {
        let milk = ThemeType::Milk.palette();
        assert_eq!(milk.background.css(), "#fff5fa");
        assert_eq!(milk.primary.css(), "#ff69b4");
        assert_eq!(milk.accent.css(), "#ff1493");

        let dark = ThemeType::Dark.palette();
        assert_eq!(dark.background, Rgb { r: 0x1a, g: 0x1a, b: 0x1a });
        assert_eq!(dark.accent, Rgb::WHITE);
    }

    #[test]
    fn test_blue_is_labelled_sky() {
        assert_eq!(ThemeType::Blue.label(), "SKY");
        assert_eq!("blue".parse::<ThemeType>().unwrap(), ThemeType::Blue);
        assert!("sky".parse::<ThemeType>().is_err());
    }
}
