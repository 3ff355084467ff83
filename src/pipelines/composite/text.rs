// SPDX-License-Identifier: GPL-3.0-only

//! Text overlays
//!
//! Text runs are collected into a canvas-sized SVG layer and rasterised onto
//! the composite with resvg. Fonts come from the system font database, loaded
//! once per process, with the generic `monospace` family bound to whichever
//! monospaced face is installed. Hosts with no monospaced face at all get no
//! glyphs, but the layer still parses and the rest of the composite is
//! unaffected.

use super::theme::Rgb;
use crate::errors::RenderError;
use resvg::tiny_skia::{Pixmap, Transform};
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Horizontal anchoring of a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
}

impl Anchor {
    fn svg(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
        }
    }
}

/// Font and fill of a text run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub family: &'static str,
    pub size: f32,
    pub bold: bool,
    pub anchor: Anchor,
    pub color: Rgb,
    pub opacity: f32,
}

impl TextStyle {
    pub fn new(family: &'static str, size: f32, color: Rgb) -> Self {
        Self {
            family,
            size,
            bold: false,
            anchor: Anchor::Middle,
            color,
            opacity: 1.0,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn anchored(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

/// A batch of text runs drawn together
pub struct TextLayer {
    width: u32,
    height: u32,
    runs: String,
    count: usize,
}

impl TextLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            runs: String::new(),
            count: 0,
        }
    }

    /// Queue `text` with its baseline at (`x`, `y`)
    pub fn push(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        let _ = write!(
            self.runs,
            r#"<text x="{x}" y="{y}" font-family="{family}" font-size="{size}" font-weight="{weight}" text-anchor="{anchor}" fill="{fill}" fill-opacity="{opacity}" xml:space="preserve">{text}</text>"#,
            family = escape_xml(style.family),
            size = style.size,
            weight = if style.bold { "bold" } else { "normal" },
            anchor = style.anchor.svg(),
            fill = style.color.css(),
            opacity = style.opacity,
            text = escape_xml(text),
        );
        self.count += 1;
    }

    /// SVG document for the queued runs
    pub fn to_svg(&self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{runs}</svg>"#,
            w = self.width,
            h = self.height,
            runs = self.runs,
        )
    }

    /// Rasterise the queued runs onto `pixmap`
    pub fn draw(&self, pixmap: &mut Pixmap) -> Result<(), RenderError> {
        if self.count == 0 {
            return Ok(());
        }
        let options = usvg::Options {
            fontdb: font_database(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&self.to_svg(), &options)
            .map_err(|e| RenderError::Text(e.to_string()))?;
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
        debug!(runs = self.count, "Text layer drawn");
        Ok(())
    }
}

/// Monospace families tried before any other monospaced face
const PREFERRED_MONOSPACE: [&str; 5] = [
    "Courier New",
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Noto Sans Mono",
    "Cousine",
];

/// System fonts, loaded on first use
///
/// The generic `monospace` family is pointed at an installed monospaced face.
/// fontdb defaults it to "Courier New" whether or not that is present.
fn font_database() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            match pick_monospace(&db) {
                Some(family) => {
                    debug!(faces = db.len(), monospace = %family, "Loaded system fonts");
                    db.set_monospace_family(family);
                }
                None => warn!(faces = db.len(), "No monospaced system font, text will be skipped"),
            }
            Arc::new(db)
        })
        .clone()
}

/// Family the generic `monospace` resolves to, if any monospaced face is installed
pub fn monospace_family() -> Option<String> {
    pick_monospace(&font_database())
}

fn pick_monospace(db: &usvg::fontdb::Database) -> Option<String> {
    let families = |face: &usvg::fontdb::FaceInfo| {
        face.families
            .iter()
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>()
    };

    PREFERRED_MONOSPACE
        .iter()
        .find_map(|wanted| {
            db.faces()
                .flat_map(families)
                .find(|name| name.eq_ignore_ascii_case(wanted))
        })
        .or_else(|| {
            db.faces()
                .filter(|face| face.monospaced)
                .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
        })
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape_xml("B&W <#01>"), "B&amp;W &lt;#01&gt;");
        assert_eq!(escape_xml("'Courier New'"), "&apos;Courier New&apos;");
    }

    #[test]
    fn test_layer_svg_parses() {
        let mut layer = TextLayer::new(200, 100);
        let style = TextStyle::new("'Courier New', monospace", 24.0, Rgb::WHITE)
            .bold()
            .anchored(Anchor::Start)
            .opacity(0.7);
        layer.push("(｡♥‿♥｡) & <friends>", 10.0, 50.0, &style);
        let svg = layer.to_svg();
        assert!(svg.contains(r#"text-anchor="start""#));
        assert!(svg.contains(r#"fill-opacity="0.7""#));
        assert!(usvg::Tree::from_str(&svg, &usvg::Options::default()).is_ok());
    }

    #[test]
    fn test_monospace_stack_draws_glyphs() {
        let Some(family) = monospace_family() else {
            eprintln!("no monospaced system font installed, skipping");
            return;
        };

        for stack in ["'Courier New', monospace", "monospace"] {
            let mut pixmap = Pixmap::new(300, 80).unwrap();
            let mut layer = TextLayer::new(300, 80);
            layer.push(
                "LIFE 4 CUTS",
                150.0,
                50.0,
                &TextStyle::new(stack, 36.0, Rgb::WHITE).bold(),
            );
            layer.draw(&mut pixmap).unwrap();

            let inked = pixmap.pixels().iter().filter(|p| p.alpha() > 0).count();
            assert!(inked > 100, "{stack} via {family} drew {inked} pixels");
        }
    }

    #[test]
    fn test_empty_layer_leaves_pixmap_alone() {
        let mut pixmap = Pixmap::new(4, 4).unwrap();
        pixmap.fill(resvg::tiny_skia::Color::from_rgba8(1, 2, 3, 255));
        let before = pixmap.data().to_vec();
        TextLayer::new(4, 4).draw(&mut pixmap).unwrap();
        assert_eq!(pixmap.data(), &before[..]);
    }
}
