// SPDX-License-Identifier: GPL-3.0-only

//! Composite rendering
//!
//! Draw order, each step painting over the previous ones:
//!
//! 1. Background fill (theme background)
//! 2. Dashed outer border (theme primary)
//! 3. Title and subtitle
//! 4. Per photo: translucent backing rectangle, filtered photo
//! 5. Shot labels `#01`..`#04`
//! 6. Footer timestamp and caption
//!
//! Rendering is a pure function of the decoded stills, the selection and the
//! footer stamp. Every call starts from an empty canvas.

use super::filters::{FilterType, apply_filter};
use super::layout::LayoutType;
use super::text::{Anchor, TextLayer, TextStyle};
use super::theme::{Rgb, ThemeType};
use crate::constants::TOTAL_SHOTS;
use crate::constants::composite::{
    BACKING_ALPHA, BACKING_OUTSET, BORDER_DASH, BORDER_INSET, BORDER_WIDTH, CAPTION, CELL_HEIGHT,
    CELL_WIDTH, FONT_FAMILY, PADDING, SUBTITLE, TITLE,
};
use crate::errors::{AppError, PhotoError, RenderError};
use crate::pipelines::photo::{StillImage, encode_png};
use futures::future::try_join_all;
use image::{RgbImage, RgbaImage, imageops};
use resvg::tiny_skia::{
    IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, StrokeDash, Transform,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Label font, a plain monospace rather than the Courier stack
const LABEL_FAMILY: &str = "monospace";

/// User-selected rendering parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeSpec {
    pub layout: LayoutType,
    pub filter: FilterType,
    pub theme: ThemeType,
}

/// Inputs that come from outside the spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    /// Footer timestamp text
    pub stamp: String,
}

impl RenderContext {
    pub fn new(stamp: impl Into<String>) -> Self {
        Self {
            stamp: stamp.into(),
        }
    }

    /// Stamp with the current local date and time
    pub fn now() -> Self {
        Self::new(
            chrono::Local::now()
                .format("%-m/%-d/%Y, %-I:%M:%S %p")
                .to_string(),
        )
    }
}

/// One rendered, PNG-encoded composite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeImage {
    pub width: u32,
    pub height: u32,
    pub spec: CompositeSpec,
    /// Encoded PNG bytes
    pub png: Arc<[u8]>,
}

/// Draw the composite canvas
///
/// `Err(RenderError::EmptySequence)` when there is nothing to draw; callers
/// treat that as "no output yet".
pub fn render_canvas(
    frames: &[RgbImage],
    spec: &CompositeSpec,
    ctx: &RenderContext,
) -> Result<RgbaImage, RenderError> {
    if frames.is_empty() {
        return Err(RenderError::EmptySequence);
    }
    if frames.len() > TOTAL_SHOTS {
        warn!(
            frames = frames.len(),
            max = TOTAL_SHOTS,
            "Extra stills ignored"
        );
    }
    let frames = &frames[..frames.len().min(TOTAL_SHOTS)];

    let palette = spec.theme.palette();
    let (width, height) = spec.layout.canvas_size();
    let (w, h) = (width as f32, height as f32);
    let pad = PADDING as f32;

    let mut canvas = Pixmap::new(width, height)
        .ok_or_else(|| RenderError::Canvas(format!("cannot allocate {}x{}", width, height)))?;

    // 1. Background
    canvas.fill(palette.background.to_skia(255));

    // 2. Border
    let border = Rect::from_xywh(
        BORDER_INSET,
        BORDER_INSET,
        w - 2.0 * BORDER_INSET,
        h - 2.0 * BORDER_INSET,
    )
    .ok_or_else(|| RenderError::Canvas("degenerate border".into()))?;
    let stroke = Stroke {
        width: BORDER_WIDTH,
        dash: StrokeDash::new(BORDER_DASH.to_vec(), 0.0),
        ..Stroke::default()
    };
    canvas.stroke_path(
        &PathBuilder::from_rect(border),
        &solid(palette.primary, 255),
        &stroke,
        Transform::identity(),
        None,
    );

    // 3. Header
    let mut header = TextLayer::new(width, height);
    header.push(
        TITLE,
        w / 2.0,
        pad + 50.0,
        &TextStyle::new(FONT_FAMILY, 36.0, palette.primary).bold(),
    );
    header.push(
        SUBTITLE,
        w / 2.0,
        pad + 85.0,
        &TextStyle::new(FONT_FAMILY, 24.0, palette.accent),
    );
    header.draw(&mut canvas)?;

    // 4. Photos
    let backing = solid(palette.primary, BACKING_ALPHA);
    let outset = BACKING_OUTSET as f32;
    let mut labels = TextLayer::new(width, height);
    let label_style = TextStyle::new(LABEL_FAMILY, 30.0, Rgb::WHITE)
        .bold()
        .anchored(Anchor::Start)
        .opacity(0.7);

    for (index, frame) in frames.iter().enumerate() {
        let (x, y) = spec.layout.cell_origin(index);
        let (xf, yf) = (x as f32, y as f32);

        if let Some(rect) = Rect::from_xywh(
            xf - outset,
            yf - outset,
            (CELL_WIDTH + 2 * BACKING_OUTSET) as f32,
            (CELL_HEIGHT + 2 * BACKING_OUTSET) as f32,
        ) {
            canvas.fill_rect(rect, &backing, Transform::identity(), None);
        }

        let cell = cell_pixmap(frame, spec.filter)?;
        canvas.draw_pixmap(
            x as i32,
            y as i32,
            cell.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        labels.push(
            &format!("#0{}", index + 1),
            xf + 20.0,
            yf + CELL_HEIGHT as f32 - 20.0,
            &label_style,
        );
    }

    // 5. Labels
    labels.draw(&mut canvas)?;

    // 6. Footer
    let mut footer = TextLayer::new(width, height);
    footer.push(
        &ctx.stamp,
        w / 2.0,
        h - pad - 35.0,
        &TextStyle::new(FONT_FAMILY, 16.0, palette.primary),
    );
    footer.push(
        CAPTION,
        w / 2.0,
        h - pad - 15.0,
        &TextStyle::new(FONT_FAMILY, 16.0, palette.accent),
    );
    footer.draw(&mut canvas)?;

    debug!(
        layout = %spec.layout,
        filter = %spec.filter,
        theme = %spec.theme,
        width,
        height,
        photos = frames.len(),
        "Composite canvas drawn"
    );

    Ok(pixmap_to_image(&canvas))
}

/// Draw and PNG-encode the composite
pub fn render_composite(
    frames: &[RgbImage],
    spec: &CompositeSpec,
    ctx: &RenderContext,
) -> Result<CompositeImage, RenderError> {
    let canvas = render_canvas(frames, spec, ctx)?;
    let png = encode_png(&canvas)?;
    info!(
        width = canvas.width(),
        height = canvas.height(),
        bytes = png.len(),
        "Composite rendered"
    );
    Ok(CompositeImage {
        width: canvas.width(),
        height: canvas.height(),
        spec: *spec,
        png: Arc::from(png),
    })
}

/// Decode every still in parallel
///
/// All-or-nothing: the first failure fails the whole set.
pub async fn decode_all(stills: &[StillImage]) -> Result<Vec<RgbImage>, PhotoError> {
    let tasks = stills.iter().cloned().map(|still| async move {
        match tokio::task::spawn_blocking(move || still.decode()).await {
            Ok(decoded) => decoded,
            Err(e) => Err(PhotoError::DecodeFailed(format!("decode task failed: {}", e))),
        }
    });
    try_join_all(tasks).await
}

/// Decode and render; `Ok(None)` while there are no stills
pub async fn compose(
    stills: &[StillImage],
    spec: CompositeSpec,
    ctx: RenderContext,
) -> Result<Option<CompositeImage>, AppError> {
    if stills.is_empty() {
        return Ok(None);
    }
    let frames = decode_all(stills).await?;
    let image = tokio::task::spawn_blocking(move || render_composite(&frames, &spec, &ctx))
        .await
        .map_err(|e| RenderError::Canvas(format!("render task failed: {}", e)))??;
    Ok(Some(image))
}

fn solid(color: Rgb, alpha: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia(alpha));
    paint.anti_alias = true;
    paint
}

/// Scale a still to the cell size and filter it
fn cell_pixmap(frame: &RgbImage, filter: FilterType) -> Result<Pixmap, RenderError> {
    let mut cell = if frame.dimensions() == (CELL_WIDTH, CELL_HEIGHT) {
        frame.clone()
    } else {
        imageops::resize(frame, CELL_WIDTH, CELL_HEIGHT, imageops::FilterType::Triangle)
    };
    apply_filter(&mut cell, filter);

    let mut data = Vec::with_capacity((CELL_WIDTH * CELL_HEIGHT * 4) as usize);
    for p in cell.pixels() {
        data.extend_from_slice(&[p[0], p[1], p[2], 255]);
    }
    let size = IntSize::from_wh(CELL_WIDTH, CELL_HEIGHT)
        .ok_or_else(|| RenderError::Canvas("invalid cell size".into()))?;
    Pixmap::from_vec(data, size).ok_or_else(|| RenderError::Canvas("cell pixmap".into()))
}

/// Premultiplied pixmap to straight-alpha image
fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for p in pixmap.pixels() {
        let c = p.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb as Px;

    fn frames(n: usize) -> Vec<RgbImage> {
        (0..n)
            .map(|i| {
                RgbImage::from_fn(CELL_WIDTH, CELL_HEIGHT, |x, y| {
                    Px([(x % 256) as u8, (y % 256) as u8, (i * 60) as u8])
                })
            })
            .collect()
    }

    fn ctx() -> RenderContext {
        RenderContext::new("10/14/2026, 3:04:05 PM")
    }

    #[test]
    fn test_empty_sequence_draws_nothing() {
        assert_eq!(
            render_canvas(&[], &CompositeSpec::default(), &ctx()),
            Err(RenderError::EmptySequence)
        );
    }

    #[test]
    fn test_strip_canvas_size() {
        let image = render_composite(&frames(4), &CompositeSpec::default(), &ctx()).unwrap();
        assert_eq!((image.width, image.height), (480, 1560));
        assert_eq!(&image.png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let spec = CompositeSpec {
            layout: LayoutType::Grid,
            filter: FilterType::Vintage,
            theme: ThemeType::Peach,
        };
        let a = render_composite(&frames(4), &spec, &ctx()).unwrap();
        let b = render_composite(&frames(4), &spec, &ctx()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_photos_land_in_their_cells() {
        let input = frames(4);
        for layout in LayoutType::ALL {
            let spec = CompositeSpec {
                layout,
                ..CompositeSpec::default()
            };
            let canvas = render_canvas(&input, &spec, &ctx()).unwrap();
            assert_eq!(canvas.dimensions(), layout.canvas_size());
            for (i, (x, y)) in layout.cell_origins().into_iter().enumerate() {
                // Top-right corner of the cell is clear of the label
                let px = canvas.get_pixel(x + 390, y + 10);
                let src = input[i].get_pixel(390, 10);
                assert_eq!(px.0, [src[0], src[1], src[2], 255], "{layout} shot {i}");
            }
        }
    }

    #[test]
    fn test_normal_filter_is_pixel_identical() {
        let input = frames(4);
        let canvas = render_canvas(&input, &CompositeSpec::default(), &ctx()).unwrap();
        let (x, y) = LayoutType::Strip.cell_origin(2);
        for dy in [0, 50, 120] {
            for dx in [0, 199, 399] {
                let src = input[2].get_pixel(dx, dy);
                assert_eq!(
                    canvas.get_pixel(x + dx, y + dy).0,
                    [src[0], src[1], src[2], 255]
                );
            }
        }
    }

    #[test]
    fn test_filter_changes_photo_pixels_only() {
        let input = frames(4);
        let normal = render_canvas(&input, &CompositeSpec::default(), &ctx()).unwrap();
        let bw = render_canvas(
            &input,
            &CompositeSpec {
                filter: FilterType::Bw,
                ..CompositeSpec::default()
            },
            &ctx(),
        )
        .unwrap();
        let (x, y) = LayoutType::Strip.cell_origin(1);
        assert_ne!(normal.get_pixel(x + 300, y + 10), bw.get_pixel(x + 300, y + 10));
        // Background outside any cell is unchanged
        assert_eq!(normal.get_pixel(25, 700), bw.get_pixel(25, 700));
    }

    #[test]
    fn test_background_and_backing_colors() {
        let canvas = render_canvas(&frames(4), &CompositeSpec::default(), &ctx()).unwrap();
        // Between the border and the first cell's backing
        assert_eq!(canvas.get_pixel(25, 700).0, [0xff, 0xf5, 0xfa, 255]);

        // Backing strip just left of a cell: primary at 0x40 over background
        let (x, y) = LayoutType::Strip.cell_origin(0);
        let px = canvas.get_pixel(x - 3, y + 150);
        let blend = |bg: u8, fg: u8| {
            let a = BACKING_ALPHA as f32 / 255.0;
            (fg as f32 * a + bg as f32 * (1.0 - a)).round() as i32
        };
        let expected = [blend(0xff, 0xff), blend(0xf5, 0x69), blend(0xfa, 0xb4)];
        for c in 0..3 {
            assert!(
                (px[c] as i32 - expected[c]).abs() <= 2,
                "channel {c}: {} vs {}",
                px[c],
                expected[c]
            );
        }
    }

    #[test]
    fn test_border_is_dashed() {
        let canvas = render_canvas(&frames(4), &CompositeSpec::default(), &ctx()).unwrap();
        let primary = [0xff, 0x69, 0xb4, 255];
        let background = [0xff, 0xf5, 0xfa, 255];
        // The path starts at the top-left corner; along the top edge the
        // stroke is on for x in 10..20 and off for 20..30
        let on = canvas.get_pixel(15, 10).0;
        let off = canvas.get_pixel(25, 10).0;
        assert_eq!(on, primary);
        assert_eq!(off, background);
    }

    #[test]
    fn test_text_reaches_canvas() {
        if super::super::text::monospace_family().is_none() {
            eprintln!("no monospaced system font installed, skipping");
            return;
        }
        let flat = Px([10, 10, 10]);
        let input = vec![RgbImage::from_pixel(CELL_WIDTH, CELL_HEIGHT, flat); 4];
        let canvas = render_canvas(&input, &CompositeSpec::default(), &ctx()).unwrap();
        let background = [0xff, 0xf5, 0xfa, 255];

        let count_unlike = |xs: std::ops::Range<u32>, ys: std::ops::Range<u32>, like: [u8; 4]| {
            ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
                .filter(|&(x, y)| canvas.get_pixel(x, y).0 != like)
                .count()
        };

        let title = count_unlike(100..380, 60..100, background);
        assert!(title > 200, "title band has {title} inked pixels");

        let footer = count_unlike(100..380, 1468..1512, background);
        assert!(footer > 100, "footer band has {footer} inked pixels");

        let (x, y) = LayoutType::Strip.cell_origin(0);
        let label = count_unlike(x + 15..x + 100, y + 245..y + 285, [10, 10, 10, 255]);
        assert!(label > 100, "#01 label box has {label} inked pixels");
    }

    #[test]
    fn test_short_sequence_renders_present_shots() {
        let canvas = render_canvas(&frames(2), &CompositeSpec::default(), &ctx()).unwrap();
        assert_eq!(canvas.dimensions(), (480, 1560));
        let (x, y) = LayoutType::Strip.cell_origin(3);
        assert_eq!(canvas.get_pixel(x + 200, y + 150).0, [0xff, 0xf5, 0xfa, 255]);
    }

    #[test]
    fn test_large_stills_are_scaled_to_cell() {
        let big = vec![RgbImage::from_pixel(960, 720, Px([10, 20, 30]))];
        let canvas = render_canvas(&big, &CompositeSpec::default(), &ctx()).unwrap();
        let (x, y) = LayoutType::Strip.cell_origin(0);
        assert_eq!(canvas.get_pixel(x + 390, y + 10).0, [10, 20, 30, 255]);
    }

    #[tokio::test]
    async fn test_compose_decodes_stills() {
        let stills: Vec<_> = frames(4)
            .iter()
            .enumerate()
            .map(|(i, f)| StillImage::encode(i, f, 90).unwrap())
            .collect();
        assert_eq!(
            compose(&[], CompositeSpec::default(), ctx()).await.unwrap(),
            None
        );
        let image = compose(&stills, CompositeSpec::default(), ctx())
            .await
            .unwrap()
            .unwrap();
        assert_eq!((image.width, image.height), (480, 1560));
    }

    #[tokio::test]
    async fn test_compose_is_all_or_nothing() {
        let good = StillImage::encode(0, &frames(1)[0], 90).unwrap();
        let bad = StillImage {
            index: 1,
            jpeg: Arc::from(vec![0u8; 16]),
            width: CELL_WIDTH,
            height: CELL_HEIGHT,
        };
        let err = compose(&[good, bad], CompositeSpec::default(), ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Photo(PhotoError::DecodeFailed(_))));
    }
}
