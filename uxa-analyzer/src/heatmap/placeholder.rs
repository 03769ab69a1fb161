//! Placeholder images
//!
//! Stand-ins for the heatmap when there is nothing to draw or drawing failed.
//! Always produce a non-empty image: a banded card with a cross, plus the
//! title and message when a font is configured.

use crate::error::RenderError;
use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;
use serde::Serialize;
use std::path::Path;

const MIN_WIDTH: u32 = 320;
const MIN_HEIGHT: u32 = 200;
const MAX_SIDE: u32 = 2048;
const BANNER_HEIGHT: u32 = 36;

/// Why a placeholder is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    /// No usable localized elements
    NoData,
    /// Rendering failed
    Error,
}

impl PlaceholderKind {
    pub fn title(self) -> &'static str {
        match self {
            PlaceholderKind::NoData => "No localization data",
            PlaceholderKind::Error => "Heatmap unavailable",
        }
    }

    fn accent(self) -> Rgba<u8> {
        match self {
            PlaceholderKind::NoData => Rgba([96, 125, 139, 255]),
            PlaceholderKind::Error => Rgba([198, 40, 40, 255]),
        }
    }
}

/// Load a TrueType/OpenType font; None (with a warning) on failure
pub fn load_font(path: &Path) -> Option<FontVec> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Font not readable, drawing without text");
            return None;
        }
    };
    match FontVec::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Invalid font file, drawing without text");
            None
        }
    }
}

/// Draw a placeholder roughly the size of the screenshot
pub fn render_placeholder(
    width: u32,
    height: u32,
    kind: PlaceholderKind,
    message: &str,
    font: Option<&FontVec>,
) -> RgbaImage {
    let width = width.clamp(MIN_WIDTH, MAX_SIDE);
    let height = height.clamp(MIN_HEIGHT, MAX_SIDE);
    let accent = kind.accent();

    let mut img = RgbaImage::from_pixel(width, height, Rgba([238, 238, 238, 255]));

    draw_filled_rect_mut(&mut img, Rect::at(0, 0).of_size(width, BANNER_HEIGHT), accent);

    let muted = Rgba([200, 200, 200, 255]);
    let (w, h) = (width as f32 - 1.0, height as f32 - 1.0);
    let top = BANNER_HEIGHT as f32;
    draw_line_segment_mut(&mut img, (0.0, top), (w, h), muted);
    draw_line_segment_mut(&mut img, (w, top), (0.0, h), muted);

    for t in 0..3u32 {
        let rect = Rect::at(t as i32, t as i32).of_size(width - 2 * t, height - 2 * t);
        draw_hollow_rect_mut(&mut img, rect, accent);
    }

    if let Some(font) = font {
        draw_text_mut(
            &mut img,
            Rgba([255, 255, 255, 255]),
            12,
            8,
            PxScale::from(20.0),
            font,
            kind.title(),
        );

        let scale = 16.0f32;
        let max_chars = ((width as f32 - 24.0) / (scale * 0.55)).max(8.0) as usize;
        let mut y = BANNER_HEIGHT as i32 + 16;
        for line in wrap(message, max_chars) {
            if y as u32 + scale as u32 >= height {
                break;
            }
            draw_text_mut(&mut img, Rgba([33, 33, 33, 255]), 12, y, PxScale::from(scale), font, &line);
            y += scale as i32 + 6;
        }
    }

    img
}

/// Render and save a placeholder PNG
pub fn write_placeholder(
    path: &Path,
    width: u32,
    height: u32,
    kind: PlaceholderKind,
    message: &str,
    font: Option<&FontVec>,
) -> Result<(), RenderError> {
    render_placeholder(width, height, kind, message, font).save(path)?;
    Ok(())
}

/// Greedy word wrap
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_non_empty_and_not_uniform() {
        let img = render_placeholder(10, 10, PlaceholderKind::NoData, "nothing", None);
        assert_eq!(img.dimensions(), (MIN_WIDTH, MIN_HEIGHT));
        let first = *img.get_pixel(0, 0);
        assert!(img.pixels().any(|p| *p != first));
    }

    #[test]
    fn test_kinds_are_distinguishable() {
        let a = render_placeholder(400, 300, PlaceholderKind::NoData, "", None);
        let b = render_placeholder(400, 300, PlaceholderKind::Error, "", None);
        assert_ne!(a.get_pixel(200, 10), b.get_pixel(200, 10));
    }

    #[test]
    fn test_large_sizes_are_capped() {
        let img = render_placeholder(10_000, 300, PlaceholderKind::Error, "", None);
        assert_eq!(img.width(), MAX_SIDE);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert!(wrap("   ", 5).is_empty());
    }

    #[test]
    fn test_missing_font_is_none() {
        assert!(load_font(Path::new("/definitely/not/a/font.ttf")).is_none());
    }

    #[test]
    fn test_write_placeholder() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("p.png");
        write_placeholder(&path, 500, 400, PlaceholderKind::NoData, "No elements", None).unwrap();
        let loaded = image::open(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (500, 400));
    }
}
