//! Overlay compositing and color scale bar

use crate::heatmap::colormap::viridis;
use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

/// Width of the color scale bar
pub const COLORBAR_WIDTH: u32 = 18;
/// Gap around the color scale bar
pub const COLORBAR_GAP: u32 = 14;
/// Extra canvas width taken by the scale bar and its labels
pub const COLORBAR_MARGIN: u32 = COLORBAR_WIDTH + 2 * COLORBAR_GAP + 40;

/// Blend the colormapped field over the screenshot
///
/// Per-pixel opacity is `alpha * v`, so cold regions leave the screenshot readable.
/// `normalized` must hold `width * height` values in [0, 1].
pub fn composite_overlay(base: &RgbaImage, normalized: &[f64], alpha: f64) -> RgbaImage {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut out = base.clone();

    for (pixel, v) in out.pixels_mut().zip(normalized) {
        let a = alpha * v.clamp(0.0, 1.0);
        let color = viridis(*v);
        for channel in 0..3 {
            let under = f64::from(pixel.0[channel]);
            let over = f64::from(color[channel]);
            pixel.0[channel] = (under * (1.0 - a) + over * a).round() as u8;
        }
        pixel.0[3] = 255;
    }

    out
}

/// Extend the canvas to the right and draw a vertical scale bar (high at top)
pub fn with_colorbar(overlay: &RgbaImage, font: Option<&FontVec>) -> RgbaImage {
    let (w, h) = overlay.dimensions();
    let mut canvas = RgbaImage::from_pixel(w + COLORBAR_MARGIN, h, Rgba([255, 255, 255, 255]));
    image::imageops::replace(&mut canvas, overlay, 0, 0);

    let bar_x = w + COLORBAR_GAP;
    let bar_top = h.min(COLORBAR_GAP);
    let bar_height = h.saturating_sub(2 * bar_top).max(1);

    for dy in 0..bar_height {
        let t = if bar_height > 1 {
            1.0 - f64::from(dy) / f64::from(bar_height - 1)
        } else {
            1.0
        };
        let [r, g, b] = viridis(t);
        for dx in 0..COLORBAR_WIDTH {
            let y = bar_top + dy;
            if y < h {
                canvas.put_pixel(bar_x + dx, y, Rgba([r, g, b, 255]));
            }
        }
    }

    if bar_height > 2 {
        let frame = Rect::at(bar_x as i32, bar_top as i32).of_size(COLORBAR_WIDTH, bar_height);
        draw_hollow_rect_mut(&mut canvas, frame, Rgba([60, 60, 60, 255]));
    }

    if let Some(font) = font {
        let label_x = (bar_x + COLORBAR_WIDTH + 4) as i32;
        let scale = PxScale::from(13.0);
        let ink = Rgba([40, 40, 40, 255]);
        draw_text_mut(&mut canvas, ink, label_x, bar_top as i32, scale, font, "high");
        let low_y = (bar_top + bar_height).saturating_sub(14) as i32;
        draw_text_mut(&mut canvas, ink, label_x, low_y, scale, font, "low");
    }

    canvas
}
