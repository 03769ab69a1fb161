//! Heatmap synthesis
//!
//! Pure transformation of localized elements and their severities into a
//! density overlay on the screenshot. No external calls. Every path yields an
//! image: the overlay, a "no data" placeholder, or an error placeholder.
//! [`RenderError`] is returned only when no image at all can be written.

pub mod colormap;
pub mod density;
pub mod placeholder;
pub mod render;

use crate::error::RenderError;
use crate::models::localization::LocalizedElement;
use crate::models::screen_image::ScreenImage;
use ab_glyph::FontVec;
use image::RgbaImage;
use placeholder::{render_placeholder, PlaceholderKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use density::{accumulate, Contribution, DensityField};

/// How severity scales a Gaussian's amplitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityWeighting {
    Linear,
    Squared,
}

impl SeverityWeighting {
    pub fn weight(self, severity: u32) -> f64 {
        let s = f64::from(severity);
        match self {
            SeverityWeighting::Linear => s,
            SeverityWeighting::Squared => s * s,
        }
    }
}

/// Synthesis parameters (`[heatmap]` config section)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SynthesisParams {
    /// sigma = max(box width, box height) / sigma_divisor
    pub sigma_divisor: f64,
    /// Lower bound for sigma in pixels
    pub min_sigma_px: f64,
    pub weighting: SeverityWeighting,
    /// Severity for element ids missing from the assessment
    pub default_severity: u32,
    /// Percentile of nonzero values the field is clipped at before scaling
    pub clip_percentile: f64,
    /// Overlay opacity at full intensity
    pub overlay_alpha: f64,
    /// Largest W*H accepted for the density grid
    pub max_field_pixels: u64,
    /// Font for placeholder and scale bar labels
    pub font_path: Option<PathBuf>,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            sigma_divisor: 4.0,
            min_sigma_px: 3.0,
            weighting: SeverityWeighting::Squared,
            default_severity: 50,
            clip_percentile: 98.0,
            overlay_alpha: 0.7,
            max_field_pixels: 50_000_000,
            font_path: None,
        }
    }
}

impl SynthesisParams {
    pub fn load_font(&self) -> Option<FontVec> {
        self.font_path.as_deref().and_then(placeholder::load_font)
    }
}

/// What a synthesized image shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatmapKind {
    Overlay,
    NoData,
    ErrorPlaceholder,
}

/// Synthesized image with what it shows
#[derive(Debug, Clone)]
pub struct Heatmap {
    pub image: RgbaImage,
    pub kind: HeatmapKind,
    pub contributions: Vec<Contribution>,
    /// Explanation when a placeholder was produced
    pub note: Option<String>,
}

impl Heatmap {
    fn placeholder(width: u32, height: u32, kind: PlaceholderKind, note: String, font: Option<&FontVec>) -> Self {
        let image = render_placeholder(width, height, kind, &note, font);
        Self {
            image,
            kind: match kind {
                PlaceholderKind::NoData => HeatmapKind::NoData,
                PlaceholderKind::Error => HeatmapKind::ErrorPlaceholder,
            },
            contributions: Vec::new(),
            note: Some(note),
        }
    }
}

/// Synthesize the heatmap for `base`
///
/// 1. Denormalize boxes to pixels, drop degenerate ones
/// 2. Accumulate one severity-weighted Gaussian per element
/// 3. Clip at the configured percentile, min-max scale to [0, 1]
/// 4. Composite as a translucent colormap overlay with a scale bar
pub fn synthesize(
    base: &RgbaImage,
    elements: &[LocalizedElement],
    severities: &HashMap<String, u32>,
    params: &SynthesisParams,
    font: Option<&FontVec>,
) -> Heatmap {
    let (width, height) = base.dimensions();

    let pixels = u64::from(width) * u64::from(height);
    if pixels > params.max_field_pixels {
        let err = RenderError::TooLarge {
            width,
            height,
            limit: params.max_field_pixels,
        };
        return Heatmap::placeholder(width, height, PlaceholderKind::Error, err.to_string(), font);
    }

    let (field, contributions) = accumulate(width, height, elements, severities, params);

    let normalized = if contributions.is_empty() {
        None
    } else {
        field.normalized(params.clip_percentile)
    };

    let Some(normalized) = normalized else {
        return Heatmap::placeholder(
            width,
            height,
            PlaceholderKind::NoData,
            "No localized problem areas could be placed on this screenshot.".to_string(),
            font,
        );
    };

    tracing::debug!(
        contributions = contributions.len(),
        peak = field.peak(),
        "Density field accumulated"
    );

    let overlay = render::composite_overlay(base, &normalized, params.overlay_alpha);
    Heatmap {
        image: render::with_colorbar(&overlay, font),
        kind: HeatmapKind::Overlay,
        contributions,
        note: None,
    }
}

/// Synthesize the heatmap for a screenshot and write it as PNG to `out`
///
/// Decode or save failures fall back to an error placeholder; only a failure
/// to write any image is returned as an error.
pub fn render_heatmap_file(
    screen: &ScreenImage,
    elements: &[LocalizedElement],
    severities: &HashMap<String, u32>,
    params: &SynthesisParams,
    out: &Path,
) -> Result<Heatmap, RenderError> {
    let font = params.load_font();

    let heatmap = match screen.decode() {
        Ok(decoded) => synthesize(&decoded.to_rgba8(), elements, severities, params, font.as_ref()),
        Err(e) => {
            tracing::warn!(error = %e, "Screenshot could not be decoded for overlay");
            Heatmap::placeholder(
                screen.width,
                screen.height,
                PlaceholderKind::Error,
                format!("Screenshot could not be decoded: {e}"),
                font.as_ref(),
            )
        }
    };

    match heatmap.image.save(out) {
        Ok(()) => Ok(heatmap),
        Err(e) => {
            tracing::warn!(error = %e, path = %out.display(), "Heatmap save failed, writing error placeholder");
            let fallback = Heatmap::placeholder(
                screen.width,
                screen.height,
                PlaceholderKind::Error,
                format!("Heatmap could not be saved: {e}"),
                font.as_ref(),
            );
            fallback.image.save(out)?;
            Ok(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::localization::BoundingBox;

    fn element(id: &str, coords: [f64; 4]) -> LocalizedElement {
        LocalizedElement {
            id: id.into(),
            label: "e".into(),
            bounding_box: BoundingBox::new(coords[0], coords[1], coords[2], coords[3]),
            confidence: 1.0,
        }
    }

    #[test]
    fn test_weighting() {
        assert_eq!(SeverityWeighting::Linear.weight(90), 90.0);
        assert_eq!(SeverityWeighting::Squared.weight(90), 8100.0);
    }

    #[test]
    fn test_no_elements_gives_no_data_placeholder() {
        let base = RgbaImage::new(200, 100);
        let heatmap = synthesize(&base, &[], &HashMap::new(), &SynthesisParams::default(), None);
        assert_eq!(heatmap.kind, HeatmapKind::NoData);
        assert!(heatmap.image.width() > 0 && heatmap.image.height() > 0);
    }

    #[test]
    fn test_oversized_field_gives_error_placeholder() {
        let base = RgbaImage::new(100, 100);
        let params = SynthesisParams {
            max_field_pixels: 100,
            ..Default::default()
        };
        let heatmap = synthesize(&base, &[element("1", [0.0, 0.0, 500.0, 500.0])], &HashMap::new(), &params, None);
        assert_eq!(heatmap.kind, HeatmapKind::ErrorPlaceholder);
        assert!(heatmap.note.unwrap().contains("exceeds"));
    }

    #[test]
    fn test_overlay_adds_colorbar() {
        let base = RgbaImage::new(120, 90);
        let heatmap = synthesize(
            &base,
            &[element("1", [100.0, 100.0, 600.0, 600.0])],
            &HashMap::from([("1".to_string(), 80)]),
            &SynthesisParams::default(),
            None,
        );
        assert_eq!(heatmap.kind, HeatmapKind::Overlay);
        assert_eq!(heatmap.image.dimensions(), (120 + render::COLORBAR_MARGIN, 90));
        assert_eq!(heatmap.contributions.len(), 1);
    }
}
