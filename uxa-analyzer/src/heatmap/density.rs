//! Severity-weighted Gaussian density field
//!
//! One Gaussian per localized element, centered on its pixel box, with
//! sigma proportional to the box size. Values are summed over the full grid,
//! then robust-normalized for display.

use crate::heatmap::SynthesisParams;
use crate::models::localization::{LocalizedElement, PixelBox};
use std::collections::HashMap;

/// Values at or below `peak * NONZERO_RELATIVE_EPS` count as zero
pub const NONZERO_RELATIVE_EPS: f64 = 1e-12;

/// W x H grid of accumulated density, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct DensityField {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

/// One element's contribution to the field
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub id: String,
    pub pixel_box: PixelBox,
    pub center: (f64, f64),
    pub sigma: f64,
    pub weight: f64,
}

impl DensityField {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Add `weight * exp(-((x-cx)^2 + (y-cy)^2) / (2 sigma^2))` at every pixel
    ///
    /// The 2-D kernel factors into a row and a column term.
    pub fn add_gaussian(&mut self, cx: f64, cy: f64, sigma: f64, weight: f64) {
        if self.values.is_empty() || !(sigma > 0.0) || !(weight > 0.0) {
            return;
        }
        let two_sigma_sq = 2.0 * sigma * sigma;
        let axis = |len: u32, c: f64| -> Vec<f64> {
            (0..len)
                .map(|i| {
                    let d = f64::from(i) - c;
                    (-(d * d) / two_sigma_sq).exp()
                })
                .collect()
        };
        let gx = axis(self.width, cx);
        let gy = axis(self.height, cy);

        for (row, wy) in self.values.chunks_exact_mut(self.width as usize).zip(&gy) {
            let row_weight = weight * wy;
            if row_weight == 0.0 {
                continue;
            }
            for (v, g) in row.iter_mut().zip(&gx) {
                *v += row_weight * g;
            }
        }
    }

    /// Largest value (0.0 for an empty grid)
    pub fn peak(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Pixel holding the largest value
    pub fn argmax(&self) -> Option<(u32, u32)> {
        let (index, value) = self
            .values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        if *value <= 0.0 {
            return None;
        }
        let w = self.width as usize;
        Some(((index % w) as u32, (index / w) as u32))
    }

    /// Robust-normalize to [0, 1]
    ///
    /// Values are clipped at `clip_percentile` of the nonzero values, then
    /// min-max scaled. Returns None for an all-zero field.
    pub fn normalized(&self, clip_percentile: f64) -> Option<Vec<f64>> {
        let peak = self.peak();
        if !(peak > 0.0) || !peak.is_finite() {
            return None;
        }
        let threshold = peak * NONZERO_RELATIVE_EPS;

        let mut nonzero: Vec<f64> = self.values.iter().copied().filter(|v| *v > threshold).collect();
        nonzero.sort_by(f64::total_cmp);
        let upper = percentile(&nonzero, clip_percentile)?;

        let lower = self
            .values
            .iter()
            .map(|v| v.min(upper))
            .fold(f64::INFINITY, f64::min);
        let range = upper - lower;

        if !(range > upper * f64::EPSILON) {
            // Flat field: mark every contributing pixel fully
            return Some(
                self.values
                    .iter()
                    .map(|v| if *v > threshold { 1.0 } else { 0.0 })
                    .collect(),
            );
        }

        Some(
            self.values
                .iter()
                .map(|v| ((v.min(upper) - lower) / range).clamp(0.0, 1.0))
                .collect(),
        )
    }
}

/// Percentile with linear interpolation between closest ranks
///
/// `sorted` must be ascending. `p` is clamped to [0, 100].
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (p.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Sigma for a pixel box: largest side over `divisor`, floored at `min_sigma`
pub fn sigma_for(pixel_box: &PixelBox, divisor: f64, min_sigma: f64) -> f64 {
    let side = f64::from(pixel_box.width().max(pixel_box.height()));
    (side / divisor).max(min_sigma)
}

/// Build the density field for `elements` on a `width` x `height` grid
///
/// Elements without a box, or whose box collapses in pixel space, are skipped.
/// Unknown ids use `params.default_severity`.
pub fn accumulate(
    width: u32,
    height: u32,
    elements: &[LocalizedElement],
    severities: &HashMap<String, u32>,
    params: &SynthesisParams,
) -> (DensityField, Vec<Contribution>) {
    let mut field = DensityField::new(width, height);
    let mut contributions = Vec::new();

    for element in elements {
        let Some(bounding_box) = element.bounding_box else {
            continue;
        };
        let Some(pixel_box) = bounding_box.to_pixels(width, height) else {
            tracing::debug!(id = %element.id, "Skipping element with degenerate pixel box");
            continue;
        };

        let severity = severities
            .get(&element.id)
            .copied()
            .unwrap_or(params.default_severity);
        let weight = params.weighting.weight(severity);
        let sigma = sigma_for(&pixel_box, params.sigma_divisor, params.min_sigma_px);
        let center = pixel_box.center();

        field.add_gaussian(center.0, center.1, sigma, weight);
        contributions.push(Contribution {
            id: element.id.clone(),
            pixel_box,
            center,
            sigma,
            weight,
        });
    }

    (field, contributions)
}
