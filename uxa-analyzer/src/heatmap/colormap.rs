//! Perceptually uniform colormap (viridis)

/// Viridis sampled at 1/8 steps
const VIRIDIS: [[u8; 3]; 9] = [
    [68, 1, 84],
    [71, 44, 122],
    [59, 81, 139],
    [44, 113, 142],
    [33, 144, 141],
    [39, 173, 129],
    [92, 200, 99],
    [170, 220, 50],
    [253, 231, 37],
];

/// Color for `t` in [0, 1] (clamped), linearly interpolated between anchors
pub fn viridis(t: f64) -> [u8; 3] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(VIRIDIS.len() - 1);
    let frac = scaled - lo as f64;

    let mut out = [0u8; 3];
    for (channel, value) in out.iter_mut().enumerate() {
        let a = f64::from(VIRIDIS[lo][channel]);
        let b = f64::from(VIRIDIS[hi][channel]);
        *value = (a + (b - a) * frac).round() as u8;
    }
    out
}
