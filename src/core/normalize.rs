use ndarray::{Array, ArrayBase, Data, Dimension};
use num_traits::{Float, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Lower percentile used when no clip minimum is supplied
pub const AUTO_PERCENTILE_LOW: f64 = 3.0;
/// Upper percentile used when no clip maximum is supplied
pub const AUTO_PERCENTILE_HIGH: f64 = 97.0;

/// Clip range applied to a backscatter band before gamma correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    pub vmin: f64,
    pub vmax: f64,
}

impl ClipRange {
    pub const fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }
}

/// Clip ranges for both polarizations of a browse composite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRanges {
    pub co_pol: ClipRange,
    pub cross_pol: ClipRange,
}

impl Default for ClipRanges {
    fn default() -> Self {
        ClipPreset::Standard.ranges()
    }
}

/// Named clip range configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipPreset {
    /// co-pol [0, 0.15], cross-pol [0, 0.025]
    #[default]
    Standard,
    /// co-pol [0.02, 0.3], cross-pol [0.003, 0.08], tuned for GIBS layers
    Gibs,
}

impl ClipPreset {
    pub const fn ranges(self) -> ClipRanges {
        match self {
            ClipPreset::Standard => ClipRanges {
                co_pol: ClipRange::new(0.0, 0.15),
                cross_pol: ClipRange::new(0.0, 0.025),
            },
            ClipPreset::Gibs => ClipRanges {
                co_pol: ClipRange::new(0.02, 0.3),
                cross_pol: ClipRange::new(0.003, 0.08),
            },
        }
    }
}

/// Percentile of the non-NaN samples, linearly interpolated between the
/// closest ranks. Returns NaN when every sample is NaN.
pub fn nan_percentile<I>(values: I, percentile: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut valid: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return f64::NAN;
    }
    valid.sort_by(|a, b| a.total_cmp(b));

    let rank = (percentile / 100.0).clamp(0.0, 1.0) * (valid.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    valid[lower] + (valid[upper] - valid[lower]) * fraction
}

/// Map one backscatter sample to a byte with gamma 0.5 correction.
///
/// NaN input and NaN results (e.g. `vmax == vmin`) map to 0.
#[inline]
pub fn normalize_sample(sample: f64, vmin: f64, vmax: f64) -> u8 {
    if sample.is_nan() || sample - vmin < 0.0 {
        return 0;
    }
    let corrected = ((sample - vmin) / (vmax - vmin)).sqrt();
    if corrected.is_nan() {
        return 0;
    }
    (corrected.clamp(0.0, 1.0) * 255.0).round_ties_even() as u8
}

/// Normalize a band of any dimensionality to bytes.
///
/// Missing bounds fall back to the 3rd and 97th percentiles of the band.
pub fn normalize<S, D>(band: &ArrayBase<S, D>, vmin: Option<f64>, vmax: Option<f64>) -> Array<u8, D>
where
    S: Data,
    S::Elem: Float,
    D: Dimension,
{
    let as_f64 = |v: &S::Elem| v.to_f64().unwrap_or(f64::NAN);

    let percentile = |p: f64| nan_percentile(band.iter().map(as_f64), p);
    let vmin = vmin.unwrap_or_else(|| percentile(AUTO_PERCENTILE_LOW));
    let vmax = vmax.unwrap_or_else(|| percentile(AUTO_PERCENTILE_HIGH));
    log::debug!("Normalizing band with clip range [{}, {}]", vmin, vmax);

    band.map(|v| normalize_sample(as_f64(v), vmin, vmax))
}

/// Normalize with an explicit clip range
pub fn normalize_with_range<S, D>(band: &ArrayBase<S, D>, range: ClipRange) -> Array<u8, D>
where
    S: Data,
    S::Elem: Float,
    D: Dimension,
{
    normalize(band, Some(range.vmin), Some(range.vmax))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};

    #[test]
    fn test_auto_range_golden_values() {
        let input: Array1<f64> = Array1::range(0.0, 10.0, 1.0);
        let output = normalize(&input, None, None);
        assert_eq!(output.to_vec(), vec![0, 75, 115, 145, 169, 191, 210, 227, 244, 255]);
    }

    #[test]
    fn test_trailing_nan_maps_to_zero() {
        let mut values: Vec<f64> = (0..10).map(f64::from).collect();
        values.push(f64::NAN);
        let output = normalize(&Array1::from(values), None, None);
        assert_eq!(output.to_vec(), vec![0, 75, 115, 145, 169, 191, 210, 227, 244, 255, 0]);
    }

    #[test]
    fn test_percentile_interpolation() {
        let values = (0..10).map(f64::from);
        assert_relative_eq!(nan_percentile(values.clone(), 3.0), 0.27, epsilon = 1e-12);
        assert_relative_eq!(nan_percentile(values, 97.0), 8.73, epsilon = 1e-12);
        assert!(nan_percentile([f64::NAN, f64::NAN], 50.0).is_nan());
        assert_eq!(nan_percentile([f64::NAN, 4.0], 97.0), 4.0);
    }

    #[test]
    fn test_below_minimum_is_zero() {
        let band = array![-1.0f32, 0.01, 0.02];
        let output = normalize(&band, Some(0.02), Some(0.3));
        assert_eq!(output.to_vec(), vec![0, 0, 0]);
    }

    #[test]
    fn test_above_maximum_saturates() {
        let band = array![[0.15f64, 10.0], [f64::INFINITY, f64::NEG_INFINITY]];
        let output = normalize(&band, Some(0.0), Some(0.15));
        assert_eq!(output, array![[255u8, 255], [255, 0]]);
    }

    #[test]
    fn test_degenerate_range() {
        // 0/0 is NaN and maps to 0; anything above the bound divides to +inf
        assert_eq!(normalize_sample(0.1, 0.1, 0.1), 0);
        assert_eq!(normalize_sample(0.2, 0.1, 0.1), 255);
        assert_eq!(normalize_sample(0.0, 0.1, 0.1), 0);
    }

    #[test]
    fn test_all_nan_band_is_zero() {
        let band = Array1::<f32>::from_elem(5, f32::NAN);
        let output = normalize(&band, None, None);
        assert!(output.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_midpoint_rounding() {
        // sqrt(0.25) * 255 == 127.5 exactly
        assert_eq!(normalize_sample(0.25, 0.0, 1.0), 128);
        assert_eq!(normalize_sample(0.5625, 0.0, 1.0), 191);
    }

    #[test]
    fn test_presets() {
        let standard = ClipPreset::Standard.ranges();
        assert_eq!(standard.co_pol, ClipRange::new(0.0, 0.15));
        assert_eq!(standard.cross_pol, ClipRange::new(0.0, 0.025));
        let gibs = ClipPreset::Gibs.ranges();
        assert_eq!(gibs.co_pol, ClipRange::new(0.02, 0.3));
        assert_eq!(gibs.cross_pol, ClipRange::new(0.003, 0.08));
        assert_eq!(ClipRanges::default(), standard);
    }
}
