//! Search-window sizing from a fitted error model.
//!
//! The error function is evaluated with Winitzki's closed-form approximation
//! and inverted with its exact algebraic inverse, so a candidate sitting
//! exactly on the computed radius scores exactly the threshold.

use std::f64::consts::{PI, SQRT_2};

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::error_model::{AxisModel, ErrorModel};
use crate::grid::BinSize;

const WINITZKI_A: f64 = 0.147;

/// Smallest half-width of the window, in standard deviations. Thresholds
/// near the peak score would otherwise round the radius to zero.
const MIN_RADIUS_SDS: f64 = 1e-6;

/// Approximate Gauss error function (absolute error below 2e-4).
pub fn erf(x: f64) -> f64 {
    let x2 = x * x;
    let inner = x2 * (4.0 / PI + WINITZKI_A * x2) / (1.0 + WINITZKI_A * x2);
    (1.0 - (-inner).exp()).sqrt().copysign(x)
}

/// Inverse of [`erf`] on `(-1, 1)`.
///
/// Returns `±inf` at `±1` and NaN outside `[-1, 1]`.
pub fn erf_inv(y: f64) -> f64 {
    let ln = (1.0 - y * y).ln();
    let b = 2.0 / (PI * WINITZKI_A) + ln / 2.0;
    ((b * b - ln / WINITZKI_A).sqrt() - b).sqrt().copysign(y)
}

/// Half-widths of the search window around a query point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRegion {
    pub mz_radius: f64,
    pub rt_radius: f64,
}

impl SearchRegion {
    pub fn new(mz_radius: f64, rt_radius: f64) -> Self {
        Self {
            mz_radius,
            rt_radius,
        }
    }

    /// Grid cells sized to the radii, so a 3x3 neighborhood covers the window
    pub fn bin_size(&self) -> Result<BinSize> {
        BinSize::new(self.mz_radius, self.rt_radius)
    }

    /// Whether an offset lies inside the window
    pub fn contains(&self, d_mz: f64, d_rt: f64) -> bool {
        d_mz.abs() <= self.mz_radius && d_rt.abs() <= self.rt_radius
    }
}

impl ErrorModel {
    /// Largest offsets that can still score above `threshold`.
    ///
    /// For each axis, the other axis is assumed to contribute its peak term;
    /// the radius is where this axis's term falls to `threshold / peak`.
    pub fn search_region(&self, threshold: f64) -> Result<SearchRegion> {
        self.validate()?;

        let max_score = self.max_score();
        if !(threshold > 0.0 && threshold < max_score) {
            return Err(MatchError::InvalidThreshold {
                threshold,
                max: max_score,
            });
        }

        let radius = |axis: &AxisModel, other_peak: f64| {
            let sds = SQRT_2 * erf_inv(1.0 - threshold / other_peak);
            axis.mean.abs() + axis.sd * sds.max(MIN_RADIUS_SDS)
        };

        Ok(SearchRegion::new(
            radius(&self.mz, self.rt.peak()),
            radius(&self.rt, self.mz.peak()),
        ))
    }
}

/// Search radii for offsets distributed as `Normal(mu1, sigma1)` in mz and
/// `Normal(mu2, sigma2)` in rt, at a minimum match score of `threshold`.
pub fn calculate_search_region(
    mu1: f64,
    sigma1: f64,
    mu2: f64,
    sigma2: f64,
    threshold: f64,
) -> Result<SearchRegion> {
    ErrorModel::new(mu1, sigma1, mu2, sigma2).search_region(threshold)
}
