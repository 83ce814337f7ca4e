//! Retention-time warping between two runs.
//!
//! A warp maps retention times of one run onto the time axis of another. It
//! is fitted from anchor pairs `(from_rt, to_rt)`, usually the same peptide
//! identified in both runs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MatchError, Result};
use crate::point::Coordinates;

/// Which kind of warp to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarpFunction {
    /// Leave retention times unchanged
    #[default]
    Identity,
    /// Least-squares line through the anchors
    Linear,
    /// Interpolate between anchors, extrapolating the end segments
    PiecewiseLinear,
}

/// A fitted retention-time mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RtWarp {
    Identity,
    Linear { slope: f64, intercept: f64 },
    /// Knots sorted by source rt with distinct source values
    PiecewiseLinear { knots: Vec<(f64, f64)> },
}

impl WarpFunction {
    /// Fit from `(from_rt, to_rt)` anchors.
    pub fn fit(&self, anchors: &[(f64, f64)]) -> Result<RtWarp> {
        if let Some(&(x, y)) = anchors.iter().find(|(x, y)| !(x.is_finite() && y.is_finite())) {
            return Err(MatchError::NonFiniteParameter {
                name: "anchor rt",
                value: if x.is_finite() { y } else { x },
            });
        }
        let warp = match self {
            WarpFunction::Identity => RtWarp::Identity,
            WarpFunction::Linear => fit_linear(anchors)?,
            WarpFunction::PiecewiseLinear => fit_piecewise(anchors)?,
        };
        debug!(anchors = anchors.len(), ?warp, "fitted rt warp");
        Ok(warp)
    }

    /// Fit from pairs of observations, mapping the first's rt onto the second's.
    pub fn fit_pairs<'a, A, B, I>(&self, pairs: I) -> Result<RtWarp>
    where
        A: Coordinates + 'a,
        B: Coordinates + 'a,
        I: IntoIterator<Item = (&'a A, &'a B)>,
    {
        let anchors: Vec<(f64, f64)> = pairs.into_iter().map(|(a, b)| (a.rt(), b.rt())).collect();
        self.fit(&anchors)
    }
}

/// Anchors sorted by source rt, with repeated source values averaged.
fn distinct_knots(anchors: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut sorted = anchors.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut knots: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    let mut run = 0usize;
    for (x, y) in sorted {
        match knots.last_mut() {
            Some(last) if last.0 == x => {
                run += 1;
                last.1 += (y - last.1) / run as f64;
            }
            _ => {
                run = 1;
                knots.push((x, y));
            }
        }
    }
    knots
}

fn fit_linear(anchors: &[(f64, f64)]) -> Result<RtWarp> {
    let distinct = distinct_knots(anchors).len();
    if distinct < 2 {
        return Err(MatchError::InsufficientData {
            needed: 2,
            actual: distinct,
        });
    }
    let n = anchors.len() as f64;
    let mean_x = anchors.iter().map(|a| a.0).sum::<f64>() / n;
    let mean_y = anchors.iter().map(|a| a.1).sum::<f64>() / n;
    let (sxy, sxx) = anchors.iter().fold((0.0, 0.0), |(sxy, sxx), &(x, y)| {
        (sxy + (x - mean_x) * (y - mean_y), sxx + (x - mean_x).powi(2))
    });
    let slope = sxy / sxx;
    Ok(RtWarp::Linear {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

fn fit_piecewise(anchors: &[(f64, f64)]) -> Result<RtWarp> {
    let knots = distinct_knots(anchors);
    if knots.len() < 2 {
        return Err(MatchError::InsufficientData {
            needed: 2,
            actual: knots.len(),
        });
    }
    Ok(RtWarp::PiecewiseLinear { knots })
}

impl RtWarp {
    pub fn apply(&self, rt: f64) -> f64 {
        match self {
            RtWarp::Identity => rt,
            RtWarp::Linear { slope, intercept } => slope * rt + intercept,
            RtWarp::PiecewiseLinear { knots } => {
                if knots.len() < 2 {
                    return rt;
                }
                // segment i joins knots[i - 1] and knots[i]
                let i = knots
                    .partition_point(|k| k.0 < rt)
                    .clamp(1, knots.len() - 1);
                let (x0, y0) = knots[i - 1];
                let (x1, y1) = knots[i];
                y0 + (rt - x0) * (y1 - y0) / (x1 - x0)
            }
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, RtWarp::Identity)
    }
}
