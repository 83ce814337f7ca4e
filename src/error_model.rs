//! Fitted offset distributions and the match score built on them.
//!
//! Offsets are always `candidate - query`. On each axis the offset is taken
//! to be `Normal(mean, sd)`, so the distance of an offset from the fitted
//! mean is half-normal. The per-axis term is the two-sided tail probability
//! of seeing an offset at least that far from the mean, and the match score
//! is the product of the mz and rt terms.

use std::f64::consts::SQRT_2;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{MatchError, Result};
use crate::point::{offsets, Coordinates};
use crate::records::PeptideId;
use crate::tolerance::erf;

/// Offset distribution along one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisModel {
    pub mean: f64,
    pub sd: f64,
}

impl AxisModel {
    pub fn new(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }

    /// Tail probability of an offset at least as far from the mean as `offset`
    pub fn term(&self, offset: f64) -> f64 {
        1.0 - erf((offset - self.mean).abs() / (self.sd * SQRT_2))
    }

    /// Best term this axis can contribute
    pub fn peak(&self) -> f64 {
        self.term(self.mean)
    }

    /// Mean and sample standard deviation of `values`
    pub fn fit(values: impl IntoIterator<Item = f64>) -> Result<Self> {
        let values: Vec<f64> = values.into_iter().collect();
        let n = values.len();
        if n < 2 {
            return Err(MatchError::InsufficientData {
                needed: 2,
                actual: n,
            });
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Ok(Self::new(mean, var.sqrt()))
    }

    fn validate(&self, axis: &'static str) -> Result<()> {
        if !self.mean.is_finite() {
            return Err(MatchError::NonFiniteParameter {
                name: if axis == "mz" { "mz mean" } else { "rt mean" },
                value: self.mean,
            });
        }
        if !(self.sd.is_finite() && self.sd > 0.0) {
            return Err(MatchError::InvalidDeviation { axis, sd: self.sd });
        }
        Ok(())
    }
}

/// Offset distributions along both axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorModel {
    pub mz: AxisModel,
    pub rt: AxisModel,
}

impl ErrorModel {
    pub fn new(mz_mean: f64, mz_sd: f64, rt_mean: f64, rt_sd: f64) -> Self {
        Self {
            mz: AxisModel::new(mz_mean, mz_sd),
            rt: AxisModel::new(rt_mean, rt_sd),
        }
    }

    /// Fit both axes from `(d_mz, d_rt)` offsets of trusted pairs.
    pub fn fit(offsets: &[(f64, f64)]) -> Result<Self> {
        let model = Self {
            mz: AxisModel::fit(offsets.iter().map(|o| o.0))?,
            rt: AxisModel::fit(offsets.iter().map(|o| o.1))?,
        };
        model.validate()?;
        Ok(model)
    }

    /// Fit from pairs of observations known to correspond.
    pub fn fit_pairs<'a, A, B, I>(pairs: I) -> Result<Self>
    where
        A: Coordinates + 'a,
        B: Coordinates + 'a,
        I: IntoIterator<Item = (&'a A, &'a B)>,
    {
        let deltas: Vec<(f64, f64)> = pairs.into_iter().map(|(a, b)| offsets(a, b)).collect();
        Self::fit(&deltas)
    }

    /// Fit from peptides identified in both runs, offsets taken as
    /// `other - query` per shared sequence.
    pub fn fit_shared_peptides(
        query: &Dataset<PeptideId>,
        other: &Dataset<PeptideId>,
    ) -> Result<Self> {
        Self::fit_pairs(query.shared_peptides(other))
    }

    pub fn validate(&self) -> Result<()> {
        self.mz.validate("mz")?;
        self.rt.validate("rt")
    }

    /// Score of an offset; higher means a more plausible match.
    pub fn score(&self, d_mz: f64, d_rt: f64) -> f64 {
        self.mz.term(d_mz) * self.rt.term(d_rt)
    }

    pub fn score_pair<A: Coordinates, B: Coordinates>(&self, query: &A, candidate: &B) -> f64 {
        let (d_mz, d_rt) = offsets(query, candidate);
        self.score(d_mz, d_rt)
    }

    /// Highest score any offset can reach
    pub fn max_score(&self) -> f64 {
        self.mz.peak() * self.rt.peak()
    }
}
