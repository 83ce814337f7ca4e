//! Matching configuration, read from and written to JSON.

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Record};
use crate::error::{MatchError, Result};
use crate::error_model::ErrorModel;
use crate::grid::BinSize;
use crate::matcher::SearchStrategy;
use crate::records::{Feature, PeptideId};
use crate::warp::WarpFunction;

/// Settings for one matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// How the search window is sized and candidates accepted.
    pub strategy: SearchStrategy,
    /// Fixed offsets. With `NormalDistribution` and no model, one is fitted
    /// from peptides shared between runs.
    pub error_model: Option<ErrorModel>,
    /// Initial cells for peptide identifications.
    pub peptide_bin_size: BinSize,
    /// Initial cells for features.
    pub feature_bin_size: BinSize,
    /// Identifications at or below this probability are dropped.
    pub min_probability: f64,
    /// Retention-time warp fitted before matching.
    pub warp_function: WarpFunction,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::default(),
            error_model: None,
            peptide_bin_size: PeptideId::BIN_SIZE,
            feature_bin_size: Feature::BIN_SIZE,
            min_probability: 0.9,
            warp_function: WarpFunction::Identity,
        }
    }
}

impl MatchConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| MatchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| MatchError::Config(e.to_string()))
    }

    /// Confident identifications, binned at `peptide_bin_size`.
    pub fn peptide_dataset<I>(&self, ids: I) -> Dataset<PeptideId>
    where
        I: IntoIterator<Item = PeptideId>,
    {
        let ids = ids
            .into_iter()
            .filter(|id| id.is_confident(self.min_probability));
        Dataset::with_bin_size(ids, self.peptide_bin_size)
    }

    /// Features binned at `feature_bin_size`.
    pub fn feature_dataset<I>(&self, features: I) -> Dataset<Feature>
    where
        I: IntoIterator<Item = Feature>,
    {
        Dataset::with_bin_size(features, self.feature_bin_size)
    }

    pub fn validate(&self) -> Result<()> {
        self.peptide_bin_size.validate()?;
        self.feature_bin_size.validate()?;
        if let Some(model) = &self.error_model {
            model.validate()?;
        }
        match (self.strategy, &self.error_model) {
            (SearchStrategy::NormalDistribution { threshold }, None) => {
                if !(threshold > 0.0 && threshold < 1.0) {
                    return Err(MatchError::InvalidThreshold { threshold, max: 1.0 });
                }
            }
            (strategy, model) => {
                strategy.region(model.as_ref())?;
            }
        }
        if !(0.0..=1.0).contains(&self.min_probability) {
            return Err(MatchError::Config(format!(
                "min_probability must be within [0, 1], got {}",
                self.min_probability
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MatchConfig::default();
        config.validate().unwrap();
        assert_eq!(config.peptide_bin_size, BinSize::TIGHT);
        assert_eq!(config.feature_bin_size, BinSize::LENIENT);
        assert_eq!(config.min_probability, 0.9);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = MatchConfig::from_json(r#"{"min_probability": 0.5}"#).unwrap();
        assert_eq!(config.min_probability, 0.5);
        assert_eq!(config.strategy, SearchStrategy::default());
        assert!(config.error_model.is_none());
    }

    #[test]
    fn test_normal_distribution_config() {
        let json = r#"{
            "strategy": {"kind": "normal_distribution", "threshold": 0.6},
            "error_model": {"mz": {"mean": 0.0, "sd": 0.002}, "rt": {"mean": 5.0, "sd": 30.0}}
        }"#;
        let config = MatchConfig::from_json(json).unwrap();
        assert_eq!(config.error_model, Some(ErrorModel::new(0.0, 0.002, 5.0, 30.0)));
    }

    #[test]
    fn test_normal_distribution_model_may_be_fitted_later() {
        let json = r#"{"strategy": {"kind": "normal_distribution", "threshold": 0.6}}"#;
        assert!(MatchConfig::from_json(json).unwrap().error_model.is_none());

        let json = r#"{"strategy": {"kind": "normal_distribution", "threshold": 1.0}}"#;
        assert!(matches!(
            MatchConfig::from_json(json),
            Err(MatchError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            MatchConfig::from_json(r#"{"min_probability": 1.5}"#),
            Err(MatchError::Config(_))
        ));
        assert!(matches!(
            MatchConfig::from_json(r#"{"feature_bin_size": {"width": 0.0, "height": 10.0}}"#),
            Err(MatchError::InvalidBinSize { .. })
        ));
        assert!(matches!(
            MatchConfig::from_json("not json"),
            Err(MatchError::Config(_))
        ));
    }

    #[test]
    fn test_datasets_follow_config() {
        let config = MatchConfig {
            peptide_bin_size: BinSize::new(0.01, 30.0).unwrap(),
            min_probability: 0.8,
            ..MatchConfig::default()
        };
        let z = std::num::NonZeroU8::new(2).unwrap();
        let ids = config.peptide_dataset(vec![
            PeptideId::new("KEEP", 1000.0, z, 100.0, 0.95),
            PeptideId::new("EDGE", 1000.0, z, 100.0, 0.8),
            PeptideId::new("DROP", 1000.0, z, 100.0, 0.3),
        ]);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids.index().bin_size(), config.peptide_bin_size);

        let features = config.feature_dataset(Vec::new());
        assert_eq!(features.index().bin_size(), BinSize::LENIENT);
    }

    #[test]
    fn test_warp_function_from_json() {
        let config = MatchConfig::from_json(r#"{"warp_function": "linear"}"#).unwrap();
        assert_eq!(config.warp_function, WarpFunction::Linear);
        assert_eq!(MatchConfig::default().warp_function, WarpFunction::Identity);
    }

    #[test]
    fn test_json_round_trip() {
        let config = MatchConfig {
            error_model: Some(ErrorModel::new(0.001, 0.003, -2.0, 25.0)),
            ..MatchConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(MatchConfig::from_json(&json).unwrap(), config);
    }
}
