//! One matching run: identifications of run A against features of run B.
//!
//! Preparing a run aligns A's retention times to B using the peptides both
//! runs identified. When the configured strategy needs an error model and
//! none was given, it fits one from the same shared peptides.

use tracing::info;

use crate::config::MatchConfig;
use crate::error::Result;
use crate::error_model::ErrorModel;
use crate::matcher::{MatchEngine, SearchStrategy};
use crate::records::{Feature, PeptideId};
use crate::warp::RtWarp;

/// An identification of run A matched to a feature of run B
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeptideMatch<'a> {
    pub peptide: &'a PeptideId,
    pub feature: &'a Feature,
    pub score: f64,
}

#[derive(Debug)]
pub struct MatchRun {
    queries: Vec<PeptideId>,
    engine: MatchEngine<Feature>,
    strategy: SearchStrategy,
    error_model: Option<ErrorModel>,
    warp: RtWarp,
}

impl MatchRun {
    pub fn prepare<A, B, F>(config: &MatchConfig, ids_a: A, ids_b: B, features_b: F) -> Result<Self>
    where
        A: IntoIterator<Item = PeptideId>,
        B: IntoIterator<Item = PeptideId>,
        F: IntoIterator<Item = Feature>,
    {
        config.validate()?;
        let mut run_a = config.peptide_dataset(ids_a);
        let run_b = config.peptide_dataset(ids_b);
        let features = config.feature_dataset(features_b);

        let warp = config
            .warp_function
            .fit_pairs(run_a.shared_peptides(&run_b))?;
        if !warp.is_identity() {
            run_a.warp_rt(&warp);
        }

        let error_model = match (config.error_model, config.strategy) {
            (Some(model), _) => Some(model),
            (None, SearchStrategy::NormalDistribution { .. }) => {
                Some(ErrorModel::fit_shared_peptides(&run_a, &run_b)?)
            }
            (None, SearchStrategy::FixedWindow { .. }) => None,
        };

        info!(
            queries = run_a.len(),
            features = features.len(),
            ?warp,
            ?error_model,
            "prepared match run"
        );

        Ok(Self {
            queries: run_a.records().cloned().collect(),
            engine: MatchEngine::new(features.into_index()),
            strategy: config.strategy,
            error_model,
            warp,
        })
    }

    /// Confident identifications of run A, on run B's time axis.
    pub fn queries(&self) -> &[PeptideId] {
        &self.queries
    }

    pub fn warp(&self) -> &RtWarp {
        &self.warp
    }

    pub fn error_model(&self) -> Option<&ErrorModel> {
        self.error_model.as_ref()
    }

    /// Match every query, in query order.
    pub fn run(&mut self) -> Result<Vec<PeptideMatch<'_>>> {
        let matches = self
            .engine
            .match_all_with(&self.queries, self.strategy, self.error_model.as_ref())?;
        let engine = &self.engine;
        Ok(matches
            .into_iter()
            .filter_map(|m| {
                engine.candidate(&m).map(|feature| PeptideMatch {
                    peptide: m.query,
                    feature,
                    score: m.score,
                })
            })
            .collect())
    }
}
