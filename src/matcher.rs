//! Match engine: size the grid to the search window, fetch neighbors, score.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{MatchError, Result};
use crate::error_model::ErrorModel;
use crate::grid::{EntryId, GridIndex};
use crate::point::Coordinates;
use crate::tolerance::SearchRegion;

/// A query paired with one accepted candidate from the engine's grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'q, Q> {
    pub query: &'q Q,
    pub candidate: EntryId,
    pub score: f64,
}

/// How the search window is chosen and candidates accepted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Window derived from the error model; keep scores above `threshold`
    NormalDistribution { threshold: f64 },
    /// Fixed window; keep everything inside it
    FixedWindow { mz_tolerance: f64, rt_tolerance: f64 },
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy::FixedWindow {
            mz_tolerance: 0.005,
            rt_tolerance: 60.0,
        }
    }
}

impl SearchStrategy {
    pub fn region(&self, model: Option<&ErrorModel>) -> Result<SearchRegion> {
        match *self {
            SearchStrategy::NormalDistribution { threshold } => model
                .ok_or(MatchError::MissingErrorModel)?
                .search_region(threshold),
            SearchStrategy::FixedWindow {
                mz_tolerance,
                rt_tolerance,
            } => {
                let region = SearchRegion::new(mz_tolerance, rt_tolerance);
                region.bin_size()?;
                Ok(region)
            }
        }
    }

    /// Score for an offset, or `None` if the candidate is rejected.
    fn accept(&self, model: Option<&ErrorModel>, region: &SearchRegion, d_mz: f64, d_rt: f64) -> Option<f64> {
        match *self {
            SearchStrategy::NormalDistribution { threshold } => {
                let score = model?.score(d_mz, d_rt);
                (score > threshold).then_some(score)
            }
            SearchStrategy::FixedWindow { .. } => region
                .contains(d_mz, d_rt)
                .then(|| model.map_or(1.0, |m| m.score(d_mz, d_rt))),
        }
    }
}

/// Candidate observations plus the machinery to match queries against them.
#[derive(Debug, Clone)]
pub struct MatchEngine<T> {
    candidates: GridIndex<T>,
}

impl<T> MatchEngine<T> {
    pub fn new(candidates: GridIndex<T>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &GridIndex<T> {
        &self.candidates
    }

    pub fn into_candidates(self) -> GridIndex<T> {
        self.candidates
    }

    /// The candidate payload a match refers to.
    pub fn candidate<Q>(&self, m: &Match<'_, Q>) -> Option<&T> {
        self.candidates.get(m.candidate)
    }

    /// Candidates scoring strictly above `threshold` under `model`, in
    /// retrieval order (cell by cell, then bucket order).
    pub fn query<'q, Q: Coordinates>(
        &mut self,
        query: &'q Q,
        model: &ErrorModel,
        threshold: f64,
    ) -> Result<Vec<Match<'q, Q>>> {
        self.query_with(query, SearchStrategy::NormalDistribution { threshold }, Some(model))
    }

    pub fn query_with<'q, Q: Coordinates>(
        &mut self,
        query: &'q Q,
        strategy: SearchStrategy,
        model: Option<&ErrorModel>,
    ) -> Result<Vec<Match<'q, Q>>> {
        let region = self.prepare(strategy, model)?;
        Ok(self.collect(query, strategy, model, &region))
    }

    fn prepare(&mut self, strategy: SearchStrategy, model: Option<&ErrorModel>) -> Result<SearchRegion> {
        let region = strategy.region(model)?;
        let bin_size = region.bin_size()?;
        if bin_size == self.candidates.bin_size() {
            trace!("search region unchanged, keeping current bins");
        } else {
            self.candidates.rebin(bin_size);
        }
        Ok(region)
    }

    fn collect<'q, Q: Coordinates>(
        &self,
        query: &'q Q,
        strategy: SearchStrategy,
        model: Option<&ErrorModel>,
        region: &SearchRegion,
    ) -> Vec<Match<'q, Q>> {
        let origin = query.point();
        self.candidates
            .adjacent_entries(origin)
            .into_iter()
            .filter_map(|id| {
                let (d_mz, d_rt) = origin.offset_to(&self.candidates.point(id)?);
                let score = strategy.accept(model, region, d_mz, d_rt)?;
                Some(Match {
                    query,
                    candidate: id,
                    score,
                })
            })
            .collect()
    }
}

impl<T: Sync> MatchEngine<T> {
    /// Match every query, sizing the grid once for the whole batch.
    ///
    /// Queries are scored in parallel; results keep query order.
    pub fn match_all<'q, Q: Coordinates + Sync>(
        &mut self,
        queries: &'q [Q],
        model: &ErrorModel,
        threshold: f64,
    ) -> Result<Vec<Match<'q, Q>>> {
        self.match_all_with(queries, SearchStrategy::NormalDistribution { threshold }, Some(model))
    }

    pub fn match_all_with<'q, Q: Coordinates + Sync>(
        &mut self,
        queries: &'q [Q],
        strategy: SearchStrategy,
        model: Option<&ErrorModel>,
    ) -> Result<Vec<Match<'q, Q>>> {
        let region = self.prepare(strategy, model)?;
        let engine = &*self;
        let matches: Vec<Match<'q, Q>> = queries
            .par_iter()
            .flat_map_iter(|query| engine.collect(query, strategy, model, &region))
            .collect();
        debug!(
            queries = queries.len(),
            matches = matches.len(),
            "matched batch"
        );
        Ok(matches)
    }
}
