//! # mzrt_matcher
//!
//! Match observations between two LC-MS datasets by mass-to-charge (mz) and
//! retention time (rt).
//!
//! This library provides:
//! - A grid spatial index with exact-cell and 3x3 neighborhood queries
//! - An mz-sorted index with retention-time filters
//! - Datasets of peptide identifications and features
//! - Error models fitted from matched pairs, and search-window sizing
//! - A match engine that scores candidates under an error model
//! - Retention-time warps fitted from peptides shared between runs
//!
//! ## Example
//!
//! ```rust
//! use mzrt_matcher::{BinSize, ErrorModel, GridIndex, MatchEngine, Point};
//!
//! let candidates = GridIndex::build(
//!     vec![(Point::new(500.001, 1002.0), "f1"), (Point::new(520.0, 1000.0), "f2")],
//!     BinSize::LENIENT,
//! );
//! let mut engine = MatchEngine::new(candidates);
//!
//! let model = ErrorModel::new(0.0, 0.005, 0.0, 20.0);
//! let query = Point::new(500.0, 1000.0);
//! let matches = engine.query(&query, &model, 0.5).unwrap();
//!
//! assert_eq!(matches.len(), 1);
//! assert_eq!(engine.candidate(&matches[0]), Some(&"f1"));
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod error_model;
pub mod grid;
pub mod matcher;
pub mod ordered;
pub mod pipeline;
pub mod point;
pub mod records;
pub mod tolerance;
pub mod warp;

pub use config::MatchConfig;
pub use dataset::{Dataset, Record};
pub use error::{MatchError, Result};
pub use error_model::{AxisModel, ErrorModel};
pub use grid::{BinSize, Cell, EntryId, GridIndex};
pub use matcher::{Match, MatchEngine, SearchStrategy};
pub use ordered::{OrderedIndex, RtFilter};
pub use pipeline::{MatchRun, PeptideMatch};
pub use point::{offsets, Coordinates, Point};
pub use records::{Feature, PeptideId, PROTON_MASS};
pub use tolerance::{calculate_search_region, SearchRegion};
pub use warp::{RtWarp, WarpFunction};
