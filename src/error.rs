//! Error types for indexing and matching

use thiserror::Error;

/// Result type alias for matcher operations
pub type Result<T> = std::result::Result<T, MatchError>;

/// Error types that can occur while indexing or matching
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Invalid threshold: {threshold} (must lie strictly between 0 and {max})")]
    InvalidThreshold { threshold: f64, max: f64 },

    #[error("Invalid standard deviation on the {axis} axis: {sd}")]
    InvalidDeviation { axis: &'static str, sd: f64 },

    #[error("Non-finite {name}: {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },

    #[error("Invalid bin size: {width} x {height}")]
    InvalidBinSize { width: f64, height: f64 },

    #[error("Payload not found at mz {mz}, rt {rt}")]
    PayloadNotFound { mz: f64, rt: f64 },

    #[error("Insufficient data: need at least {needed} offsets, got {actual}")]
    InsufficientData { needed: usize, actual: usize },

    #[error("Normal distribution search requires a fitted error model")]
    MissingErrorModel,

    #[error("Config error: {0}")]
    Config(String),
}
