//! Error types shared by the builder, optimizer, metrics, and sweep layers.

use thiserror::Error;

/// Errors raised while building matrices, solving, or scoring rankings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FairRankError {
    /// Input data refers to a user or item outside the known index range,
    /// or two inputs disagree on dimensions.
    #[error("data inconsistency: {0}")]
    DataInconsistency(String),

    /// A ratio was requested whose denominator is zero (empty list,
    /// user without interactions, empty group).
    #[error("zero denominator: {0}")]
    ZeroDenominator(String),

    /// The LP has no feasible assignment.
    #[error("solver reported the model infeasible")]
    SolverInfeasible,

    /// The LP objective is unbounded.
    #[error("solver reported the model unbounded")]
    SolverUnbounded,

    /// The solver did not return within the configured time limit.
    #[error("solver exceeded the time limit of {limit_ms} ms")]
    SolverTimeout { limit_ms: u64 },

    /// Any other solver failure (malformed model, backend error).
    #[error("solver failure: {0}")]
    Solver(String),

    /// A configuration struct failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FairRankError>;
