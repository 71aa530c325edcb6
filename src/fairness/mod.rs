//! Fairness-aware re-ranking as a linear program.
//!
//! For every user the optimizer selects exactly `k` of the `topk`
//! candidates (`W[u][rank] ∈ [0, 1]`), maximizing
//!
//! ```text
//! Σ score[u][rank]·W[u][rank]
//!     − user_epsilon · gap(group DCG or NDCG)            (consumer fairness)
//!     − item_epsilon · (w0·exposure[0] − w1·exposure[1])  (provider fairness)
//! ```
//!
//! Per-user DCG/NDCG/precision/recall, per-user-group aggregates, and
//! per-item-group exposure are auxiliary variables pinned to `W` by
//! equality rows, so the solver reports them alongside the selection.
//!
//! The discount policy, gap source, aggregation rules, and gap orientation
//! are selected by [`FormulationConfig`]; the presets
//! [`FormulationConfig::flat_sum`], [`FormulationConfig::proportional`]
//! and [`FormulationConfig::dcg_change`] cover the common variants.
//!
//! Variables are continuous, so `W` may come back fractional. The metrics
//! layer rounds it with an inclusion threshold.
//!
//! # References
//!
//! - Rahmani, Naghiaei, Dehghan, Aliannejadi (2022), "Experiments on
//!   Generalizability of User-Oriented Fairness in Recommender Systems"
//! - Li, Chen, Fu, Ge, Zhang (2021), "User-oriented Fairness in
//!   Recommendation"

mod config;
mod runner;
mod types;

pub use config::{
    DiscountPolicy, FairnessMode, FormulationConfig, GapSign, GapSource, GroupAggregation,
    OptimizerConfig,
};
pub use runner::{FairnessOptimizer, Formulation};
pub use types::{FairnessProblem, OptimizerResult, SelectionMatrix};
