//! Fairness-aware re-ranking of recommender top-k lists.
//!
//! Re-ranks a recommendation model's per-user candidates into fixed-size
//! lists, trading raw relevance against two fairness objectives:
//!
//! - **Consumer fairness**: equalizing ranking quality (NDCG) between user
//!   groups, e.g. active and inactive users.
//! - **Provider fairness**: equalizing exposure between item groups, e.g.
//!   short-head and long-tail items.
//!
//! The pipeline has three stages plus a sweep driver:
//!
//! - [`matrices`]: builds the score matrix, top-`topk` candidate set,
//!   training-hit indicator, and item-group indicator from a
//!   [`ScoreModel`](matrices::ScoreModel).
//! - [`fairness`]: formulates one linear program per fairness mode and
//!   penalty weight and solves it through the [`lp`] layer.
//! - [`metrics`]: rounds the solved selection into lists and scores them
//!   (NDCG, precision, recall, novelty, catalog coverage).
//! - [`sweep`]: runs every (mode, epsilon) cell of an experiment and tags
//!   failures with the cell that raised them.
//!
//! # Architecture
//!
//! Data flows strictly builder → optimizer → metrics. No component keeps
//! state across calls, and the crate performs no file or network I/O;
//! loading datasets and persisting reports are left to the caller.
//! The LP backend sits behind the [`LpSolver`](lp::LpSolver) trait, with a
//! pure-Rust default built on `good_lp`.

pub mod data;
pub mod error;
pub mod fairness;
pub mod lp;
pub mod matrices;
pub mod metrics;
pub mod sweep;

pub use error::{FairRankError, Result};
