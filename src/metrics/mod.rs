//! Ranking-quality metrics.
//!
//! The free functions score single lists: NDCG@k, precision@k, recall@k,
//! self-information novelty, and catalog coverage.
//! [`MetricsEngine`] rounds a solved selection matrix into recommendation
//! lists and averages those scores over users and user groups.
//!
//! # References
//!
//! - Järvelin, Kekäläinen (2002), "Cumulated gain-based evaluation of IR
//!   techniques"
//! - Zhou et al. (2010), "Solving the apparent diversity-accuracy dilemma
//!   of recommender systems"
//! - Ge, Delgado-Battenfeld, Jannach (2010), "Beyond accuracy: evaluating
//!   recommender systems by coverage and serendipity"

mod engine;
mod ranking;

pub use engine::{GroupMetrics, MetricsConfig, MetricsEngine, UserMetrics};
pub use ranking::{
    catalog_coverage, ndcgk, novelty, precisionk, recallk, round_to, rounded_mean,
};
