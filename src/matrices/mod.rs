//! Ranking-matrix construction.
//!
//! Turns a scored model plus user/item group memberships into the dense
//! matrices the fairness optimizer consumes:
//!
//! - **S** ([`ScoreMatrix`]): user × item scores
//! - **P** ([`CandidateSet`]): per-user top-`topk` items, best first
//! - **Ahelp** ([`HitMatrix`]): whether a candidate is a training interaction
//! - **Ihelp** ([`GroupIndicator`]): item group of every candidate
//! - **U** ([`UserGroups`]): user group membership
//!
//! All matrices are immutable once built and are rebuilt per
//! (dataset, model, user-group split, item-group split).

mod builder;
mod types;

pub use builder::{
    build_candidates, build_group_indicator, build_hit_matrix, build_scores, BuilderConfig,
    RankingMatrixBuilder,
};
pub use types::{
    CandidateSet, GroupIndicator, HitMatrix, ItemGroups, PrecomputedScores, RankingMatrices,
    ScoreMatrix, ScoreModel, UserGroups, ITEM_GROUP_COUNT, LONGTAIL, SHORTHEAD,
};
