//! Optimizer inputs and outputs.

use super::config::FairnessMode;
use crate::data::InteractionData;
use crate::error::{FairRankError, Result};
use crate::matrices::{ItemGroups, RankingMatrices, UserGroups, ITEM_GROUP_COUNT};
use ndarray::{Array2, ArrayView1};

/// Borrowed inputs of one (dataset, model, user split, item split) problem.
///
/// Construction checks that every matrix covers the same users and that
/// the candidate indicator covers both item groups.
#[derive(Debug, Clone, Copy)]
pub struct FairnessProblem<'a> {
    pub matrices: &'a RankingMatrices,
    pub user_groups: &'a UserGroups,
    pub item_groups: &'a ItemGroups,
    pub data: &'a InteractionData,
}

impl<'a> FairnessProblem<'a> {
    pub fn new(
        matrices: &'a RankingMatrices,
        user_groups: &'a UserGroups,
        item_groups: &'a ItemGroups,
        data: &'a InteractionData,
    ) -> Result<Self> {
        let users = matrices.total_users();
        for (label, count) in [
            ("user groups", user_groups.total_users()),
            ("interaction data", data.total_users()),
            ("hit matrix", matrices.hits.total_users()),
            ("item-group indicator", matrices.item_indicator.total_users()),
        ] {
            if count != users {
                return Err(FairRankError::DataInconsistency(format!(
                    "{label} covers {count} users, candidates cover {users}"
                )));
            }
        }
        if item_groups.total_items() != data.total_items() {
            return Err(FairRankError::DataInconsistency(format!(
                "item groups cover {} items, interaction data covers {}",
                item_groups.total_items(),
                data.total_items()
            )));
        }
        if matrices.item_indicator.group_count() != ITEM_GROUP_COUNT {
            return Err(FairRankError::DataInconsistency(format!(
                "item-group indicator has {} groups, expected {ITEM_GROUP_COUNT}",
                matrices.item_indicator.group_count()
            )));
        }

        Ok(Self {
            matrices,
            user_groups,
            item_groups,
            data,
        })
    }

    pub fn total_users(&self) -> usize {
        self.matrices.total_users()
    }

    pub fn topk(&self) -> usize {
        self.matrices.topk()
    }
}

/// Solved user × rank selection matrix `W`.
///
/// Entries lie in `[0, 1]`; the LP relaxation may leave some fractional.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectionMatrix {
    values: Array2<f64>,
}

impl SelectionMatrix {
    pub fn new(values: Array2<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn get(&self, user: usize, rank: usize) -> f64 {
        self.values[[user, rank]]
    }

    pub fn row(&self, user: usize) -> ArrayView1<'_, f64> {
        self.values.row(user)
    }

    pub fn total_users(&self) -> usize {
        self.values.nrows()
    }

    pub fn topk(&self) -> usize {
        self.values.ncols()
    }

    /// Selected mass of `user`; `k` for a feasible solution.
    pub fn row_sum(&self, user: usize) -> f64 {
        self.values.row(user).sum()
    }

    /// Whether every entry lies in `[0, 1]` within `tolerance`.
    pub fn is_within_bounds(&self, tolerance: f64) -> bool {
        self.values
            .iter()
            .all(|&w| w >= -tolerance && w <= 1.0 + tolerance)
    }

    /// Number of entries strictly between 0 and 1 beyond `tolerance`.
    pub fn fractional_count(&self, tolerance: f64) -> usize {
        self.values
            .iter()
            .filter(|&&w| w > tolerance && w < 1.0 - tolerance)
            .count()
    }
}

/// Result of one fairness-aware re-ranking solve.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizerResult {
    /// Mode and weights that produced this result.
    pub mode: FairnessMode,

    /// The selection matrix `W`.
    pub selection: SelectionMatrix,

    /// Raw selected exposure per item group (short head, long tail).
    pub item_exposure: [f64; ITEM_GROUP_COUNT],

    /// Aggregated DCG per user group.
    pub group_dcg: Vec<f64>,

    /// Aggregated NDCG per user group.
    pub group_ndcg: Vec<f64>,

    /// Aggregated precision per user group.
    pub group_precision: Vec<f64>,

    /// Aggregated recall per user group.
    pub group_recall: Vec<f64>,

    /// Objective value, penalties included.
    pub objective_value: f64,

    /// Relevance term alone: `Σ score·W`.
    pub relevance: f64,

    /// Wall-clock solve time in milliseconds.
    pub solve_time_ms: u64,
}

impl OptimizerResult {
    /// Total selected exposure across both item groups.
    pub fn total_exposure(&self) -> f64 {
        self.item_exposure.iter().sum()
    }

    /// `group_ndcg[0] − group_ndcg[1]`, if at least two user groups exist.
    pub fn ndcg_gap(&self) -> Option<f64> {
        first_minus_second(&self.group_ndcg)
    }

    /// `group_dcg[0] − group_dcg[1]`, if at least two user groups exist.
    pub fn dcg_gap(&self) -> Option<f64> {
        first_minus_second(&self.group_dcg)
    }
}

fn first_minus_second(values: &[f64]) -> Option<f64> {
    match values {
        [first, second, ..] => Some(first - second),
        _ => None,
    }
}
