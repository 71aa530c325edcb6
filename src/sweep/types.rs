//! Sweep inputs, cell identities, and report rows.

use crate::data::InteractionData;
use crate::error::{FairRankError, Result};
use crate::fairness::{FairnessMode, FairnessProblem};
use crate::matrices::{ItemGroups, RankingMatrices, UserGroups, ITEM_GROUP_COUNT};
use crate::metrics::GroupMetrics;
use std::fmt;
use thiserror::Error;

/// Formats a penalty weight with 7 decimals, or `-` when absent.
///
/// # Examples
///
/// ```
/// use u_fairrank::sweep::format_epsilon;
///
/// assert_eq!(format_epsilon(Some(0.01)), "0.0100000");
/// assert_eq!(format_epsilon(None), "-");
/// ```
pub fn format_epsilon(epsilon: Option<f64>) -> String {
    match epsilon {
        Some(value) => format!("{value:.7}"),
        None => "-".to_string(),
    }
}

/// Everything one sweep shares across its cells: the built matrices and
/// the names that identify them in reports.
#[derive(Debug, Clone, Copy)]
pub struct SweepContext<'a> {
    pub dataset: &'a str,
    pub user_split: &'a str,
    pub item_split: &'a str,
    pub problem: FairnessProblem<'a>,
}

impl<'a> SweepContext<'a> {
    /// Checks that the inputs describe one consistent problem.
    pub fn new(
        dataset: &'a str,
        user_split: &'a str,
        item_split: &'a str,
        matrices: &'a RankingMatrices,
        user_groups: &'a UserGroups,
        item_groups: &'a ItemGroups,
        data: &'a InteractionData,
    ) -> Result<Self> {
        Ok(Self {
            dataset,
            user_split,
            item_split,
            problem: FairnessProblem::new(matrices, user_groups, item_groups, data)?,
        })
    }

    /// Identity of the cell running `mode` in this context.
    pub fn cell(&self, mode: FairnessMode) -> CellKey {
        CellKey {
            dataset: self.dataset.to_string(),
            model: self.problem.matrices.model_name.clone(),
            user_split: self.user_split.to_string(),
            item_split: self.item_split.to_string(),
            mode,
        }
    }
}

/// Identity of one sweep cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellKey {
    pub dataset: String,
    pub model: String,
    pub user_split: String,
    pub item_split: String,
    pub mode: FairnessMode,
}

impl CellKey {
    pub fn user_epsilon(&self) -> Option<f64> {
        self.mode.user_epsilon()
    }

    pub fn item_epsilon(&self) -> Option<f64> {
        self.mode.item_epsilon()
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dataset={} model={} users={} items={} mode={} uepsilon={} iepsilon={}",
            self.dataset,
            self.model,
            self.user_split,
            self.item_split,
            self.mode,
            format_epsilon(self.user_epsilon()),
            format_epsilon(self.item_epsilon())
        )
    }
}

/// A failure tagged with the cell that raised it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cell [{cell}] failed: {source}")]
pub struct CellError {
    pub cell: CellKey,
    pub source: FairRankError,
}

/// Result row of one cell.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellReport {
    pub key: CellKey,

    /// Metrics over all users.
    pub all: GroupMetrics,

    /// Metrics per user group, in group order.
    pub groups: Vec<GroupMetrics>,

    /// Selected exposure per item group (short head, long tail).
    pub item_exposure: [f64; ITEM_GROUP_COUNT],

    /// `users · k`, the exposure a feasible selection must add up to.
    pub expected_exposure: f64,

    pub objective_value: f64,
    pub relevance: f64,
    pub solve_time_ms: u64,
}

impl CellReport {
    pub fn total_exposure(&self) -> f64 {
        self.item_exposure.iter().sum()
    }

    /// Whether the item-group exposure adds up to `users · k`.
    ///
    /// Only holds when every candidate belongs to an item group.
    pub fn exposure_balanced(&self, tolerance: f64) -> bool {
        (self.total_exposure() - self.expected_exposure).abs() <= tolerance
    }

    /// The balance check as printed in result tables, e.g. `30==30`.
    pub fn exposure_check(&self) -> String {
        format!("{}=={}", self.expected_exposure, self.total_exposure())
    }
}

/// Outcome of a whole sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Successful cells, in cell order.
    pub reports: Vec<CellReport>,
    /// Failed cells, in cell order. Empty under fail-fast.
    pub failures: Vec<CellError>,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.reports.len() + self.failures.len()
    }
}
