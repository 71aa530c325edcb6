//! Turns a solved selection matrix into per-user and per-group metrics.

use super::ranking::{catalog_coverage, ndcgk, novelty, precisionk, recallk, rounded_mean};
use crate::data::InteractionData;
use crate::error::{FairRankError, Result};
use crate::fairness::SelectionMatrix;
use crate::matrices::{CandidateSet, UserGroups};

/// Configuration for the [`MetricsEngine`].
///
/// # Examples
///
/// ```
/// use u_fairrank::metrics::MetricsConfig;
///
/// let config = MetricsConfig::default().with_k(5);
/// assert!(config.validate().is_ok());
/// assert!(MetricsConfig::default().with_inclusion_threshold(0.0).validate().is_err());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsConfig {
    /// List length used to normalize novelty.
    pub k: usize,

    /// A candidate is recommended when its selection value reaches this
    /// threshold. The default rounds fractional selections to the nearest
    /// integer.
    pub inclusion_threshold: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            k: 10,
            inclusion_threshold: 0.5,
        }
    }
}

impl MetricsConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_inclusion_threshold(mut self, threshold: f64) -> Self {
        self.inclusion_threshold = threshold;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.k == 0 {
            return Err("k must be at least 1".into());
        }
        if !(self.inclusion_threshold > 0.0 && self.inclusion_threshold <= 1.0) {
            return Err(format!(
                "inclusion_threshold must be in (0, 1], got {}",
                self.inclusion_threshold
            ));
        }
        Ok(())
    }
}

/// Metrics of one evaluated user.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserMetrics {
    pub user: usize,
    pub ndcg: f64,
    pub precision: f64,
    /// `None` when the user's ground truth is empty.
    pub recall: Option<f64>,
    pub novelty: f64,
    /// Recommended items, in rank order.
    pub predicted: Vec<usize>,
}

/// Mean metrics over a set of users.
///
/// Means are rounded to 5 decimals and are `None` when no user could be
/// evaluated; coverage is a percentage rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupMetrics {
    pub ndcg: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub novelty: Option<f64>,
    pub coverage: f64,
    /// Users that had ground truth and a non-empty recommendation.
    pub evaluated_users: usize,
    /// Users with ground truth left out because no candidate reached the
    /// inclusion threshold.
    pub skipped_users: usize,
}

/// Scores recommendations against held-out interactions.
///
/// The engine holds no state besides its configuration; identical inputs
/// always give identical outputs.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    config: MetricsConfig,
}

impl MetricsEngine {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Items recommended to `user`: candidates whose selection value reaches
    /// the inclusion threshold, in ascending rank order.
    pub fn predicted_items(
        &self,
        selection: &SelectionMatrix,
        candidates: &CandidateSet,
        user: usize,
    ) -> Vec<usize> {
        selection
            .row(user)
            .iter()
            .enumerate()
            .filter(|(_, &w)| w >= self.config.inclusion_threshold)
            .map(|(rank, _)| candidates.item(user, rank))
            .collect()
    }

    /// Recommended items of every user.
    pub fn predicted_lists(
        &self,
        selection: &SelectionMatrix,
        candidates: &CandidateSet,
    ) -> Vec<Vec<usize>> {
        (0..selection.total_users())
            .map(|user| self.predicted_items(selection, candidates, user))
            .collect()
    }

    /// Per-user metrics for `users`.
    ///
    /// Users without ground truth are skipped, as are users with no
    /// recommended item (logged at `warn`).
    pub fn evaluate_users(
        &self,
        users: &[usize],
        selection: &SelectionMatrix,
        candidates: &CandidateSet,
        data: &InteractionData,
    ) -> Result<Vec<UserMetrics>> {
        self.evaluate_users_counting(users, selection, candidates, data)
            .map(|(evaluated, _)| evaluated)
    }

    /// Per-user metrics plus the number of users skipped for an empty
    /// recommendation.
    fn evaluate_users_counting(
        &self,
        users: &[usize],
        selection: &SelectionMatrix,
        candidates: &CandidateSet,
        data: &InteractionData,
    ) -> Result<(Vec<UserMetrics>, usize)> {
        self.check_inputs(selection, candidates, data)?;

        let mut evaluated = Vec::with_capacity(users.len());
        let mut skipped = 0usize;
        for &user in users {
            if user >= selection.total_users() {
                return Err(FairRankError::DataInconsistency(format!(
                    "user {user} is outside the selection matrix ({} users)",
                    selection.total_users()
                )));
            }
            let Some(actual) = data.ground_truth(user) else {
                continue;
            };
            let predicted = self.predicted_items(selection, candidates, user);
            if predicted.is_empty() {
                log::warn!(
                    "user {user} has no selected item at threshold {}; skipped",
                    self.config.inclusion_threshold
                );
                skipped += 1;
                continue;
            }

            let recall = match recallk(actual, &predicted) {
                Ok(value) => Some(value),
                Err(FairRankError::ZeroDenominator(_)) => None,
                Err(e) => return Err(e),
            };
            evaluated.push(UserMetrics {
                user,
                ndcg: ndcgk(actual, &predicted)?,
                precision: precisionk(actual, &predicted)?,
                recall,
                novelty: novelty(
                    &predicted,
                    data.popularity(),
                    data.total_users(),
                    self.config.k,
                )?,
                predicted,
            });
        }
        Ok((evaluated, skipped))
    }

    /// Mean metrics and coverage over `users`.
    pub fn evaluate_group(
        &self,
        users: &[usize],
        selection: &SelectionMatrix,
        candidates: &CandidateSet,
        data: &InteractionData,
    ) -> Result<GroupMetrics> {
        let (per_user, skipped) =
            self.evaluate_users_counting(users, selection, candidates, data)?;
        summarize(&per_user, skipped, data.catalog_size())
    }

    /// Mean metrics over every user.
    pub fn evaluate_all(
        &self,
        selection: &SelectionMatrix,
        candidates: &CandidateSet,
        data: &InteractionData,
    ) -> Result<GroupMetrics> {
        let users: Vec<usize> = (0..selection.total_users()).collect();
        self.evaluate_group(&users, selection, candidates, data)
    }

    /// Mean metrics per user group, in group order.
    pub fn evaluate_groups(
        &self,
        groups: &UserGroups,
        selection: &SelectionMatrix,
        candidates: &CandidateSet,
        data: &InteractionData,
    ) -> Result<Vec<GroupMetrics>> {
        (0..groups.group_count())
            .map(|g| self.evaluate_group(&groups.members(g), selection, candidates, data))
            .collect()
    }

    fn check_inputs(
        &self,
        selection: &SelectionMatrix,
        candidates: &CandidateSet,
        data: &InteractionData,
    ) -> Result<()> {
        self.config.validate().map_err(FairRankError::InvalidConfig)?;
        if selection.total_users() != candidates.total_users()
            || selection.topk() != candidates.topk()
        {
            return Err(FairRankError::DataInconsistency(format!(
                "selection is {}x{}, candidates are {}x{}",
                selection.total_users(),
                selection.topk(),
                candidates.total_users(),
                candidates.topk()
            )));
        }
        if data.total_users() != selection.total_users() {
            return Err(FairRankError::DataInconsistency(format!(
                "interaction data covers {} users, selection covers {}",
                data.total_users(),
                selection.total_users()
            )));
        }
        Ok(())
    }
}

fn summarize(
    per_user: &[UserMetrics],
    skipped_users: usize,
    catalog_size: usize,
) -> Result<GroupMetrics> {
    let ndcg: Vec<f64> = per_user.iter().map(|m| m.ndcg).collect();
    let precision: Vec<f64> = per_user.iter().map(|m| m.precision).collect();
    let recall: Vec<f64> = per_user.iter().filter_map(|m| m.recall).collect();
    let novelty: Vec<f64> = per_user.iter().map(|m| m.novelty).collect();
    let lists: Vec<Vec<usize>> = per_user.iter().map(|m| m.predicted.clone()).collect();

    Ok(GroupMetrics {
        ndcg: rounded_mean(&ndcg),
        precision: rounded_mean(&precision),
        recall: rounded_mean(&recall),
        novelty: rounded_mean(&novelty),
        coverage: catalog_coverage(&lists, catalog_size)?,
        evaluated_users: per_user.len(),
        skipped_users,
    })
}
