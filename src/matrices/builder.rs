//! Candidate-matrix construction.

use super::types::{
    CandidateSet, GroupIndicator, HitMatrix, ItemGroups, RankingMatrices, ScoreMatrix, ScoreModel,
    ITEM_GROUP_COUNT,
};
use crate::data::InteractionData;
use crate::error::{FairRankError, Result};
use ndarray::{Array2, Array3};
use rayon::prelude::*;
use std::collections::HashSet;

/// Configuration for [`RankingMatrixBuilder`].
///
/// # Examples
///
/// ```
/// use u_fairrank::matrices::BuilderConfig;
///
/// let config = BuilderConfig::default().with_topk(20).with_parallel(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuilderConfig {
    /// Candidate pool size per user.
    pub topk: usize,

    /// Whether to score users in parallel using rayon.
    pub parallel: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            topk: 50,
            parallel: true,
        }
    }
}

impl BuilderConfig {
    pub fn with_topk(mut self, topk: usize) -> Self {
        self.topk = topk;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.topk == 0 {
            return Err("topk must be at least 1".into());
        }
        Ok(())
    }
}

/// Scores every user with `model` into a dense `total_users × total_items`
/// matrix.
///
/// Each row must have exactly `total_items` finite entries.
pub fn build_scores<M: ScoreModel + ?Sized>(
    model: &M,
    total_users: usize,
    total_items: usize,
    parallel: bool,
) -> Result<ScoreMatrix> {
    let score_user = |user: usize| -> Result<Vec<f64>> {
        let row = model.score(user);
        if row.len() != total_items {
            return Err(FairRankError::DataInconsistency(format!(
                "model '{}' returned {} scores for user {user}, expected {total_items}",
                model.name(),
                row.len()
            )));
        }
        Ok(row)
    };

    let rows: Vec<Vec<f64>> = if parallel {
        (0..total_users)
            .into_par_iter()
            .map(score_user)
            .collect::<Result<_>>()?
    } else {
        (0..total_users).map(score_user).collect::<Result<_>>()?
    };

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    let values = Array2::from_shape_vec((total_users, total_items), flat)
        .map_err(|e| FairRankError::DataInconsistency(e.to_string()))?;

    log::debug!(
        "scored {total_users} users x {total_items} items with '{}'",
        model.name()
    );
    ScoreMatrix::new(values)
}

/// Keeps the `topk` best-scored items of every user, best first.
///
/// Equal scores keep ascending item order.
pub fn build_candidates(scores: &ScoreMatrix, topk: usize) -> Result<CandidateSet> {
    let users = scores.total_users();
    let items = scores.total_items();
    if topk == 0 || topk > items {
        return Err(FairRankError::InvalidConfig(format!(
            "topk must be in 1..={items}, got {topk}"
        )));
    }

    let mut candidate_items = Vec::with_capacity(users * topk);
    let mut candidate_scores = Vec::with_capacity(users * topk);
    let mut order: Vec<usize> = Vec::with_capacity(items);

    for user in 0..users {
        let row = scores.row(user);
        order.clear();
        order.extend(0..items);
        // sort_by is stable: ties stay in item order
        order.sort_by(|&a, &b| row[b].total_cmp(&row[a]));
        for &item in &order[..topk] {
            candidate_items.push(item);
            candidate_scores.push(row[item]);
        }
    }

    let shape = (users, topk);
    let item_matrix = Array2::from_shape_vec(shape, candidate_items)
        .map_err(|e| FairRankError::DataInconsistency(e.to_string()))?;
    let score_matrix = Array2::from_shape_vec(shape, candidate_scores)
        .map_err(|e| FairRankError::DataInconsistency(e.to_string()))?;
    Ok(CandidateSet::new(item_matrix, score_matrix))
}

/// Marks every candidate that appears in its user's training interactions.
pub fn build_hit_matrix(
    candidates: &CandidateSet,
    training: &[HashSet<usize>],
) -> Result<HitMatrix> {
    let users = candidates.total_users();
    if training.len() != users {
        return Err(FairRankError::DataInconsistency(format!(
            "training interactions cover {} users, candidates cover {users}",
            training.len()
        )));
    }

    let hits = Array2::from_shape_fn((users, candidates.topk()), |(user, rank)| {
        training[user].contains(&candidates.item(user, rank))
    });
    Ok(HitMatrix::new(hits))
}

/// One-hot encodes the item group of every candidate.
///
/// Candidates outside both groups get an all-zero row and therefore never
/// count toward any group's exposure.
pub fn build_group_indicator(candidates: &CandidateSet, item_groups: &ItemGroups) -> GroupIndicator {
    let shape = (candidates.total_users(), candidates.topk(), ITEM_GROUP_COUNT);
    let indicator = Array3::from_shape_fn(shape, |(user, rank, group)| {
        item_groups.group_of(candidates.item(user, rank)) == Some(group)
    });
    GroupIndicator::new(indicator)
}

/// Builds all candidate matrices for one (dataset, model) pair.
///
/// # Usage
///
/// ```ignore
/// let builder = RankingMatrixBuilder::new(BuilderConfig::default().with_topk(50));
/// let matrices = builder.build(&model, &data, &item_groups)?;
/// ```
pub struct RankingMatrixBuilder {
    config: BuilderConfig,
}

impl RankingMatrixBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Runs score → candidates → hits → item indicator.
    pub fn build<M: ScoreModel + ?Sized>(
        &self,
        model: &M,
        data: &InteractionData,
        item_groups: &ItemGroups,
    ) -> Result<RankingMatrices> {
        self.config.validate().map_err(FairRankError::InvalidConfig)?;
        if item_groups.total_items() != data.total_items() {
            return Err(FairRankError::DataInconsistency(format!(
                "item groups cover {} items, interaction data covers {}",
                item_groups.total_items(),
                data.total_items()
            )));
        }

        let scores = build_scores(
            model,
            data.total_users(),
            data.total_items(),
            self.config.parallel,
        )?;
        let candidates = build_candidates(&scores, self.config.topk)?;
        let hits = build_hit_matrix(&candidates, data.training_sets())?;
        let item_indicator = build_group_indicator(&candidates, item_groups);

        log::info!(
            "built ranking matrices for '{}': {} users, topk {}",
            model.name(),
            candidates.total_users(),
            candidates.topk()
        );

        Ok(RankingMatrices {
            model_name: model.name().to_string(),
            scores,
            candidates,
            hits,
            item_indicator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrices::{PrecomputedScores, LONGTAIL, SHORTHEAD};

    fn model() -> PrecomputedScores {
        PrecomputedScores::from_rows(
            "fixed",
            vec![
                vec![0.1, 0.9, 0.5, 0.5],
                vec![0.4, 0.3, 0.2, 0.8],
            ],
        )
        .unwrap()
    }

    struct ShortModel;

    impl ScoreModel for ShortModel {
        fn name(&self) -> &str {
            "short"
        }
        fn score(&self, _user: usize) -> Vec<f64> {
            vec![0.0; 2]
        }
    }

    #[test]
    fn test_candidates_descending_with_stable_ties() {
        let scores = build_scores(&model(), 2, 4, false).unwrap();
        let candidates = build_candidates(&scores, 3).unwrap();

        // items 2 and 3 tie at 0.5: lower index first
        assert_eq!(candidates.items_of(0).to_vec(), vec![1, 2, 3]);
        assert_eq!(candidates.items_of(1).to_vec(), vec![3, 0, 1]);
        assert!((candidates.score(1, 0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = build_scores(&model(), 2, 4, false).unwrap();
        let parallel = build_scores(&model(), 2, 4, true).unwrap();
        assert_eq!(sequential.values(), parallel.values());
    }

    #[test]
    fn test_wrong_score_length() {
        let err = build_scores(&ShortModel, 1, 4, false).unwrap_err();
        assert!(matches!(err, FairRankError::DataInconsistency(_)));
    }

    #[test]
    fn test_topk_out_of_range() {
        let scores = build_scores(&model(), 2, 4, false).unwrap();
        assert!(build_candidates(&scores, 0).is_err());
        assert!(build_candidates(&scores, 5).is_err());
    }

    #[test]
    fn test_hit_matrix() {
        let scores = build_scores(&model(), 2, 4, false).unwrap();
        let candidates = build_candidates(&scores, 3).unwrap();
        let training = vec![HashSet::from([2]), HashSet::from([3, 1])];
        let hits = build_hit_matrix(&candidates, &training).unwrap();

        assert!(!hits.get(0, 0) && hits.get(0, 1) && !hits.get(0, 2));
        assert_eq!(hits.hit_count(1), 2);
        assert!(build_hit_matrix(&candidates, &training[..1]).is_err());
    }

    #[test]
    fn test_group_indicator_leaves_ungrouped_rows_empty() {
        let scores = build_scores(&model(), 2, 4, false).unwrap();
        let candidates = build_candidates(&scores, 3).unwrap();
        let groups = ItemGroups::new(4, [1], [3]).unwrap();
        let indicator = build_group_indicator(&candidates, &groups);

        assert_eq!(indicator.group_of(0, 0), Some(SHORTHEAD));
        assert_eq!(indicator.group_of(0, 1), None);
        assert_eq!(indicator.group_of(0, 2), Some(LONGTAIL));
        assert!(!indicator.get(0, 1, SHORTHEAD) && !indicator.get(0, 1, LONGTAIL));
    }

    #[test]
    fn test_builder_end_to_end() {
        let data = InteractionData::from_pairs(2, 4, &[(0, 1), (1, 0)], &[]).unwrap();
        let groups = ItemGroups::new(4, [0, 1], [2, 3]).unwrap();
        let builder = RankingMatrixBuilder::new(BuilderConfig::default().with_topk(2));
        let matrices = builder.build(&model(), &data, &groups).unwrap();

        assert_eq!(matrices.model_name, "fixed");
        assert_eq!(matrices.topk(), 2);
        assert!(matrices.hits.get(0, 0));
        assert!(matrices.hits.get(1, 1));
    }
}
