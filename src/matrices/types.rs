//! Matrix value objects and the score-model capability.

use crate::error::{FairRankError, Result};
use ndarray::{Array2, Array3, ArrayView1};
use std::collections::HashMap;

/// Index of the short-head (popular) item group.
pub const SHORTHEAD: usize = 0;
/// Index of the long-tail (niche) item group.
pub const LONGTAIL: usize = 1;
/// Number of item groups the provider-fairness term compares.
pub const ITEM_GROUP_COUNT: usize = 2;

/// A trained recommendation model that can score every item for a user.
///
/// # Examples
///
/// ```ignore
/// struct Popularity { counts: Vec<f64> }
///
/// impl ScoreModel for Popularity {
///     fn name(&self) -> &str { "MostPop" }
///     fn score(&self, _user: usize) -> Vec<f64> { self.counts.clone() }
/// }
/// ```
pub trait ScoreModel: Send + Sync {
    /// Model name, used in logs and cell reports.
    fn name(&self) -> &str;

    /// Relevance score of every item for `user`, indexed by item.
    fn score(&self, user: usize) -> Vec<f64>;
}

/// A model whose scores were computed elsewhere and stored densely.
#[derive(Debug, Clone)]
pub struct PrecomputedScores {
    name: String,
    scores: Array2<f64>,
}

impl PrecomputedScores {
    pub fn new(name: impl Into<String>, scores: Array2<f64>) -> Self {
        Self {
            name: name.into(),
            scores,
        }
    }

    /// Builds from row vectors; every row must have the same length.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let users = rows.len();
        let items = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != items) {
            return Err(FairRankError::DataInconsistency(
                "score rows have different lengths".into(),
            ));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let scores = Array2::from_shape_vec((users, items), flat)
            .map_err(|e| FairRankError::DataInconsistency(e.to_string()))?;
        Ok(Self::new(name, scores))
    }
}

impl ScoreModel for PrecomputedScores {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, user: usize) -> Vec<f64> {
        self.scores.row(user).to_vec()
    }
}

/// Dense user × item score matrix `S`.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    values: Array2<f64>,
}

impl ScoreMatrix {
    /// Wraps a score array. Every value must be finite.
    pub fn new(values: Array2<f64>) -> Result<Self> {
        if let Some(((user, item), _)) = values.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(FairRankError::DataInconsistency(format!(
                "non-finite score for user {user}, item {item}"
            )));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn total_users(&self) -> usize {
        self.values.nrows()
    }

    pub fn total_items(&self) -> usize {
        self.values.ncols()
    }

    pub fn row(&self, user: usize) -> ArrayView1<'_, f64> {
        self.values.row(user)
    }
}

/// Per-user top-`topk` candidates `P`, in descending score order.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    items: Array2<usize>,
    scores: Array2<f64>,
}

impl CandidateSet {
    pub(crate) fn new(items: Array2<usize>, scores: Array2<f64>) -> Self {
        Self { items, scores }
    }

    pub fn total_users(&self) -> usize {
        self.items.nrows()
    }

    pub fn topk(&self) -> usize {
        self.items.ncols()
    }

    /// Item index at `rank` for `user`.
    pub fn item(&self, user: usize, rank: usize) -> usize {
        self.items[[user, rank]]
    }

    /// Score of the candidate at `rank` for `user`.
    pub fn score(&self, user: usize, rank: usize) -> f64 {
        self.scores[[user, rank]]
    }

    /// All candidates of `user`, best first.
    pub fn items_of(&self, user: usize) -> ArrayView1<'_, usize> {
        self.items.row(user)
    }

    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }
}

/// User × rank indicator `Ahelp`: whether the candidate is one of the
/// user's training interactions.
#[derive(Debug, Clone)]
pub struct HitMatrix {
    hits: Array2<bool>,
}

impl HitMatrix {
    pub(crate) fn new(hits: Array2<bool>) -> Self {
        Self { hits }
    }

    pub fn get(&self, user: usize, rank: usize) -> bool {
        self.hits[[user, rank]]
    }

    /// The indicator as an LP coefficient (0.0 or 1.0).
    pub fn coefficient(&self, user: usize, rank: usize) -> f64 {
        if self.get(user, rank) {
            1.0
        } else {
            0.0
        }
    }

    /// Number of hits among the candidates of `user`.
    pub fn hit_count(&self, user: usize) -> usize {
        self.hits.row(user).iter().filter(|&&hit| hit).count()
    }

    pub fn total_users(&self) -> usize {
        self.hits.nrows()
    }

    pub fn topk(&self) -> usize {
        self.hits.ncols()
    }
}

/// User × rank × item-group one-hot indicator `Ihelp`.
#[derive(Debug, Clone)]
pub struct GroupIndicator {
    indicator: Array3<bool>,
}

impl GroupIndicator {
    pub(crate) fn new(indicator: Array3<bool>) -> Self {
        Self { indicator }
    }

    pub fn get(&self, user: usize, rank: usize, group: usize) -> bool {
        self.indicator[[user, rank, group]]
    }

    /// Group of the candidate at (`user`, `rank`); `None` for ungrouped items.
    pub fn group_of(&self, user: usize, rank: usize) -> Option<usize> {
        (0..self.group_count()).find(|&g| self.get(user, rank, g))
    }

    pub fn total_users(&self) -> usize {
        self.indicator.dim().0
    }

    pub fn topk(&self) -> usize {
        self.indicator.dim().1
    }

    pub fn group_count(&self) -> usize {
        self.indicator.dim().2
    }
}

/// User × user-group one-hot membership matrix `U`.
#[derive(Debug, Clone)]
pub struct UserGroups {
    membership: Array2<bool>,
    sizes: Vec<usize>,
}

impl UserGroups {
    /// Builds `U` from one member list per group (e.g. active, inactive).
    ///
    /// Users may belong to no group, but never to two.
    pub fn from_members(total_users: usize, groups: &[Vec<usize>]) -> Result<Self> {
        let mut membership = Array2::from_elem((total_users, groups.len()), false);
        let mut owner: HashMap<usize, usize> = HashMap::new();

        for (group, members) in groups.iter().enumerate() {
            for &user in members {
                if user >= total_users {
                    return Err(FairRankError::DataInconsistency(format!(
                        "user group {group} references user {user} but only {total_users} users exist"
                    )));
                }
                match owner.get(&user) {
                    Some(&other) if other != group => {
                        return Err(FairRankError::DataInconsistency(format!(
                            "user {user} is listed in user groups {other} and {group}"
                        )));
                    }
                    Some(_) => {}
                    None => {
                        owner.insert(user, group);
                        membership[[user, group]] = true;
                    }
                }
            }
        }

        let sizes = (0..groups.len())
            .map(|g| membership.column(g).iter().filter(|&&m| m).count())
            .collect();

        Ok(Self { membership, sizes })
    }

    pub fn total_users(&self) -> usize {
        self.membership.nrows()
    }

    pub fn group_count(&self) -> usize {
        self.membership.ncols()
    }

    pub fn contains(&self, user: usize, group: usize) -> bool {
        self.membership[[user, group]]
    }

    pub fn size(&self, group: usize) -> usize {
        self.sizes[group]
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Members of `group` in ascending user order.
    pub fn members(&self, group: usize) -> Vec<usize> {
        self.membership
            .column(group)
            .iter()
            .enumerate()
            .filter_map(|(user, &m)| m.then_some(user))
            .collect()
    }
}

/// Short-head / long-tail item group membership.
#[derive(Debug, Clone)]
pub struct ItemGroups {
    total_items: usize,
    membership: HashMap<usize, usize>,
    sizes: [usize; ITEM_GROUP_COUNT],
}

impl ItemGroups {
    /// Builds the two item groups. Items may belong to neither group, but
    /// never to both.
    pub fn new<S, L>(total_items: usize, shorthead: S, longtail: L) -> Result<Self>
    where
        S: IntoIterator<Item = usize>,
        L: IntoIterator<Item = usize>,
    {
        let mut membership: HashMap<usize, usize> = HashMap::new();
        let lists: [Vec<usize>; ITEM_GROUP_COUNT] = [
            shorthead.into_iter().collect(),
            longtail.into_iter().collect(),
        ];

        for (group, items) in lists.iter().enumerate() {
            for &item in items {
                if item >= total_items {
                    return Err(FairRankError::DataInconsistency(format!(
                        "item group {group} references item {item} but only {total_items} items exist"
                    )));
                }
                if let Some(&other) = membership.get(&item) {
                    if other != group {
                        return Err(FairRankError::DataInconsistency(format!(
                            "item {item} is listed in item groups {other} and {group}"
                        )));
                    }
                }
                membership.insert(item, group);
            }
        }

        let mut sizes = [0usize; ITEM_GROUP_COUNT];
        for &group in membership.values() {
            sizes[group] += 1;
        }

        Ok(Self {
            total_items,
            membership,
            sizes,
        })
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    /// Group of `item`; `None` when the item is in neither group.
    pub fn group_of(&self, item: usize) -> Option<usize> {
        self.membership.get(&item).copied()
    }

    pub fn size(&self, group: usize) -> usize {
        self.sizes[group]
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }
}

/// Everything the optimizer needs from one (dataset, model) pair.
#[derive(Debug, Clone)]
pub struct RankingMatrices {
    /// Name of the model that produced the scores.
    pub model_name: String,
    /// Full score matrix `S`.
    pub scores: ScoreMatrix,
    /// Top-`topk` candidates `P` with their scores.
    pub candidates: CandidateSet,
    /// Training-hit indicator `Ahelp`.
    pub hits: HitMatrix,
    /// Item-group indicator `Ihelp`.
    pub item_indicator: GroupIndicator,
}

impl RankingMatrices {
    pub fn total_users(&self) -> usize {
        self.candidates.total_users()
    }

    pub fn topk(&self) -> usize {
        self.candidates.topk()
    }
}
