//! Interaction data and raw-id remapping.
//!
//! The builder, optimizer, and metrics work on dense `usize` indices.
//! [`IdMap`] turns the raw string ids found in interaction and group files
//! into those indices; [`InteractionData`] holds the per-dataset training
//! interactions, item popularity, and held-out ground truth.

use crate::error::{FairRankError, Result};
use std::collections::{HashMap, HashSet};

/// Mapping from raw string ids to dense indices.
///
/// # Examples
///
/// ```
/// use u_fairrank::data::IdMap;
///
/// let users = IdMap::from_ids("user", ["u7", "u3", "u9"]);
/// assert_eq!(users.resolve("u3").unwrap(), 1);
/// assert!(users.resolve("u42").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct IdMap {
    kind: &'static str,
    index: HashMap<String, usize>,
}

impl IdMap {
    /// Creates an empty map. `kind` names the id space in error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            index: HashMap::new(),
        }
    }

    /// Builds a map assigning indices in first-seen order.
    pub fn from_ids<I, S>(kind: &'static str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::new(kind);
        for id in ids {
            map.insert(id);
        }
        map
    }

    /// Returns the index of `raw`, assigning the next free one if unseen.
    pub fn insert(&mut self, raw: impl Into<String>) -> usize {
        let next = self.index.len();
        *self.index.entry(raw.into()).or_insert(next)
    }

    /// Resolves a raw id that must already be known.
    pub fn resolve(&self, raw: &str) -> Result<usize> {
        self.index.get(raw).copied().ok_or_else(|| {
            FairRankError::DataInconsistency(format!("unknown {} id '{raw}'", self.kind))
        })
    }

    /// Resolves every non-blank line of a group listing.
    pub fn resolve_lines(&self, text: &str) -> Result<Vec<usize>> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| self.resolve(line))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Per-dataset interaction data in dense index space.
#[derive(Debug, Clone)]
pub struct InteractionData {
    total_users: usize,
    total_items: usize,
    training: Vec<HashSet<usize>>,
    popularity: HashMap<usize, u64>,
    ground_truth: HashMap<usize, HashSet<usize>>,
}

impl InteractionData {
    /// Builds the data from (user, item) pairs.
    ///
    /// Popularity counts every training pair, so repeated interactions
    /// count more than once. Users without test pairs are absent from the
    /// ground truth rather than mapped to an empty set.
    pub fn from_pairs(
        total_users: usize,
        total_items: usize,
        train: &[(usize, usize)],
        test: &[(usize, usize)],
    ) -> Result<Self> {
        let mut training = vec![HashSet::new(); total_users];
        let mut popularity: HashMap<usize, u64> = HashMap::new();
        for &(user, item) in train {
            check_pair(user, item, total_users, total_items, "training")?;
            training[user].insert(item);
            *popularity.entry(item).or_insert(0) += 1;
        }

        let mut ground_truth: HashMap<usize, HashSet<usize>> = HashMap::new();
        for &(user, item) in test {
            check_pair(user, item, total_users, total_items, "test")?;
            ground_truth.entry(user).or_default().insert(item);
        }

        Ok(Self {
            total_users,
            total_items,
            training,
            popularity,
            ground_truth,
        })
    }

    pub fn total_users(&self) -> usize {
        self.total_users
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    /// Training interactions of `user`.
    pub fn training(&self, user: usize) -> &HashSet<usize> {
        &self.training[user]
    }

    /// Training interactions of every user, indexed by user.
    pub fn training_sets(&self) -> &[HashSet<usize>] {
        &self.training
    }

    /// Training interaction count per item. Items never interacted with
    /// are absent.
    pub fn popularity(&self) -> &HashMap<usize, u64> {
        &self.popularity
    }

    /// Held-out items of `user`, if the user has any.
    pub fn ground_truth(&self, user: usize) -> Option<&HashSet<usize>> {
        self.ground_truth.get(&user)
    }

    /// Number of catalog items, i.e. items seen in training.
    pub fn catalog_size(&self) -> usize {
        self.popularity.len()
    }
}

fn check_pair(
    user: usize,
    item: usize,
    total_users: usize,
    total_items: usize,
    split: &str,
) -> Result<()> {
    if user >= total_users {
        return Err(FairRankError::DataInconsistency(format!(
            "{split} pair references user {user} but only {total_users} users exist"
        )));
    }
    if item >= total_items {
        return Err(FairRankError::DataInconsistency(format!(
            "{split} pair references item {item} but only {total_items} items exist"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_map_first_seen_order() {
        let mut map = IdMap::new("item");
        assert_eq!(map.insert("b"), 0);
        assert_eq!(map.insert("a"), 1);
        assert_eq!(map.insert("b"), 0);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_resolve_lines() {
        let map = IdMap::from_ids("user", ["10", "20", "30"]);
        let ids = map.resolve_lines("30\n 10 \n\n").unwrap();
        assert_eq!(ids, vec![2, 0]);
    }

    #[test]
    fn test_resolve_unknown_id() {
        let map = IdMap::from_ids("user", ["10"]);
        let err = map.resolve_lines("10\n99\n").unwrap_err();
        assert!(matches!(err, FairRankError::DataInconsistency(ref m) if m.contains("'99'")));
    }

    #[test]
    fn test_from_pairs() {
        let data =
            InteractionData::from_pairs(3, 4, &[(0, 1), (0, 2), (1, 1), (1, 1)], &[(2, 3)])
                .unwrap();

        assert_eq!(data.training(0).len(), 2);
        assert!(data.training(2).is_empty());
        assert_eq!(data.popularity()[&1], 3);
        assert_eq!(data.catalog_size(), 2);
        assert!(data.ground_truth(0).is_none());
        assert!(data.ground_truth(2).unwrap().contains(&3));
    }

    #[test]
    fn test_from_pairs_rejects_unknown_ids() {
        assert!(InteractionData::from_pairs(2, 2, &[(2, 0)], &[]).is_err());
        assert!(InteractionData::from_pairs(2, 2, &[], &[(0, 5)]).is_err());
    }
}
