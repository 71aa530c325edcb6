//! Top-k ranking metrics over item lists.
//!
//! Every function is pure and generic over the item id type, so the same
//! code scores dense indices and raw string ids.

use crate::error::{FairRankError, Result};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Normalized discounted cumulative gain of `predicted` against `actual`.
///
/// The first position is undiscounted; position `i ≥ 1` is discounted by
/// `1 / ln(i + 1)`. The ideal DCG assumes every predicted position is a hit,
/// so a list made only of hits scores exactly 1.
///
/// # Errors
///
/// [`FairRankError::ZeroDenominator`] when `predicted` is empty.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use u_fairrank::metrics::ndcgk;
///
/// let actual: HashSet<u32> = [1, 2].into_iter().collect();
/// assert_eq!(ndcgk(&actual, &[1, 2]).unwrap(), 1.0);
/// assert_eq!(ndcgk(&actual, &[7, 8]).unwrap(), 0.0);
/// ```
pub fn ndcgk<T: Eq + Hash>(actual: &HashSet<T>, predicted: &[T]) -> Result<f64> {
    let (first, rest) = predicted
        .split_first()
        .ok_or_else(|| FairRankError::ZeroDenominator("ndcg of an empty predicted list".into()))?;

    let mut dcg = if actual.contains(first) { 1.0 } else { 0.0 };
    let mut idcg = 1.0;
    for (i, item) in rest.iter().enumerate() {
        let gain = 1.0 / ((i + 2) as f64).ln();
        if actual.contains(item) {
            dcg += gain;
        }
        idcg += gain;
    }
    Ok(dcg / idcg)
}

/// Share of distinct predicted items that are relevant, over the list length.
///
/// # Errors
///
/// [`FairRankError::ZeroDenominator`] when `predicted` is empty.
pub fn precisionk<T: Eq + Hash>(actual: &HashSet<T>, predicted: &[T]) -> Result<f64> {
    if predicted.is_empty() {
        return Err(FairRankError::ZeroDenominator(
            "precision of an empty predicted list".into(),
        ));
    }
    Ok(overlap(actual, predicted) as f64 / predicted.len() as f64)
}

/// Share of relevant items that were predicted.
///
/// # Errors
///
/// [`FairRankError::ZeroDenominator`] when `actual` is empty.
pub fn recallk<T: Eq + Hash>(actual: &HashSet<T>, predicted: &[T]) -> Result<f64> {
    if actual.is_empty() {
        return Err(FairRankError::ZeroDenominator(
            "recall against an empty relevant set".into(),
        ));
    }
    Ok(overlap(actual, predicted) as f64 / actual.len() as f64)
}

fn overlap<T: Eq + Hash>(actual: &HashSet<T>, predicted: &[T]) -> usize {
    let distinct: HashSet<&T> = predicted.iter().collect();
    distinct.into_iter().filter(|item| actual.contains(*item)).count()
}

/// Self-information novelty of a list.
///
/// Sums `−log2(popularity[item] / total_users)` over `predicted` and
/// divides by `k`. Items missing from `popularity` contribute 0.
///
/// # Errors
///
/// [`FairRankError::ZeroDenominator`] when `k` or `total_users` is zero.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use u_fairrank::metrics::novelty;
///
/// let popularity = HashMap::from([("A", 10), ("B", 5)]);
/// let value = novelty(&["A", "B"], &popularity, 100, 2).unwrap();
/// assert!((value - 3.82193).abs() < 1e-5);
/// ```
pub fn novelty<T: Eq + Hash>(
    predicted: &[T],
    popularity: &HashMap<T, u64>,
    total_users: usize,
    k: usize,
) -> Result<f64> {
    if k == 0 {
        return Err(FairRankError::ZeroDenominator("novelty with k = 0".into()));
    }
    if total_users == 0 {
        return Err(FairRankError::ZeroDenominator(
            "novelty over zero users".into(),
        ));
    }

    let self_information: f64 = predicted
        .iter()
        .map(|item| match popularity.get(item) {
            Some(&count) => -(count as f64 / total_users as f64).log2(),
            None => 0.0,
        })
        .sum();
    Ok(self_information / k as f64)
}

/// Percentage of the catalog that appears in at least one list, rounded to
/// 2 decimals.
///
/// # Errors
///
/// [`FairRankError::ZeroDenominator`] when `catalog_size` is zero.
pub fn catalog_coverage<T: Eq + Hash>(lists: &[Vec<T>], catalog_size: usize) -> Result<f64> {
    if catalog_size == 0 {
        return Err(FairRankError::ZeroDenominator(
            "coverage of an empty catalog".into(),
        ));
    }
    let distinct: HashSet<&T> = lists.iter().flatten().collect();
    Ok(round_to(
        distinct.len() as f64 / catalog_size as f64 * 100.0,
        2,
    ))
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Arithmetic mean rounded to 5 decimals; `None` for no values.
pub fn rounded_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(round_to(values.iter().sum::<f64>() / values.len() as f64, 5))
}
