//! Fairness modes and formulation strategies.

use crate::lp::SolverConfig;
use std::fmt;

/// Which fairness terms enter the objective, with their penalty weights.
///
/// # Examples
///
/// ```
/// use u_fairrank::fairness::FairnessMode;
///
/// let mode = FairnessMode::ConsumerProvider { user_epsilon: 0.01, item_epsilon: 0.5 };
/// assert_eq!(mode.code(), "CP");
/// assert_eq!(mode.user_epsilon(), Some(0.01));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FairnessMode {
    /// Relevance only.
    None,
    /// Relevance minus a user-group NDCG gap penalty.
    Consumer { user_epsilon: f64 },
    /// Relevance minus an item-group exposure gap penalty.
    Provider { item_epsilon: f64 },
    /// Both penalties.
    ConsumerProvider { user_epsilon: f64, item_epsilon: f64 },
}

impl FairnessMode {
    /// Short code: `N`, `C`, `P` or `CP`.
    pub fn code(&self) -> &'static str {
        match self {
            FairnessMode::None => "N",
            FairnessMode::Consumer { .. } => "C",
            FairnessMode::Provider { .. } => "P",
            FairnessMode::ConsumerProvider { .. } => "CP",
        }
    }

    /// Consumer-fairness weight, if the mode has one.
    pub fn user_epsilon(&self) -> Option<f64> {
        match *self {
            FairnessMode::Consumer { user_epsilon }
            | FairnessMode::ConsumerProvider { user_epsilon, .. } => Some(user_epsilon),
            _ => None,
        }
    }

    /// Provider-fairness weight, if the mode has one.
    pub fn item_epsilon(&self) -> Option<f64> {
        match *self {
            FairnessMode::Provider { item_epsilon }
            | FairnessMode::ConsumerProvider { item_epsilon, .. } => Some(item_epsilon),
            _ => None,
        }
    }

    /// Validates the penalty weights.
    pub fn validate(&self) -> Result<(), String> {
        for (label, epsilon) in [
            ("user_epsilon", self.user_epsilon()),
            ("item_epsilon", self.item_epsilon()),
        ] {
            if let Some(value) = epsilon {
                if !value.is_finite() || value < 0.0 {
                    return Err(format!(
                        "{label} must be finite and non-negative, got {value}"
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for FairnessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Position discount applied to hits in the per-user DCG row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiscountPolicy {
    /// Every hit counts 1 regardless of rank.
    #[default]
    Flat,
    /// A hit at 0-based `rank` counts `1 / log2(rank + 2)`.
    Logarithmic,
}

impl DiscountPolicy {
    /// Gain of a hit at 0-based `rank`.
    pub fn weight(&self, rank: usize) -> f64 {
        match self {
            DiscountPolicy::Flat => 1.0,
            DiscountPolicy::Logarithmic => 1.0 / ((rank + 2) as f64).log2(),
        }
    }

    /// DCG of a list of `k` hits, used to normalize DCG into NDCG.
    pub fn ideal_dcg(&self, k: usize) -> f64 {
        (0..k).map(|rank| self.weight(rank)).sum()
    }
}

/// How per-user values are combined into a per-group aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupAggregation {
    /// Unweighted sum over members.
    #[default]
    Sum,
    /// Sum scaled by the group's share of the population.
    Proportional,
    /// Sum divided by the group size.
    Mean,
}

impl GroupAggregation {
    /// Factor applied to the member sum of a group of `group_size` out of
    /// `population`.
    ///
    /// Fails for an empty group under [`GroupAggregation::Mean`] and for an
    /// empty population under [`GroupAggregation::Proportional`].
    pub fn weight(&self, group_size: usize, population: usize) -> Result<f64, String> {
        match self {
            GroupAggregation::Sum => Ok(1.0),
            GroupAggregation::Proportional => {
                if population == 0 {
                    return Err("proportional aggregation over an empty population".into());
                }
                Ok(group_size as f64 / population as f64)
            }
            GroupAggregation::Mean => {
                if group_size == 0 {
                    return Err("mean aggregation over an empty group".into());
                }
                Ok(1.0 / group_size as f64)
            }
        }
    }
}

/// Per-user quantity summed into the group term of the consumer gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GapSource {
    /// Unnormalized DCG.
    #[default]
    Dcg,
    /// DCG divided by the ideal DCG of `k` hits.
    Ndcg,
}

/// Orientation of the consumer-fairness gap term.
///
/// The objective subtracts `user_epsilon · gap`, so the orientation decides
/// which group the optimizer pushes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GapSign {
    /// `gap = G[0] − G[1]`
    #[default]
    FirstMinusSecond,
    /// `gap = G[1] − G[0]`
    SecondMinusFirst,
}

impl GapSign {
    /// Coefficients of (`G[0]`, `G[1]`) in the gap.
    pub fn coefficients(&self) -> (f64, f64) {
        match self {
            GapSign::FirstMinusSecond => (1.0, -1.0),
            GapSign::SecondMinusFirst => (-1.0, 1.0),
        }
    }
}

/// The shape of the LP: discount, gap source, aggregation rules, and gap
/// orientation.
///
/// `aggregation` combines member values into the user-group aggregates
/// (the consumer gap term and the reported NDCG, precision and recall).
/// `exposure_aggregation` weights the item-group exposures in the provider
/// term; reported exposure stays raw.
///
/// # Presets
///
/// ```
/// use u_fairrank::fairness::{
///     DiscountPolicy, FormulationConfig, GapSign, GapSource, GroupAggregation,
/// };
///
/// let f = FormulationConfig::dcg_change();
/// assert_eq!(f.discount, DiscountPolicy::Logarithmic);
/// assert_eq!(f.gap_source, GapSource::Ndcg);
/// assert_eq!(f.aggregation, GroupAggregation::Mean);
/// assert_eq!(f.exposure_aggregation, GroupAggregation::Sum);
/// assert_eq!(f.gap_sign, GapSign::FirstMinusSecond);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormulationConfig {
    pub discount: DiscountPolicy,
    pub gap_source: GapSource,
    pub aggregation: GroupAggregation,
    pub exposure_aggregation: GroupAggregation,
    pub gap_sign: GapSign,
}

impl FormulationConfig {
    /// Flat DCG summed per group, raw exposure, `G[0] − G[1]`.
    pub fn flat_sum() -> Self {
        Self {
            discount: DiscountPolicy::Flat,
            gap_source: GapSource::Dcg,
            aggregation: GroupAggregation::Sum,
            exposure_aggregation: GroupAggregation::Sum,
            gap_sign: GapSign::FirstMinusSecond,
        }
    }

    /// Log-discounted DCG and exposure both weighted by group share,
    /// `G[1] − G[0]`.
    pub fn proportional() -> Self {
        Self {
            discount: DiscountPolicy::Logarithmic,
            gap_source: GapSource::Dcg,
            aggregation: GroupAggregation::Proportional,
            exposure_aggregation: GroupAggregation::Proportional,
            gap_sign: GapSign::SecondMinusFirst,
        }
    }

    /// Mean log-discounted NDCG per group, raw exposure, `G[0] − G[1]`.
    pub fn dcg_change() -> Self {
        Self {
            discount: DiscountPolicy::Logarithmic,
            gap_source: GapSource::Ndcg,
            aggregation: GroupAggregation::Mean,
            exposure_aggregation: GroupAggregation::Sum,
            gap_sign: GapSign::FirstMinusSecond,
        }
    }

    pub fn with_discount(mut self, discount: DiscountPolicy) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_gap_source(mut self, gap_source: GapSource) -> Self {
        self.gap_source = gap_source;
        self
    }

    pub fn with_aggregation(mut self, aggregation: GroupAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_exposure_aggregation(mut self, aggregation: GroupAggregation) -> Self {
        self.exposure_aggregation = aggregation;
        self
    }

    pub fn with_gap_sign(mut self, gap_sign: GapSign) -> Self {
        self.gap_sign = gap_sign;
        self
    }
}

/// Configuration for the [`FairnessOptimizer`](super::FairnessOptimizer).
///
/// # Examples
///
/// ```
/// use u_fairrank::fairness::{FormulationConfig, OptimizerConfig};
///
/// let config = OptimizerConfig::default()
///     .with_k(5)
///     .with_formulation(FormulationConfig::proportional());
/// assert!(config.validate().is_ok());
/// assert!((config.ideal_dcg() - 2.948459118879392).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizerConfig {
    /// Final list length per user.
    pub k: usize,

    /// Discount, gap source, aggregation, and gap orientation.
    pub formulation: FormulationConfig,

    /// Emit explicit `W ≤ 1` rows in addition to the variable bounds.
    ///
    /// Redundant for the default backend, kept for backends that ignore
    /// variable upper bounds.
    pub explicit_upper_bounds: bool,

    /// Solver limits.
    pub solver: SolverConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            k: 10,
            formulation: FormulationConfig::default(),
            explicit_upper_bounds: true,
            solver: SolverConfig::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_formulation(mut self, formulation: FormulationConfig) -> Self {
        self.formulation = formulation;
        self
    }

    pub fn with_explicit_upper_bounds(mut self, enabled: bool) -> Self {
        self.explicit_upper_bounds = enabled;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Ideal DCG for the configured `k` and discount policy.
    pub fn ideal_dcg(&self) -> f64 {
        self.formulation.discount.ideal_dcg(self.k)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.k == 0 {
            return Err("k must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_dcg_derived_from_k() {
        assert!((DiscountPolicy::Flat.ideal_dcg(10) - 10.0).abs() < 1e-12);
        assert!((DiscountPolicy::Logarithmic.ideal_dcg(10) - 4.543559338088345).abs() < 1e-12);
    }

    #[test]
    fn test_ideal_dcg_follows_k() {
        let small = OptimizerConfig::default().with_k(3);
        let large = OptimizerConfig::default().with_k(4);
        assert!(large.ideal_dcg() > small.ideal_dcg());
    }

    #[test]
    fn test_log_weight() {
        assert!((DiscountPolicy::Logarithmic.weight(0) - 1.0).abs() < 1e-12);
        assert!((DiscountPolicy::Logarithmic.weight(2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_aggregation_weights() {
        assert_eq!(GroupAggregation::Sum.weight(3, 10), Ok(1.0));
        assert_eq!(GroupAggregation::Proportional.weight(3, 10), Ok(0.3));
        assert_eq!(GroupAggregation::Mean.weight(4, 10), Ok(0.25));
        assert!(GroupAggregation::Mean.weight(0, 10).is_err());
        assert!(GroupAggregation::Proportional.weight(0, 0).is_err());
    }

    #[test]
    fn test_gap_sign() {
        assert_eq!(GapSign::FirstMinusSecond.coefficients(), (1.0, -1.0));
        assert_eq!(GapSign::SecondMinusFirst.coefficients(), (-1.0, 1.0));
    }

    #[test]
    fn test_mode_codes_and_weights() {
        assert_eq!(FairnessMode::None.code(), "N");
        assert_eq!(FairnessMode::Consumer { user_epsilon: 0.1 }.item_epsilon(), None);
        assert_eq!(
            FairnessMode::Provider { item_epsilon: 0.2 }.item_epsilon(),
            Some(0.2)
        );
        assert_eq!(FairnessMode::None.to_string(), "N");
    }

    #[test]
    fn test_mode_validation() {
        assert!(FairnessMode::Consumer { user_epsilon: -1.0 }.validate().is_err());
        assert!(FairnessMode::Provider { item_epsilon: f64::NAN }.validate().is_err());
        assert!(FairnessMode::ConsumerProvider { user_epsilon: 0.0, item_epsilon: 0.0 }
            .validate()
            .is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(FormulationConfig::default(), FormulationConfig::flat_sum());
        let p = FormulationConfig::proportional();
        assert_eq!(p.gap_sign, GapSign::SecondMinusFirst);
        assert_eq!(p.aggregation, GroupAggregation::Proportional);
        assert_eq!(p.exposure_aggregation, GroupAggregation::Proportional);
        assert_eq!(p.gap_source, GapSource::Dcg);

        let flat = FormulationConfig::flat_sum();
        assert_eq!(flat.gap_source, GapSource::Dcg);
        assert_eq!(flat.exposure_aggregation, GroupAggregation::Sum);
        assert_eq!(
            FormulationConfig::dcg_change().exposure_aggregation,
            GroupAggregation::Sum
        );
    }

    #[test]
    fn test_validate_k() {
        assert!(OptimizerConfig::default().with_k(0).validate().is_err());
    }
}
