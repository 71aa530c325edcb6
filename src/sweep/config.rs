//! Sweep configuration and cell expansion.

use crate::fairness::FairnessMode;
use std::fmt;
use std::str::FromStr;

/// Kind of fairness mode, without penalty weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FairnessCategory {
    #[cfg_attr(feature = "serde", serde(rename = "N"))]
    None,
    #[cfg_attr(feature = "serde", serde(rename = "C"))]
    Consumer,
    #[cfg_attr(feature = "serde", serde(rename = "P"))]
    Provider,
    #[cfg_attr(feature = "serde", serde(rename = "CP"))]
    ConsumerProvider,
}

impl FairnessCategory {
    pub const ALL: [FairnessCategory; 4] = [
        FairnessCategory::None,
        FairnessCategory::Consumer,
        FairnessCategory::Provider,
        FairnessCategory::ConsumerProvider,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            FairnessCategory::None => "N",
            FairnessCategory::Consumer => "C",
            FairnessCategory::Provider => "P",
            FairnessCategory::ConsumerProvider => "CP",
        }
    }

    fn uses_user_epsilon(&self) -> bool {
        matches!(
            self,
            FairnessCategory::Consumer | FairnessCategory::ConsumerProvider
        )
    }

    fn uses_item_epsilon(&self) -> bool {
        matches!(
            self,
            FairnessCategory::Provider | FairnessCategory::ConsumerProvider
        )
    }
}

impl fmt::Display for FairnessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FairnessCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "N" => Ok(FairnessCategory::None),
            "C" => Ok(FairnessCategory::Consumer),
            "P" => Ok(FairnessCategory::Provider),
            "CP" => Ok(FairnessCategory::ConsumerProvider),
            other => Err(format!("unknown fairness category '{other}'")),
        }
    }
}

/// What to do when a cell fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorPolicy {
    /// Stop at the first failing cell.
    #[default]
    FailFast,
    /// Record the failure and run the remaining cells.
    Continue,
}

/// Configuration for the [`SweepRunner`](super::SweepRunner).
///
/// # Examples
///
/// ```
/// use u_fairrank::sweep::{FairnessCategory, SweepConfig};
///
/// let config = SweepConfig::default()
///     .with_modes(vec![FairnessCategory::None, FairnessCategory::ConsumerProvider])
///     .with_user_epsilons(vec![0.1, 0.2])
///     .with_item_epsilons(vec![0.5]);
/// assert!(config.validate().is_ok());
/// // N once, then CP over 2 × 1 weights
/// assert_eq!(config.cells().len(), 3);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SweepConfig {
    /// Fairness categories to run, in order.
    pub modes: Vec<FairnessCategory>,

    /// Consumer-fairness weights for C and CP cells.
    pub user_epsilons: Vec<f64>,

    /// Provider-fairness weights for P and CP cells.
    pub item_epsilons: Vec<f64>,

    /// Behavior on a failing cell.
    ///
    /// A cell that times out leaves its solver thread running. Under
    /// [`ErrorPolicy::Continue`] later cells keep solving until
    /// `SolverConfig::max_abandoned_solves` such threads are alive; past
    /// that, time-limited cells fail with a solver error.
    pub error_policy: ErrorPolicy,

    /// Whether to run cells in parallel using rayon.
    pub parallel: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            modes: FairnessCategory::ALL.to_vec(),
            user_epsilons: vec![0.0001, 0.001, 0.01],
            item_epsilons: vec![0.0001, 0.001, 0.01],
            error_policy: ErrorPolicy::FailFast,
            parallel: false,
        }
    }
}

impl SweepConfig {
    pub fn with_modes(mut self, modes: Vec<FairnessCategory>) -> Self {
        self.modes = modes;
        self
    }

    pub fn with_user_epsilons(mut self, epsilons: Vec<f64>) -> Self {
        self.user_epsilons = epsilons;
        self
    }

    pub fn with_item_epsilons(mut self, epsilons: Vec<f64>) -> Self {
        self.item_epsilons = epsilons;
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Expands the configuration into one mode per cell.
    ///
    /// N runs once, C once per user weight, P once per item weight, and CP
    /// over every (user weight, item weight) pair.
    pub fn cells(&self) -> Vec<FairnessMode> {
        let mut cells = Vec::new();
        for category in &self.modes {
            match category {
                FairnessCategory::None => cells.push(FairnessMode::None),
                FairnessCategory::Consumer => cells.extend(
                    self.user_epsilons
                        .iter()
                        .map(|&user_epsilon| FairnessMode::Consumer { user_epsilon }),
                ),
                FairnessCategory::Provider => cells.extend(
                    self.item_epsilons
                        .iter()
                        .map(|&item_epsilon| FairnessMode::Provider { item_epsilon }),
                ),
                FairnessCategory::ConsumerProvider => {
                    for &user_epsilon in &self.user_epsilons {
                        for &item_epsilon in &self.item_epsilons {
                            cells.push(FairnessMode::ConsumerProvider {
                                user_epsilon,
                                item_epsilon,
                            });
                        }
                    }
                }
            }
        }
        cells
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.modes.is_empty() {
            return Err("at least one fairness category is required".into());
        }
        if self.modes.iter().any(|m| m.uses_user_epsilon()) && self.user_epsilons.is_empty() {
            return Err("C and CP cells need at least one user epsilon".into());
        }
        if self.modes.iter().any(|m| m.uses_item_epsilon()) && self.item_epsilons.is_empty() {
            return Err("P and CP cells need at least one item epsilon".into());
        }
        for &epsilon in self.user_epsilons.iter().chain(&self.item_epsilons) {
            if !epsilon.is_finite() || epsilon < 0.0 {
                return Err(format!(
                    "epsilons must be finite and non-negative, got {epsilon}"
                ));
            }
        }
        Ok(())
    }
}
