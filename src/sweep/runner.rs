//! Sweep execution.

use super::config::{ErrorPolicy, SweepConfig};
use super::types::{CellError, CellReport, SweepContext, SweepReport};
use crate::error::{FairRankError, Result};
use crate::fairness::{FairnessMode, FairnessOptimizer};
use crate::lp::{LpSolver, MicroLpSolver};
use crate::metrics::MetricsEngine;
use rayon::prelude::*;

/// Runs optimizer and metrics over every cell of a sweep.
///
/// Cells are independent: they share only the read-only context, so they
/// may run in parallel.
///
/// # Usage
///
/// ```ignore
/// let runner = SweepRunner::new(
///     SweepConfig::default().with_error_policy(ErrorPolicy::Continue),
///     FairnessOptimizer::new(OptimizerConfig::default()),
///     MetricsEngine::default(),
/// )?;
/// let context = SweepContext::new("ml1m", "0", "0", &matrices, &users, &items, &data)?;
/// let report = runner.run(&context)?;
/// for failure in &report.failures {
///     eprintln!("{failure}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SweepRunner<S: LpSolver = MicroLpSolver> {
    config: SweepConfig,
    optimizer: FairnessOptimizer<S>,
    metrics: MetricsEngine,
}

impl<S: LpSolver> SweepRunner<S> {
    /// Creates a runner.
    ///
    /// Fails if `config` does not validate, or if the optimizer and the
    /// metrics engine disagree on the list length `k`.
    pub fn new(
        config: SweepConfig,
        optimizer: FairnessOptimizer<S>,
        metrics: MetricsEngine,
    ) -> Result<Self> {
        config.validate().map_err(FairRankError::InvalidConfig)?;
        let (solved_k, scored_k) = (optimizer.config().k, metrics.config().k);
        if solved_k != scored_k {
            return Err(FairRankError::InvalidConfig(format!(
                "optimizer selects k = {solved_k} items but metrics normalize by k = {scored_k}"
            )));
        }
        Ok(Self {
            config,
            optimizer,
            metrics,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Runs every cell of the sweep against `context`.
    ///
    /// Under [`ErrorPolicy::FailFast`] the first failing cell, in cell
    /// order, is returned as the error. Under [`ErrorPolicy::Continue`]
    /// failures are collected in the report and this never fails.
    pub fn run(
        &self,
        context: &SweepContext<'_>,
    ) -> std::result::Result<SweepReport, CellError> {
        let cells = self.config.cells();
        log::info!(
            "sweep over {} cells for dataset '{}', model '{}'",
            cells.len(),
            context.dataset,
            context.problem.matrices.model_name
        );

        let outcomes: Vec<std::result::Result<CellReport, CellError>> = if self.config.parallel {
            cells
                .par_iter()
                .map(|&mode| self.run_cell(context, mode))
                .collect()
        } else {
            cells
                .iter()
                .map(|&mode| self.run_cell(context, mode))
                .collect()
        };

        if self.config.error_policy == ErrorPolicy::FailFast {
            let reports = outcomes
                .into_iter()
                .collect::<std::result::Result<Vec<_>, _>>()?;
            return Ok(SweepReport {
                reports,
                failures: Vec::new(),
            });
        }

        let mut report = SweepReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(cell) => report.reports.push(cell),
                Err(e) => {
                    log::warn!("{e}");
                    report.failures.push(e);
                }
            }
        }
        log::info!(
            "sweep finished: {} cells succeeded, {} failed",
            report.reports.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Runs a single cell.
    pub fn run_cell(
        &self,
        context: &SweepContext<'_>,
        mode: FairnessMode,
    ) -> std::result::Result<CellReport, CellError> {
        self.evaluate(context, mode).map_err(|source| CellError {
            cell: context.cell(mode),
            source,
        })
    }

    fn evaluate(&self, context: &SweepContext<'_>, mode: FairnessMode) -> Result<CellReport> {
        let problem = &context.problem;
        let result = self.optimizer.solve(problem, mode)?;
        let candidates = &problem.matrices.candidates;

        let all = self
            .metrics
            .evaluate_all(&result.selection, candidates, problem.data)?;
        let groups = self.metrics.evaluate_groups(
            problem.user_groups,
            &result.selection,
            candidates,
            problem.data,
        )?;

        Ok(CellReport {
            key: context.cell(mode),
            all,
            groups,
            item_exposure: result.item_exposure,
            expected_exposure: (problem.total_users() * self.optimizer.config().k) as f64,
            objective_value: result.objective_value,
            relevance: result.relevance,
            solve_time_ms: result.solve_time_ms,
        })
    }
}
