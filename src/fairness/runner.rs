//! LP formulation and solve.

use super::config::{FairnessMode, GapSource, OptimizerConfig};
use super::types::{FairnessProblem, OptimizerResult, SelectionMatrix};
use crate::error::{FairRankError, Result};
use crate::lp::{Constraint, LinearExpr, LpModel, LpSolver, LpVar, MicroLpSolver, Objective, VarId};
use crate::matrices::{ITEM_GROUP_COUNT, LONGTAIL, SHORTHEAD};
use ndarray::Array2;

/// An LP built for one problem and mode, with handles to every variable.
#[derive(Debug, Clone)]
pub struct Formulation {
    /// The model handed to the solver.
    pub model: LpModel,

    /// `W[u][rank]` handles.
    pub selection: Array2<VarId>,

    /// Per-user DCG.
    pub user_dcg: Vec<VarId>,

    /// Per-user NDCG.
    pub user_ndcg: Vec<VarId>,

    /// Per-user precision.
    pub user_precision: Vec<VarId>,

    /// Per-user recall; `None` for users without training interactions.
    pub user_recall: Vec<Option<VarId>>,

    /// Per-user-group DCG aggregate.
    pub group_dcg: Vec<VarId>,

    /// Per-user-group NDCG aggregate.
    pub group_ndcg: Vec<VarId>,

    /// Per-user-group precision aggregate.
    pub group_precision: Vec<VarId>,

    /// Per-user-group recall aggregate.
    pub group_recall: Vec<VarId>,

    /// Raw exposure per item group.
    pub item_exposure: [VarId; ITEM_GROUP_COUNT],

    /// Relevance term `Σ score·W`, without penalties.
    pub relevance: LinearExpr,
}

/// Formulates and solves the fairness-aware re-ranking LP.
///
/// # Usage
///
/// ```ignore
/// let optimizer = FairnessOptimizer::new(OptimizerConfig::default().with_k(10));
/// let problem = FairnessProblem::new(&matrices, &user_groups, &item_groups, &data)?;
/// let result = optimizer.solve(&problem, FairnessMode::Consumer { user_epsilon: 0.01 })?;
/// println!("gap: {:?}", result.ndcg_gap());
/// ```
#[derive(Debug, Clone)]
pub struct FairnessOptimizer<S: LpSolver = MicroLpSolver> {
    config: OptimizerConfig,
    solver: S,
}

impl FairnessOptimizer<MicroLpSolver> {
    /// Creates an optimizer backed by the default solver.
    pub fn new(config: OptimizerConfig) -> Self {
        Self::with_solver(config, MicroLpSolver::new())
    }
}

impl<S: LpSolver> FairnessOptimizer<S> {
    /// Creates an optimizer backed by `solver`.
    pub fn with_solver(config: OptimizerConfig, solver: S) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Builds the LP for `problem` under `mode` without solving it.
    pub fn formulate(
        &self,
        problem: &FairnessProblem<'_>,
        mode: FairnessMode,
    ) -> Result<Formulation> {
        self.config.validate().map_err(FairRankError::InvalidConfig)?;
        mode.validate().map_err(FairRankError::InvalidConfig)?;

        let k = self.config.k;
        let topk = problem.topk();
        if k > topk {
            return Err(FairRankError::InvalidConfig(format!(
                "k = {k} exceeds the candidate pool size {topk}"
            )));
        }
        let user_group_count = problem.user_groups.group_count();
        if mode.user_epsilon().is_some() && user_group_count < 2 {
            return Err(FairRankError::InvalidConfig(format!(
                "consumer fairness needs two user groups, got {user_group_count}"
            )));
        }

        let formulation = self.config.formulation;
        let users = problem.total_users();
        let candidates = &problem.matrices.candidates;
        let hits = &problem.matrices.hits;
        let indicator = &problem.matrices.item_indicator;
        let ideal_dcg = self.config.ideal_dcg();

        let mut model = LpModel::new(format!("fairrank-{}", mode.code()));

        let selection = Array2::from_shape_fn((users, topk), |(user, rank)| {
            model.add_var(LpVar::unit(format!("W[{user}][{rank}]")))
        });

        for user in 0..users {
            let mut row = LinearExpr::with_capacity(topk);
            for rank in 0..topk {
                row.add_term(selection[[user, rank]], 1.0);
            }
            model.add_constraint(Constraint::equal(format!("select_k[{user}]"), row, k as f64));
        }

        if self.config.explicit_upper_bounds {
            for ((user, rank), &w) in selection.indexed_iter() {
                model.add_constraint(Constraint::at_most(
                    format!("w_max[{user}][{rank}]"),
                    LinearExpr::term(w, 1.0),
                    1.0,
                ));
            }
        }

        let mut user_dcg = Vec::with_capacity(users);
        let mut user_ndcg = Vec::with_capacity(users);
        let mut user_precision = Vec::with_capacity(users);
        let mut user_recall = Vec::with_capacity(users);
        let mut skipped_recall = 0usize;

        for user in 0..users {
            // Σ W·Ahelp, shared by precision and recall
            let mut hit_mass = LinearExpr::with_capacity(topk);
            let mut discounted = LinearExpr::with_capacity(topk);
            for rank in 0..topk {
                let hit = hits.coefficient(user, rank);
                hit_mass.add_term(selection[[user, rank]], hit);
                discounted.add_term(
                    selection[[user, rank]],
                    hit * formulation.discount.weight(rank),
                );
            }

            let dcg = model.add_var(LpVar::non_negative(format!("dcg[{user}]")));
            define(&mut model, format!("dcg_def[{user}]"), dcg, &discounted, 1.0);
            user_dcg.push(dcg);

            let ndcg = model.add_var(LpVar::non_negative(format!("ndcg[{user}]")));
            define(
                &mut model,
                format!("ndcg_def[{user}]"),
                ndcg,
                &LinearExpr::term(dcg, 1.0),
                1.0 / ideal_dcg,
            );
            user_ndcg.push(ndcg);

            let precision = model.add_var(LpVar::non_negative(format!("precision[{user}]")));
            define(
                &mut model,
                format!("precision_def[{user}]"),
                precision,
                &hit_mass,
                1.0 / k as f64,
            );
            user_precision.push(precision);

            let interactions = problem.data.training(user).len();
            if interactions == 0 {
                skipped_recall += 1;
                user_recall.push(None);
                continue;
            }
            let recall = model.add_var(LpVar::non_negative(format!("recall[{user}]")));
            define(
                &mut model,
                format!("recall_def[{user}]"),
                recall,
                &hit_mass,
                1.0 / interactions as f64,
            );
            user_recall.push(Some(recall));
        }

        if skipped_recall > 0 {
            log::warn!(
                "{skipped_recall} users have no training interactions; recall left undefined for them"
            );
        }

        let mut group_dcg = Vec::with_capacity(user_group_count);
        let mut group_ndcg = Vec::with_capacity(user_group_count);
        let mut group_precision = Vec::with_capacity(user_group_count);
        let mut group_recall = Vec::with_capacity(user_group_count);

        for group in 0..user_group_count {
            let weight = formulation
                .aggregation
                .weight(problem.user_groups.size(group), users)
                .map_err(|e| FairRankError::ZeroDenominator(format!("user group {group}: {e}")))?;
            let members = problem.user_groups.members(group);

            let mut dcg_sum = LinearExpr::with_capacity(members.len());
            let mut ndcg_sum = LinearExpr::with_capacity(members.len());
            let mut precision_sum = LinearExpr::with_capacity(members.len());
            let mut recall_sum = LinearExpr::with_capacity(members.len());
            for &user in &members {
                dcg_sum.add_term(user_dcg[user], 1.0);
                ndcg_sum.add_term(user_ndcg[user], 1.0);
                precision_sum.add_term(user_precision[user], 1.0);
                if let Some(recall) = user_recall[user] {
                    recall_sum.add_term(recall, 1.0);
                }
            }

            let var = model.add_var(LpVar::non_negative(format!("group_dcg[{group}]")));
            define(&mut model, format!("group_dcg_def[{group}]"), var, &dcg_sum, weight);
            group_dcg.push(var);

            let var = model.add_var(LpVar::non_negative(format!("group_ndcg[{group}]")));
            define(&mut model, format!("group_ndcg_def[{group}]"), var, &ndcg_sum, weight);
            group_ndcg.push(var);

            let var = model.add_var(LpVar::non_negative(format!("group_precision[{group}]")));
            define(
                &mut model,
                format!("group_precision_def[{group}]"),
                var,
                &precision_sum,
                weight,
            );
            group_precision.push(var);

            let var = model.add_var(LpVar::non_negative(format!("group_recall[{group}]")));
            define(&mut model, format!("group_recall_def[{group}]"), var, &recall_sum, weight);
            group_recall.push(var);
        }

        let item_exposure: [VarId; ITEM_GROUP_COUNT] = std::array::from_fn(|group| {
            let mut exposure = LinearExpr::new();
            for ((user, rank), &w) in selection.indexed_iter() {
                if indicator.get(user, rank, group) {
                    exposure.add_term(w, 1.0);
                }
            }
            let var = model.add_var(LpVar::non_negative(format!("exposure[{group}]")));
            define(&mut model, format!("exposure_def[{group}]"), var, &exposure, 1.0);
            var
        });

        let mut relevance = LinearExpr::with_capacity(users * topk);
        for ((user, rank), &w) in selection.indexed_iter() {
            relevance.add_term(w, candidates.score(user, rank));
        }

        let mut objective = relevance.clone();
        if let Some(epsilon) = mode.user_epsilon() {
            let gap_terms = match formulation.gap_source {
                GapSource::Dcg => &group_dcg,
                GapSource::Ndcg => &group_ndcg,
            };
            let (first, second) = formulation.gap_sign.coefficients();
            objective.add_term(gap_terms[0], -epsilon * first);
            objective.add_term(gap_terms[1], -epsilon * second);
        }
        if let Some(epsilon) = mode.item_epsilon() {
            let total_items = problem.item_groups.total_items();
            let item_weight = |group: usize| {
                formulation
                    .exposure_aggregation
                    .weight(problem.item_groups.size(group), total_items)
                    .map_err(|e| FairRankError::ZeroDenominator(format!("item group {group}: {e}")))
            };
            objective.add_term(item_exposure[SHORTHEAD], -epsilon * item_weight(SHORTHEAD)?);
            objective.add_term(item_exposure[LONGTAIL], epsilon * item_weight(LONGTAIL)?);
        }
        model.set_objective(Objective::Maximize(objective));

        log::debug!(
            "formulated '{}': {} variables, {} rows",
            model.name,
            model.var_count(),
            model.constraint_count()
        );

        Ok(Formulation {
            model,
            selection,
            user_dcg,
            user_ndcg,
            user_precision,
            user_recall,
            group_dcg,
            group_ndcg,
            group_precision,
            group_recall,
            item_exposure,
            relevance,
        })
    }

    /// Formulates and solves `problem` under `mode`.
    ///
    /// Solver failures map to [`FairRankError::SolverInfeasible`],
    /// [`FairRankError::SolverUnbounded`], [`FairRankError::SolverTimeout`],
    /// or [`FairRankError::Solver`].
    pub fn solve(
        &self,
        problem: &FairnessProblem<'_>,
        mode: FairnessMode,
    ) -> Result<OptimizerResult> {
        let formulation = self.formulate(problem, mode)?;

        log::info!(
            "solving mode {mode} (user_epsilon {:?}, item_epsilon {:?}) for '{}': {} users, topk {}, k {}",
            mode.user_epsilon(),
            mode.item_epsilon(),
            problem.matrices.model_name,
            problem.total_users(),
            problem.topk(),
            self.config.k
        );

        let solution = self
            .solver
            .solve(&formulation.model, &self.config.solver)
            .into_result(&self.config.solver)?;

        let value = |var: VarId| -> Result<f64> {
            solution.value(var).ok_or_else(|| {
                FairRankError::Solver(format!("solution has no value for variable #{}", var.index()))
            })
        };
        let values_of =
            |vars: &[VarId]| -> Result<Vec<f64>> { vars.iter().map(|&v| value(v)).collect() };

        let mut selection = Array2::zeros(formulation.selection.dim());
        for (index, &var) in formulation.selection.indexed_iter() {
            selection[index] = value(var)?;
        }
        let item_exposure = [
            value(formulation.item_exposure[SHORTHEAD])?,
            value(formulation.item_exposure[LONGTAIL])?,
        ];
        let relevance = formulation.relevance.evaluate(&solution.values);
        let objective_value = match solution.objective_value {
            Some(objective) => objective,
            None => formulation
                .model
                .objective
                .as_ref()
                .map_or(relevance, |o| o.evaluate(&solution.values)),
        };

        log::info!(
            "mode {mode} solved in {} ms: objective {objective_value:.6}, relevance {relevance:.6}",
            solution.solve_time_ms
        );

        Ok(OptimizerResult {
            mode,
            selection: SelectionMatrix::new(selection),
            item_exposure,
            group_dcg: values_of(&formulation.group_dcg)?,
            group_ndcg: values_of(&formulation.group_ndcg)?,
            group_precision: values_of(&formulation.group_precision)?,
            group_recall: values_of(&formulation.group_recall)?,
            objective_value,
            relevance,
            solve_time_ms: solution.solve_time_ms,
        })
    }
}

/// Adds `var = factor · expr` as `var − factor·expr = 0`.
fn define(model: &mut LpModel, name: String, var: VarId, expr: &LinearExpr, factor: f64) {
    let mut row = LinearExpr::term(var, 1.0);
    row.add_scaled(expr, -factor);
    model.add_constraint(Constraint::equal(name, row, 0.0));
}
