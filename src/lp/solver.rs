//! LP solver interface and the default `good_lp` backend.

use super::model::{LinearExpr, LpModel, Objective, Relation};
use super::variables::VarId;
use crate::error::FairRankError;
use good_lp::{
    default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// No feasible solution exists.
    Infeasible,
    /// The objective can grow without bound.
    Unbounded,
    /// Model is invalid or malformed.
    ModelInvalid,
    /// Solver exceeded time limit.
    Timeout,
    /// Backend failure for any other reason.
    Error,
}

/// Solution from an LP solver.
#[derive(Debug, Clone)]
pub struct LpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective function value (if a solution was found).
    pub objective_value: Option<f64>,
    /// Variable assignment, indexed by [`VarId`]. Empty without a solution.
    pub values: Vec<f64>,
    /// Solve time in milliseconds.
    pub solve_time_ms: u64,
    /// Backend diagnostic, if any.
    pub message: Option<String>,
}

impl LpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            values: Vec::new(),
            solve_time_ms: 0,
            message: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether an optimal assignment was found.
    pub fn is_solution_found(&self) -> bool {
        self.status == SolverStatus::Optimal
    }

    /// Value assigned to `var`, or `None` without a solution.
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.index()).copied()
    }

    /// Converts a non-optimal status into the matching error.
    pub fn into_result(self, config: &SolverConfig) -> Result<Self, FairRankError> {
        match self.status {
            SolverStatus::Optimal => Ok(self),
            SolverStatus::Infeasible => Err(FairRankError::SolverInfeasible),
            SolverStatus::Unbounded => Err(FairRankError::SolverUnbounded),
            SolverStatus::Timeout => Err(FairRankError::SolverTimeout {
                limit_ms: config.time_limit_ms,
            }),
            SolverStatus::ModelInvalid | SolverStatus::Error => Err(FairRankError::Solver(
                self.message
                    .unwrap_or_else(|| format!("solver finished with status {:?}", self.status)),
            )),
        }
    }
}

/// Solver configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Maximum wall-clock solve time in milliseconds. 0 = no limit.
    pub time_limit_ms: u64,

    /// Timed-out solves that may still be running in the background before
    /// new time-limited solves are refused.
    pub max_abandoned_solves: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 60_000,
            max_abandoned_solves: 4,
        }
    }
}

impl SolverConfig {
    /// Sets the time limit (0 disables it).
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_max_abandoned_solves(mut self, max: usize) -> Self {
        self.max_abandoned_solves = max;
        self
    }
}

/// Trait for LP solver implementations.
///
/// Implementors receive a fully built [`LpModel`] and return an
/// assignment or a status explaining why there is none. This is the seam
/// where external solvers (HiGHS, CBC, commercial backends) plug in.
pub trait LpSolver: Send + Sync {
    /// Solves the model and returns a solution.
    fn solve(&self, model: &LpModel, config: &SolverConfig) -> LpSolution;
}

/// Default solver: `good_lp` with the pure-Rust `microlp` backend.
///
/// The backend has no native time limit, so a limited solve runs on a
/// worker thread and is abandoned when the limit expires. An abandoned
/// worker keeps running until the backend returns. Clones share one count
/// of such workers; while it is at [`SolverConfig::max_abandoned_solves`],
/// time-limited solves fail with [`SolverStatus::Error`] instead of
/// spawning another thread.
#[derive(Debug, Clone, Default)]
pub struct MicroLpSolver {
    abandoned: Arc<AtomicUsize>,
}

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const ABANDONED: u8 = 2;

impl MicroLpSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timed-out solves whose worker thread has not returned yet.
    pub fn abandoned_solves(&self) -> usize {
        self.abandoned.load(Ordering::Acquire)
    }
}

impl LpSolver for MicroLpSolver {
    fn solve(&self, model: &LpModel, config: &SolverConfig) -> LpSolution {
        if let Err(reason) = model.validate() {
            return LpSolution::empty(SolverStatus::ModelInvalid).with_message(reason);
        }

        let start_time = Instant::now();

        let mut solution = if config.time_limit_ms == 0 {
            solve_blocking(model)
        } else {
            self.solve_with_deadline(model, config)
        };

        solution.solve_time_ms = start_time.elapsed().as_millis() as u64;
        log::debug!(
            "lp '{}' finished with {:?} in {} ms",
            model.name,
            solution.status,
            solution.solve_time_ms
        );
        solution
    }
}

impl MicroLpSolver {
    fn solve_with_deadline(&self, model: &LpModel, config: &SolverConfig) -> LpSolution {
        let lingering = self.abandoned_solves();
        if lingering >= config.max_abandoned_solves {
            return LpSolution::empty(SolverStatus::Error).with_message(format!(
                "{lingering} timed-out solves are still running; refusing to start another"
            ));
        }

        let limit = Duration::from_millis(config.time_limit_ms);
        let state = Arc::new(AtomicU8::new(RUNNING));
        let (tx, rx) = mpsc::channel();
        let owned = model.clone();
        let worker_state = Arc::clone(&state);
        let abandoned = Arc::clone(&self.abandoned);
        let spawned = thread::Builder::new()
            .name(format!("lp-{}", model.name))
            .spawn(move || {
                let solution = solve_blocking(&owned);
                if worker_state.swap(FINISHED, Ordering::AcqRel) == ABANDONED {
                    abandoned.fetch_sub(1, Ordering::AcqRel);
                }
                // The receiver is gone after a timeout; nothing left to report to.
                let _ = tx.send(solution);
            });

        if let Err(e) = spawned {
            return LpSolution::empty(SolverStatus::Error)
                .with_message(format!("failed to spawn solver thread: {e}"));
        }

        match rx.recv_timeout(limit) {
            Ok(solution) => solution,
            Err(RecvTimeoutError::Timeout) => {
                // count first so the worker never decrements below zero
                self.abandoned.fetch_add(1, Ordering::AcqRel);
                if state
                    .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    self.abandoned.fetch_sub(1, Ordering::AcqRel);
                }
                log::warn!(
                    "lp '{}' abandoned after {} ms ({} abandoned solves running)",
                    model.name,
                    limit.as_millis(),
                    self.abandoned_solves()
                );
                LpSolution::empty(SolverStatus::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => LpSolution::empty(SolverStatus::Error)
                .with_message("solver thread terminated without a result"),
        }
    }
}

fn solve_blocking(model: &LpModel) -> LpSolution {
    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = model
        .vars
        .iter()
        .map(|var| {
            let definition = if var.is_bounded() {
                variable().min(var.min).max(var.max)
            } else {
                variable().min(var.min)
            };
            vars.add(definition)
        })
        .collect();

    let unsolved = match &model.objective {
        Some(Objective::Maximize(expr)) => vars.maximise(to_expression(expr, &handles)),
        Some(Objective::Minimize(expr)) => vars.minimise(to_expression(expr, &handles)),
        None => {
            return LpSolution::empty(SolverStatus::ModelInvalid)
                .with_message("objective is not set")
        }
    };

    let mut problem = unsolved.using(default_solver);
    for row in &model.constraints {
        let lhs = to_expression(&row.expr, &handles);
        let constraint = match row.relation {
            Relation::Eq => lhs.eq(row.rhs),
            Relation::Le => lhs.leq(row.rhs),
            Relation::Ge => lhs.geq(row.rhs),
        };
        problem = problem.with(constraint);
    }

    match problem.solve() {
        Ok(solved) => {
            let values: Vec<f64> = handles.iter().map(|&h| solved.value(h)).collect();
            let objective_value = model.objective.as_ref().map(|o| o.evaluate(&values));
            LpSolution {
                status: SolverStatus::Optimal,
                objective_value,
                values,
                solve_time_ms: 0,
                message: None,
            }
        }
        Err(ResolutionError::Infeasible) => LpSolution::empty(SolverStatus::Infeasible),
        Err(ResolutionError::Unbounded) => LpSolution::empty(SolverStatus::Unbounded),
        Err(other) => LpSolution::empty(SolverStatus::Error).with_message(other.to_string()),
    }
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::with_capacity(expr.len());
    for &(var, coefficient) in &expr.terms {
        out.add_mul(coefficient, handles[var.index()]);
    }
    out += expr.constant;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::{Constraint, LpVar};

    fn pick_best_model() -> (LpModel, VarId, VarId) {
        let mut model = LpModel::new("pick");
        let x = model.add_var(LpVar::unit("x"));
        let y = model.add_var(LpVar::unit("y"));
        let mut sum = LinearExpr::new();
        sum.add_term(x, 1.0);
        sum.add_term(y, 1.0);
        model.add_constraint(Constraint::equal("one", sum, 1.0));
        let mut objective = LinearExpr::new();
        objective.add_term(x, 3.0);
        objective.add_term(y, 1.0);
        model.set_objective(Objective::Maximize(objective));
        (model, x, y)
    }

    #[test]
    fn test_solves_simple_lp() {
        let (model, x, y) = pick_best_model();
        let solution = MicroLpSolver::new().solve(&model, &SolverConfig::default());

        assert!(solution.is_solution_found());
        assert!((solution.value(x).unwrap() - 1.0).abs() < 1e-6);
        assert!(solution.value(y).unwrap().abs() < 1e-6);
        assert!((solution.objective_value.unwrap() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_without_time_limit() {
        let (model, _, _) = pick_best_model();
        let config = SolverConfig::default().with_time_limit_ms(0);
        let solution = MicroLpSolver::new().solve(&model, &config);
        assert!(solution.is_solution_found());
    }

    #[test]
    fn test_infeasible() {
        let (mut model, x, _) = pick_best_model();
        model.add_constraint(Constraint::at_least("too_much", LinearExpr::term(x, 1.0), 2.0));

        let solution = MicroLpSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::Infeasible);
        assert_eq!(
            solution.into_result(&SolverConfig::default()).unwrap_err(),
            FairRankError::SolverInfeasible
        );
    }

    #[test]
    fn test_unbounded() {
        let mut model = LpModel::new("open");
        let z = model.add_var(LpVar::non_negative("z"));
        model.set_objective(Objective::Maximize(LinearExpr::term(z, 1.0)));

        let solution = MicroLpSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::Unbounded);
    }

    #[test]
    fn test_invalid_model() {
        let model = LpModel::new("no_objective");
        let solution = MicroLpSolver::new().solve(&model, &SolverConfig::default());

        assert_eq!(solution.status, SolverStatus::ModelInvalid);
        assert!(matches!(
            solution.into_result(&SolverConfig::default()),
            Err(FairRankError::Solver(_))
        ));
    }

    #[test]
    fn test_timeout_maps_to_error() {
        let config = SolverConfig::default().with_time_limit_ms(25);
        let err = LpSolution::empty(SolverStatus::Timeout)
            .into_result(&config)
            .unwrap_err();
        assert_eq!(err, FairRankError::SolverTimeout { limit_ms: 25 });
    }

    #[test]
    fn test_solver_config_default() {
        assert_eq!(SolverConfig::default().time_limit_ms, 60_000);
        assert_eq!(SolverConfig::default().max_abandoned_solves, 4);
    }

    #[test]
    fn test_refuses_limited_solve_while_abandoned_workers_run() {
        let (model, _, _) = pick_best_model();
        let solver = MicroLpSolver::new();
        let shared = solver.clone();
        solver.abandoned.store(2, Ordering::Release);

        let config = SolverConfig::default().with_max_abandoned_solves(2);
        let solution = shared.solve(&model, &config);
        assert_eq!(solution.status, SolverStatus::Error);
        assert!(solution.message.unwrap().contains("2 timed-out solves"));

        // below the cap, and without a limit, solves proceed
        assert!(shared
            .solve(&model, &config.clone().with_max_abandoned_solves(3))
            .is_solution_found());
        assert!(shared
            .solve(&model, &config.with_time_limit_ms(0))
            .is_solution_found());
        assert_eq!(shared.abandoned_solves(), 2);
    }
}
