//! Linear Programming (LP) modeling layer.
//!
//! Provides a solver-independent model for expressing linear optimization
//! problems over bounded continuous variables.
//!
//! # Key Components
//!
//! - **Variables**: [`LpVar`] with [`VarId`] handles
//! - **Rows**: [`Constraint`] over a [`LinearExpr`] with a [`Relation`]
//! - **Model**: [`LpModel`], the container for variables, rows, and objective
//! - **Solver**: [`LpSolver`] trait, the interface for solver implementations
//!
//! # Design
//!
//! The fairness formulation is written against this layer only. The
//! [`LpSolver`] trait lets callers swap the default [`MicroLpSolver`]
//! (pure Rust, via `good_lp`) for any other backend.
//!
//! # References
//!
//! Dantzig (1963), "Linear Programming and Extensions"

mod model;
mod solver;
mod variables;

pub use model::{Constraint, LinearExpr, LpModel, Objective, Relation};
pub use solver::{LpSolution, LpSolver, MicroLpSolver, SolverConfig, SolverStatus};
pub use variables::{LpVar, VarId};
