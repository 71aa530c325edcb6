//! Parameter sweeps over fairness modes and penalty weights.
//!
//! A sweep takes one built problem (dataset, model, user split, item split)
//! and runs the optimizer and metrics once per cell:
//!
//! - `N` once
//! - `C` once per user epsilon
//! - `P` once per item epsilon
//! - `CP` once per (user epsilon, item epsilon) pair
//!
//! Every failure carries the [`CellKey`] of the cell that raised it, and
//! [`ErrorPolicy`] decides whether the sweep stops or moves on. The sweep
//! performs no I/O; persisting [`CellReport`] rows is up to the caller.

mod config;
mod runner;
mod types;

pub use config::{ErrorPolicy, FairnessCategory, SweepConfig};
pub use runner::SweepRunner;
pub use types::{format_epsilon, CellError, CellKey, CellReport, SweepContext, SweepReport};
