//! Constraint Programming (CP) modeling layer.
//!
//! Provides a solver-agnostic model for expressing integer optimization
//! problems with bounded integer variables, linear constraints and an
//! exact absolute-value primitive.
//!
//! # Key Components
//!
//! - **Variables**: [`IntVar`], [`LinearExpr`]
//! - **Constraints**: [`Constraint`]: linear `==`/`<=`/`>=`, `|x| == y`
//! - **Model**: [`CpModel`]: container for variables, constraints, objective
//! - **Solver**: [`CpSolver`] trait: interface for solver implementations
//! - **Backend**: [`MilpSolver`]: MILP engine behind the [`CpSolver`] trait
//!
//! # Design
//!
//! The model is plain data. Solvers borrow it immutably, so a model
//! submitted for solving cannot change underneath the search. Other
//! engines (CP-SAT, commercial MILP) plug in by implementing [`CpSolver`].
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod milp;
mod model;
mod solver;
mod variables;

pub use milp::{MilpSolver, EXACT_F64_LIMIT};
pub use model::{Constraint, CpModel, Objective, Relation};
pub use solver::{CpSolution, CpSolver, SolverConfig, SolverStatus};
pub use variables::{IntVar, LinearExpr};
