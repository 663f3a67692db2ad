//! Sieve-gradation blend optimization over an integer solver.
//!
//! Chooses volume shares of raw materials so that the blend's sieve-pass
//! curve matches a target curve as closely as possible:
//!
//! - **Blend** ([`blend`]): scaling engine, model builder, result
//!   interpreter and the runner that ties them together.
//! - **CP (Constraint Programming)** ([`cp`]): solver-agnostic integer
//!   model with linear and absolute-value constraints, the [`cp::CpSolver`]
//!   trait, and a pure-Rust MILP backend.
//!
//! # Architecture
//!
//! The model is exact-integer: every percentage is scaled by
//! `100 · 10^decimal_precision` before it reaches the solver, and every
//! solver binding is re-checked in integer arithmetic before it is
//! reported. Solvers are interchangeable behind [`cp::CpSolver`].

pub mod blend;
pub mod cp;
pub mod error;

pub use error::{BlendError, Result};
