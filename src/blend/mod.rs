//! Sieve-gradation blend optimization.
//!
//! Finds the volume shares of raw materials whose combined sieve-pass
//! curve is closest to a target gradation curve, measured as the sum of
//! absolute per-sieve deviations.
//!
//! # Pipeline
//!
//! 1. [`ScalingEngine`]: fractions and percentages → exact integers,
//!    with all variable domains derived in [`DomainBounds`]
//! 2. [`BlendModelBuilder`]: integer [`CpModel`](crate::cp::CpModel)
//!    with mixing, total-volume, deviation and share constraints
//! 3. Any [`CpSolver`](crate::cp::CpSolver)
//! 4. [`interpret`]: solver bindings → [`BlendOutcome`]
//!
//! [`BlendRunner`] drives the whole pipeline.
//!
//! # Key Types
//!
//! - [`BlendProblem`]: validated materials, target and share constraints
//! - [`BlendConfig`]: decimal precision and solver budget, with presets
//! - [`BlendOutcome`]: solved blend, infeasible, or unknown
//!
//! # Example
//!
//! ```
//! use u_blend::blend::{BlendConfig, BlendProblem, BlendRunner, Material, TargetProfile};
//! use u_blend::cp::MilpSolver;
//!
//! let problem = BlendProblem::new(
//!     vec![
//!         Material::new("M1", "Coarse", vec![0.70, 0.30]),
//!         Material::new("M2", "Fine", vec![0.90, 0.75]),
//!     ],
//!     TargetProfile::new(vec![0.80, 0.50]),
//! )
//! .unwrap();
//!
//! let outcome = BlendRunner::run(&problem, &BlendConfig::coarse(), &MilpSolver::new()).unwrap();
//! let blend = outcome.solution().unwrap();
//! assert!((blend.share("M1").unwrap().percent - 55.55).abs() < 1e-9);
//! ```

mod builder;
mod config;
mod interpreter;
mod report;
mod runner;
mod scaling;
mod types;

pub use builder::{
    abs_deviation_var, deviation_var, mix_pass_var, volume_var, BlendModel, BlendModelBuilder,
    MaterialRef,
};
pub use config::{BlendConfig, ScalingConfig};
pub use interpreter::{
    interpret, BlendOutcome, BlendSolution, MaterialShare, SieveResult, SolveFailure,
};
pub use runner::BlendRunner;
pub use scaling::{DomainBounds, ScalingEngine};
pub use types::{BlendProblem, Material, ShareConstraint, TargetProfile};
