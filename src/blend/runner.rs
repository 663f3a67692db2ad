//! Blend solve execution.
//!
//! [`BlendRunner`] orchestrates one solve:
//! validate config → build model → submit to solver → interpret.

use super::builder::BlendModel;
use super::config::BlendConfig;
use super::interpreter::{interpret, BlendOutcome};
use super::types::BlendProblem;
use crate::cp::CpSolver;
use crate::error::{BlendError, Result};
use tracing::info;

/// Executes blend solves.
///
/// Each call builds a fresh [`BlendModel`]; nothing is shared between
/// calls, so independent problems may be solved from several threads.
///
/// # Usage
///
/// ```
/// use u_blend::blend::{BlendConfig, BlendProblem, BlendRunner, Material, TargetProfile};
/// use u_blend::cp::MilpSolver;
///
/// let problem = BlendProblem::new(
///     vec![Material::new("M1", "Sand", vec![0.9, 0.4])],
///     TargetProfile::new(vec![0.8, 0.5]),
/// )
/// .unwrap();
/// let outcome = BlendRunner::run(&problem, &BlendConfig::coarse(), &MilpSolver::new()).unwrap();
/// assert_eq!(outcome.solution().unwrap().shares[0].percent, 100.0);
/// ```
pub struct BlendRunner;

impl BlendRunner {
    /// Builds the model for `problem` without solving it.
    pub fn build(problem: &BlendProblem, config: &BlendConfig) -> Result<BlendModel> {
        config.validate()?;
        problem.builder(&config.scaling)?.build()
    }

    /// Solves one blend problem.
    ///
    /// Returns `Err` only for configuration or input errors, which are
    /// detected before the solver is invoked. A precision whose domains the
    /// solver cannot represent is a configuration error. Infeasible and
    /// unknown solver outcomes are `Ok` values.
    pub fn run<S: CpSolver>(
        problem: &BlendProblem,
        config: &BlendConfig,
        solver: &S,
    ) -> Result<BlendOutcome> {
        let model = Self::build(problem, config)?;
        solver.check_model(model.cp_model()).map_err(|e| {
            BlendError::Configuration(format!(
                "decimal_precision {} is beyond the solver's range: {e}",
                config.scaling.decimal_precision
            ))
        })?;

        info!(
            event = "solve_start",
            materials = problem.material_count(),
            sieves = problem.sieve_count(),
            shares = problem.shares().len(),
            decimal_precision = config.scaling.decimal_precision,
        );

        let solution = solver.solve(model.cp_model(), &config.solver);
        let outcome = interpret(&model, &solution);

        match &outcome {
            BlendOutcome::Solved(s) => info!(
                event = "solve_end",
                status = ?s.status,
                objective_units = s.objective_units,
                total_abs_deviation = s.total_abs_deviation,
                solve_time_ms = s.solve_time_ms,
            ),
            BlendOutcome::Infeasible(f) | BlendOutcome::Unknown(f) => info!(
                event = "solve_end",
                status = ?f.status,
                diagnostics = %f.diagnostics,
                solve_time_ms = f.solve_time_ms,
            ),
        }

        Ok(outcome)
    }

    /// Solves independent problems, one fresh model each.
    ///
    /// With the `parallel` feature the problems are solved on the rayon
    /// thread pool; results keep the input order either way.
    pub fn run_batch<S: CpSolver + Sync>(
        problems: &[BlendProblem],
        config: &BlendConfig,
        solver: &S,
    ) -> Vec<Result<BlendOutcome>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            problems
                .par_iter()
                .map(|p| Self::run(p, config, solver))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            problems
                .iter()
                .map(|p| Self::run(p, config, solver))
                .collect()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
