//! Result interpreter: solver status and bindings → blend percentages.

use super::builder::{mix_pass_var, BlendModel};
use crate::cp::{CpSolution, SolverStatus};
use tracing::warn;

/// One material's share of the blend.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterialShare {
    pub id: String,
    pub name: String,
    /// Share in volume units (`percent · multiplier`).
    pub units: i64,
    /// Share in percent.
    pub percent: f64,
}

/// Achieved vs. target pass percentage at one sieve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SieveResult {
    pub target_percent: f64,
    pub achieved_percent: f64,
    /// `achieved - target`, in percentage points.
    pub deviation_percent: f64,
}

/// A feasible blend.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlendSolution {
    /// [`SolverStatus::Optimal`] or [`SolverStatus::Feasible`].
    pub status: SolverStatus,
    /// Shares in material order.
    pub shares: Vec<MaterialShare>,
    /// Per-sieve results in sieve order.
    pub sieves: Vec<SieveResult>,
    /// Objective in model units, recomputed exactly from the shares.
    pub objective_units: i64,
    /// Sum of absolute deviations in percentage points.
    pub total_abs_deviation: f64,
    /// Solve time in milliseconds.
    pub solve_time_ms: i64,
}

impl BlendSolution {
    /// Share of a material by id.
    pub fn share(&self, material_id: &str) -> Option<&MaterialShare> {
        self.shares.iter().find(|s| s.id == material_id)
    }

    /// Sum of all shares in percent (100 up to descaling rounding).
    pub fn total_percent(&self) -> f64 {
        self.shares.iter().map(|s| s.percent).sum()
    }
}

/// Why a solve did not produce a blend.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveFailure {
    /// Raw solver status.
    pub status: SolverStatus,
    /// Solver diagnostics or the reason the bindings were rejected.
    pub diagnostics: String,
    /// Solve time in milliseconds.
    pub solve_time_ms: i64,
}

/// Terminal outcome of one solve.
///
/// Infeasibility is a legitimate modeling result, not an error; the
/// caller decides how to respond (e.g. loosening a share constraint).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendOutcome {
    /// Optimal or feasible blend.
    Solved(BlendSolution),
    /// No blend satisfies all constraints.
    Infeasible(SolveFailure),
    /// The solver proved neither optimality nor infeasibility, or returned
    /// bindings that do not satisfy the model.
    Unknown(SolveFailure),
}

impl BlendOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, BlendOutcome::Solved(_))
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, BlendOutcome::Infeasible(_))
    }

    /// The blend, if one was found.
    pub fn solution(&self) -> Option<&BlendSolution> {
        match self {
            BlendOutcome::Solved(s) => Some(s),
            _ => None,
        }
    }

    /// The solver status behind this outcome.
    pub fn status(&self) -> SolverStatus {
        match self {
            BlendOutcome::Solved(s) => s.status,
            BlendOutcome::Infeasible(f) | BlendOutcome::Unknown(f) => f.status,
        }
    }
}

/// Maps a solver result back onto the blend.
///
/// Only the volume bindings are read from the solver. Every derived
/// value is recomputed exactly from them and the whole assignment is
/// checked against the model, so a solver cannot hand back a blend that
/// violates a constraint.
pub fn interpret(model: &BlendModel, solution: &CpSolution) -> BlendOutcome {
    let fail = |diagnostics: String| SolveFailure {
        status: solution.status,
        diagnostics,
        solve_time_ms: solution.solve_time_ms,
    };

    match solution.status {
        SolverStatus::Optimal | SolverStatus::Feasible => {}
        SolverStatus::Infeasible => {
            return BlendOutcome::Infeasible(fail(
                solution
                    .diagnostics
                    .clone()
                    .unwrap_or_else(|| "no blend satisfies all constraints".into()),
            ));
        }
        status => {
            return BlendOutcome::Unknown(fail(
                solution
                    .diagnostics
                    .clone()
                    .unwrap_or_else(|| format!("solver terminated with {status:?}")),
            ));
        }
    }

    let mut volumes = Vec::with_capacity(model.volume_vars().len());
    for name in model.volume_vars() {
        match solution.int_value(name) {
            Some(v) => volumes.push(v),
            None => {
                warn!(var = %name, "solver returned no binding");
                return BlendOutcome::Unknown(fail(format!("missing binding for {name}")));
            }
        }
    }

    let values = match model.derive_assignment(&volumes) {
        Ok(values) => values,
        Err(e) => return BlendOutcome::Unknown(fail(e)),
    };
    if let Err(e) = model.cp_model().check_assignment(&values) {
        warn!(error = %e, "solver bindings violate the blend model");
        return BlendOutcome::Unknown(fail(format!("rejected solver bindings: {e}")));
    }

    let engine = model.engine();
    let shares = model
        .materials()
        .iter()
        .zip(&volumes)
        .map(|(m, &units)| MaterialShare {
            id: m.id.clone(),
            name: m.name.clone(),
            units,
            percent: engine.units_to_percent(units),
        })
        .collect();

    let sieves = (0..model.sieve_count())
        .map(|s| {
            let mix = values[&mix_pass_var(s)];
            let target = model.target_units()[s];
            SieveResult {
                target_percent: engine.mixture_units_to_percent(target),
                achieved_percent: engine.mixture_units_to_percent(mix),
                deviation_percent: engine.mixture_units_to_percent(mix - target),
            }
        })
        .collect();

    // check_assignment passed, so every absolute deviation is within its
    // domain and the sum is bounded by objective_max.
    let objective_units = model
        .cp_model()
        .objective_value(&values)
        .map(|v| v as i64)
        .unwrap_or(0);

    BlendOutcome::Solved(BlendSolution {
        status: solution.status,
        shares,
        sieves,
        objective_units,
        total_abs_deviation: engine.mixture_units_to_percent(objective_units),
        solve_time_ms: solution.solve_time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::{BlendModelBuilder, Material, ScalingConfig, TargetProfile};
    use std::collections::HashMap;

    fn model_a() -> BlendModel {
        let materials = vec![
            Material::new("M1", "Coarse", vec![0.70, 0.30]),
            Material::new("M2", "Fine", vec![0.90, 0.75]),
        ];
        let target = TargetProfile::new(vec![0.80, 0.50]);
        BlendModelBuilder::new(&materials, &target, &[], &ScalingConfig::new(0))
            .unwrap()
            .build()
            .unwrap()
    }

    fn bound(status: SolverStatus, pairs: &[(&str, i64)]) -> CpSolution {
        let mut solution = CpSolution::empty(status);
        solution.int_vars = pairs
            .iter()
            .map(|(n, v)| (n.to_string(), *v))
            .collect::<HashMap<_, _>>();
        solution
    }

    #[test]
    fn test_optimal_bindings() {
        let model = model_a();
        let outcome = interpret(
            &model,
            &bound(
                SolverStatus::Optimal,
                &[("volume[M1]", 5_555), ("volume[M2]", 4_445)],
            ),
        );

        let solution = outcome.solution().expect("solved");
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert!((solution.share("M1").unwrap().percent - 55.55).abs() < 1e-9);
        assert!((solution.share("M2").unwrap().percent - 44.45).abs() < 1e-9);
        assert!((solution.total_percent() - 100.0).abs() < 1e-9);
        assert_eq!(solution.objective_units, 11_125);
        assert!((solution.total_abs_deviation - 1.1125).abs() < 1e-9);

        let s0 = &solution.sieves[0];
        assert!((s0.target_percent - 80.0).abs() < 1e-9);
        assert!((s0.achieved_percent - 78.89).abs() < 1e-9);
        assert!((s0.deviation_percent + 1.11).abs() < 1e-9);
    }

    #[test]
    fn test_feasible_status_is_kept() {
        let model = model_a();
        let outcome = interpret(
            &model,
            &bound(
                SolverStatus::Feasible,
                &[("volume[M1]", 10_000), ("volume[M2]", 0)],
            ),
        );
        assert_eq!(outcome.status(), SolverStatus::Feasible);
        assert!(outcome.is_solved());
    }

    #[test]
    fn test_infeasible() {
        let model = model_a();
        let solution =
            CpSolution::empty(SolverStatus::Infeasible).with_diagnostics("Infeasible");
        let outcome = interpret(&model, &solution);
        assert!(outcome.is_infeasible());
        assert_eq!(outcome.status(), SolverStatus::Infeasible);
        assert!(outcome.solution().is_none());
    }

    #[test]
    fn test_unknown_statuses() {
        let model = model_a();
        for status in [
            SolverStatus::Unknown,
            SolverStatus::Timeout,
            SolverStatus::Unbounded,
            SolverStatus::ModelInvalid,
        ] {
            let outcome = interpret(&model, &CpSolution::empty(status));
            let BlendOutcome::Unknown(failure) = outcome else {
                panic!("{status:?} must map to Unknown");
            };
            assert_eq!(failure.status, status);
            assert!(!failure.diagnostics.is_empty());
        }
    }

    #[test]
    fn test_missing_binding() {
        let model = model_a();
        let outcome = interpret(
            &model,
            &bound(SolverStatus::Optimal, &[("volume[M1]", 10_000)]),
        );
        let BlendOutcome::Unknown(failure) = outcome else {
            panic!("missing binding must not be reported as solved");
        };
        assert!(failure.diagnostics.contains("volume[M2]"));
    }

    #[test]
    fn test_rejects_inconsistent_bindings() {
        let model = model_a();
        // Shares summing to 90 %.
        let outcome = interpret(
            &model,
            &bound(
                SolverStatus::Optimal,
                &[("volume[M1]", 5_000), ("volume[M2]", 4_000)],
            ),
        );
        assert!(matches!(outcome, BlendOutcome::Unknown(_)));
        assert_eq!(outcome.status(), SolverStatus::Optimal);
    }
}
