//! MILP-backed CP solver.
//!
//! [`MilpSolver`] translates a [`CpModel`] into a mixed-integer linear
//! program through [`good_lp`] and solves it with the pure-Rust `microlp`
//! branch-and-bound engine.
//!
//! # Columns
//!
//! Plain [`IntVar`]s become integer columns, which the engine limits to
//! the `i32` range. [Implied](IntVar::implied) variables become continuous
//! columns scaled by a power of two, so that their values stay on the same
//! order as the integer columns. Scaling by powers of two keeps every
//! coefficient and bound exact.
//!
//! # Absolute values
//!
//! `target == |source|` is encoded exactly, not as the `target >= ±source`
//! relaxation:
//!
//! ```text
//! source = pos - neg          pos, neg in [0, M]
//! target = pos + neg          sign in {0, 1}
//! pos <= M * sign
//! neg <= M * (1 - sign)
//! ```
//!
//! `M` is the magnitude of the source variable's declared domain. The sign
//! indicator is dropped when the objective minimizes `target` with a
//! positive weight and nothing else constrains it: every optimum then has
//! `pos · neg == 0`.

use super::model::{Constraint, CpModel, Objective, Relation};
use super::solver::{CpSolution, CpSolver, SolverConfig, SolverStatus};
use super::variables::IntVar;
use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolutionStatus, SolverModel, Variable, WithMipGap, WithTimeLimit,
};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::debug;

/// Largest magnitude an `f64` represents with unit precision.
pub const EXACT_F64_LIMIT: u64 = 1 << 53;

/// CP solver backed by a MILP engine.
///
/// Single-threaded; `num_workers` is ignored. `time_limit_ms` is passed
/// to the engine, and `stop_after_first` accepts the first incumbent
/// without closing the optimality gap.
///
/// Values reported for implied variables are rounded from continuous
/// columns and may be off by a few units on very wide domains. Integer
/// columns are exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpSolver;

impl MilpSolver {
    /// Creates the solver. It holds no state; one instance may serve any
    /// number of solves.
    pub fn new() -> Self {
        Self
    }
}

/// A model variable as an engine column: `value = scale · column`.
#[derive(Clone, Copy)]
struct Column {
    var: Variable,
    scale: f64,
}

struct AbsSplit {
    target: Column,
    source: Column,
    pos: Variable,
    neg: Variable,
    /// `None` when the split is exact without an indicator.
    sign: Option<Variable>,
    /// Big-M in units of `source.scale`.
    big_m: f64,
}

impl CpSolver for MilpSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        if let Err(e) = self.check_model(model) {
            return CpSolution::empty(SolverStatus::ModelInvalid).with_diagnostics(e);
        }

        debug!(
            model = %model.name,
            vars = model.var_count(),
            constraints = model.constraint_count(),
            time_limit_ms = config.time_limit_ms,
            "building MILP"
        );

        let start_time = Instant::now();

        // Sorted for a deterministic column order.
        let mut names: Vec<&String> = model.int_vars.keys().collect();
        names.sort();

        let unit = integer_magnitude(model);
        let mut vars = ProblemVariables::new();
        let mut columns: HashMap<&str, Column> = HashMap::with_capacity(names.len());
        for name in &names {
            let v = &model.int_vars[name.as_str()];
            let column = if v.implied {
                let scale = column_scale(v.magnitude(), unit);
                Column {
                    var: vars.add(
                        variable()
                            .min(v.min as f64 / scale)
                            .max(v.max as f64 / scale),
                    ),
                    scale,
                }
            } else {
                Column {
                    var: vars.add(variable().integer().min(v.min as f64).max(v.max as f64)),
                    scale: 1.0,
                }
            };
            columns.insert(name.as_str(), column);
        }

        let relaxable = relaxable_abs_targets(model);
        let mut splits = Vec::new();
        for c in &model.constraints {
            if let Constraint::AbsEquality { target, source } = c {
                let source_col = columns[source.as_str()];
                let big_m = model.int_vars[source].magnitude() as f64 / source_col.scale;
                splits.push(AbsSplit {
                    target: columns[target.as_str()],
                    source: source_col,
                    pos: vars.add(variable().min(0.0).max(big_m)),
                    neg: vars.add(variable().min(0.0).max(big_m)),
                    sign: (!relaxable.contains(target.as_str()))
                        .then(|| vars.add(variable().binary())),
                    big_m,
                });
            }
        }

        let objective = model
            .objective
            .as_ref()
            .map(|o| objective_expression(o.terms(), &columns))
            .unwrap_or_default();
        let unsolved = match &model.objective {
            Some(Objective::Maximize { .. }) => vars.maximise(objective),
            _ => vars.minimise(objective),
        };
        let mut problem = unsolved.using(microlp);
        if config.time_limit_ms > 0 {
            problem = problem.with_time_limit(config.time_limit_ms as f64 / 1000.0);
        }
        if config.stop_after_first {
            problem = match problem.with_mip_gap(f32::MAX) {
                Ok(p) => p,
                Err(e) => {
                    return CpSolution::empty(SolverStatus::ModelInvalid)
                        .with_diagnostics(e.to_string())
                }
            };
        }

        for c in &model.constraints {
            if let Constraint::Linear {
                expr,
                relation,
                rhs,
            } = c
            {
                let lhs = terms_expression(&expr.terms, &columns);
                // Move the expression's constant to the right-hand side.
                let rhs = (*rhs as i128 - expr.constant as i128) as f64;
                problem = problem.with(match relation {
                    Relation::Eq => constraint::eq(lhs, rhs),
                    Relation::Le => constraint::leq(lhs, rhs),
                    Relation::Ge => constraint::geq(lhs, rhs),
                });
            }
        }

        for s in &splits {
            // Both sides in units of the source column.
            let mut source = Expression::with_capacity(3);
            source.add_mul(1.0, s.source.var);
            source.add_mul(-1.0, s.pos);
            source.add_mul(1.0, s.neg);
            problem = problem.with(constraint::eq(source, 0.0));

            let mut target = Expression::with_capacity(3);
            target.add_mul(s.target.scale, s.target.var);
            target.add_mul(-s.source.scale, s.pos);
            target.add_mul(-s.source.scale, s.neg);
            problem = problem.with(constraint::eq(target, 0.0));

            if let Some(sign) = s.sign {
                problem = problem
                    .with(constraint::leq(s.pos - s.big_m * sign, 0.0))
                    .with(constraint::leq(s.neg + s.big_m * sign, s.big_m));
            }
        }

        let result = problem.solve();
        let solve_time_ms = start_time.elapsed().as_millis() as i64;

        match result {
            Ok(solution) => {
                let status = match solution.status() {
                    SolutionStatus::Optimal => SolverStatus::Optimal,
                    SolutionStatus::TimeLimit | SolutionStatus::GapLimit => {
                        SolverStatus::Feasible
                    }
                };
                let value = |c: &Column| solution.value(c.var) * c.scale;
                let int_vars: HashMap<String, i64> = columns
                    .iter()
                    .map(|(name, c)| (name.to_string(), value(c).round() as i64))
                    .collect();
                let objective_value = model.objective.as_ref().map(|o| {
                    o.terms()
                        .iter()
                        .map(|(name, coef)| *coef as f64 * value(&columns[name.as_str()]))
                        .sum()
                });
                debug!(model = %model.name, ?status, solve_time_ms, "MILP solved");
                CpSolution {
                    status,
                    objective_value,
                    int_vars,
                    diagnostics: None,
                    solve_time_ms,
                }
            }
            Err(e) => {
                let status = match &e {
                    ResolutionError::Infeasible => SolverStatus::Infeasible,
                    ResolutionError::Unbounded => SolverStatus::Unbounded,
                    ResolutionError::Other(msg) if msg.starts_with("Time limit") => {
                        SolverStatus::Timeout
                    }
                    _ => SolverStatus::Unknown,
                };
                debug!(model = %model.name, ?status, error = %e, "MILP failed");
                let mut solution = CpSolution::empty(status).with_diagnostics(e.to_string());
                solution.solve_time_ms = solve_time_ms;
                solution
            }
        }
    }

    /// Rejects models the engine cannot represent exactly: integer
    /// domains beyond `i32`, and bounds, coefficients or constraint spans
    /// beyond [`EXACT_F64_LIMIT`].
    fn check_model(&self, model: &CpModel) -> Result<(), String> {
        model.validate()?;
        check_magnitudes(model)
    }
}

fn terms_expression(terms: &[(String, i64)], columns: &HashMap<&str, Column>) -> Expression {
    let mut out = Expression::with_capacity(terms.len());
    for (name, coef) in terms {
        if *coef != 0 {
            let c = columns[name.as_str()];
            out.add_mul(*coef as f64 * c.scale, c.var);
        }
    }
    out
}

/// Objective with its largest coefficient brought into `(1/2, 1]`.
fn objective_expression(terms: &[(String, i64)], columns: &HashMap<&str, Column>) -> Expression {
    let largest = terms
        .iter()
        .map(|(name, coef)| (*coef as f64 * columns[name.as_str()].scale).abs())
        .fold(0.0, f64::max);
    if largest == 0.0 {
        return Expression::default();
    }
    let norm = 2f64.powi(largest.log2().ceil() as i32);
    let mut out = Expression::with_capacity(terms.len());
    for (name, coef) in terms {
        if *coef != 0 {
            let c = columns[name.as_str()];
            out.add_mul(*coef as f64 * c.scale / norm, c.var);
        }
    }
    out
}

/// Largest magnitude among integer columns, at least 1.
fn integer_magnitude(model: &CpModel) -> u64 {
    model
        .int_vars
        .values()
        .filter(|v| !v.implied)
        .map(IntVar::magnitude)
        .fold(1, u64::max)
}

/// Largest power of two not above `magnitude / unit`, at least 1.
fn column_scale(magnitude: u64, unit: u64) -> f64 {
    let ratio = magnitude / unit.max(1);
    if ratio <= 1 {
        1.0
    } else {
        (1u64 << (63 - ratio.leading_zeros())) as f64
    }
}

/// Targets of `target == |source|` that the objective alone keeps exact.
///
/// A target qualifies when it is minimized with positive total weight,
/// its lower bound admits zero, and it appears in no other constraint.
fn relaxable_abs_targets(model: &CpModel) -> HashSet<&str> {
    let Some(Objective::Minimize { terms }) = &model.objective else {
        return HashSet::new();
    };
    let mut weight: HashMap<&str, i128> = HashMap::new();
    for (name, coef) in terms {
        *weight.entry(name.as_str()).or_default() += *coef as i128;
    }

    let mut uses: HashMap<&str, usize> = HashMap::new();
    for c in &model.constraints {
        match c {
            Constraint::Linear { expr, .. } => {
                for (name, _) in &expr.terms {
                    *uses.entry(name.as_str()).or_default() += 1;
                }
            }
            Constraint::AbsEquality { target, source } => {
                *uses.entry(target.as_str()).or_default() += 1;
                *uses.entry(source.as_str()).or_default() += 1;
            }
        }
    }

    model
        .constraints
        .iter()
        .filter_map(|c| match c {
            Constraint::AbsEquality { target, .. } => Some(target.as_str()),
            _ => None,
        })
        .filter(|t| {
            weight.get(t).is_some_and(|w| *w > 0)
                && uses.get(t) == Some(&1)
                && model.int_vars[*t].min <= 0
        })
        .collect()
}

/// Rejects models whose integer domains exceed the engine's `i32` columns
/// or whose bounds, coefficients or partial sums could not be represented
/// exactly in `f64`.
fn check_magnitudes(model: &CpModel) -> Result<(), String> {
    let limit = EXACT_F64_LIMIT as u128;
    let mut names: Vec<&String> = model.int_vars.keys().collect();
    names.sort();
    for name in names {
        let var = &model.int_vars[name];
        if var.magnitude() as u128 > limit {
            return Err(format!(
                "domain of {} exceeds exact f64 range (2^53)",
                var.name
            ));
        }
        if !var.implied && (i32::try_from(var.min).is_err() || i32::try_from(var.max).is_err()) {
            return Err(format!(
                "integer variable {} with domain [{}, {}] exceeds the engine's i32 range",
                var.name, var.min, var.max
            ));
        }
    }
    for (idx, c) in model.constraints.iter().enumerate() {
        if let Constraint::Linear { expr, rhs, .. } = c {
            let mut reach = expr.constant.unsigned_abs() as u128;
            for (name, coef) in &expr.terms {
                reach += coef.unsigned_abs() as u128 * model.int_vars[name].magnitude() as u128;
            }
            if reach > limit || rhs.unsigned_abs() as u128 > limit {
                return Err(format!(
                    "constraint {idx} spans beyond exact f64 range (2^53)"
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{IntVar, LinearExpr, Objective};

    /// x in [0, 10], d = x - 3, a = |d|.
    fn abs_model() -> CpModel {
        let mut model = CpModel::new("abs");
        model.add_int_var(IntVar::new("x", 0, 10));
        model.add_int_var(IntVar::new("d", -10, 10));
        model.add_int_var(IntVar::new("a", 0, 10));
        model.add_linear(
            LinearExpr::var("x").with_term("d", -1),
            Relation::Eq,
            3,
        );
        model.add_abs_equality("a", "d");
        model
    }

    #[test]
    fn test_linear_minimize() {
        let mut model = CpModel::new("lin");
        model.add_int_var(IntVar::new("x", 0, 100));
        model.add_int_var(IntVar::new("y", 0, 100));
        model.add_linear(LinearExpr::sum(["x", "y"]), Relation::Eq, 100);
        model.add_linear(LinearExpr::var("x"), Relation::Ge, 30);
        model.set_objective(Objective::Minimize {
            terms: vec![("x".into(), 2), ("y".into(), 3)],
        });

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());

        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.int_value("x"), Some(100));
        assert_eq!(solution.int_value("y"), Some(0));
        assert!((solution.objective_value.unwrap() - 200.0).abs() < 1e-6);
        assert!(model.check_assignment(&solution.int_vars).is_ok());
    }

    #[test]
    fn test_abs_minimize() {
        let mut model = abs_model();
        model.set_objective(Objective::Minimize {
            terms: vec![("a".into(), 1)],
        });

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());

        assert!(solution.is_solution_found());
        assert_eq!(solution.int_value("x"), Some(3));
        assert_eq!(solution.int_value("a"), Some(0));
    }

    #[test]
    fn test_abs_is_exact_under_maximize() {
        // With the a >= |d| relaxation, maximizing would push a to its
        // upper bound 10 regardless of x. The exact encoding caps a at
        // |10 - 3| = 7.
        let mut model = abs_model();
        model.set_objective(Objective::Maximize {
            terms: vec![("a".into(), 1)],
        });

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());

        assert!(solution.is_solution_found());
        assert_eq!(solution.int_value("a"), Some(7));
        assert_eq!(solution.int_value("x"), Some(10));
        assert!(model.check_assignment(&solution.int_vars).is_ok());
    }

    #[test]
    fn test_negative_source() {
        let mut model = abs_model();
        model.add_linear(LinearExpr::var("x"), Relation::Le, 1);
        model.set_objective(Objective::Minimize {
            terms: vec![("a".into(), 1)],
        });

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());

        assert!(solution.is_solution_found());
        assert_eq!(solution.int_value("x"), Some(1));
        assert_eq!(solution.int_value("d"), Some(-2));
        assert_eq!(solution.int_value("a"), Some(2));
    }

    #[test]
    fn test_infeasible() {
        let mut model = CpModel::new("infeasible");
        model.add_int_var(IntVar::new("x", 0, 10));
        model.add_linear(LinearExpr::var("x"), Relation::Ge, 5);
        model.add_linear(LinearExpr::var("x"), Relation::Le, 4);

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());

        assert_eq!(solution.status, SolverStatus::Infeasible);
        assert!(solution.int_vars.is_empty());
        assert!(solution.diagnostics.is_some());
    }

    #[test]
    fn test_invalid_model() {
        let mut model = CpModel::new("invalid");
        model.add_linear(LinearExpr::var("nonexistent"), Relation::Eq, 1);

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());

        assert_eq!(solution.status, SolverStatus::ModelInvalid);
        assert!(solution
            .diagnostics
            .as_deref()
            .unwrap()
            .contains("nonexistent"));
    }

    #[test]
    fn test_rejects_inexact_magnitudes() {
        let mut model = CpModel::new("huge");
        model.add_int_var(IntVar::new("x", 0, 1 << 60));

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::ModelInvalid);

        let mut model = CpModel::new("huge_span");
        model.add_int_var(IntVar::new("x", 0, 1 << 30));
        model.add_linear(LinearExpr::new().with_term("x", 1 << 30), Relation::Le, 1);

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::ModelInvalid);
    }

    #[test]
    fn test_wide_integer_domain_rejected() {
        let mut model = CpModel::new("wide");
        model.add_int_var(IntVar::new("x", 0, 1 << 40));

        let err = MilpSolver::new().check_model(&model).unwrap_err();
        assert!(err.contains("i32"), "{err}");

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::ModelInvalid);
    }

    #[test]
    fn test_implied_columns_take_wide_domains() {
        // x + y = 10^6, mix = 7000x + 9000y, dev = mix - 8·10^9, a = |dev|.
        let wide = 1_000_000_000_000;
        let mut model = CpModel::new("implied");
        model.add_int_var(IntVar::new("x", 0, 1_000_000));
        model.add_int_var(IntVar::new("y", 0, 1_000_000));
        model.add_int_var(IntVar::implied("mix", 0, wide));
        model.add_int_var(IntVar::implied("dev", -wide, wide));
        model.add_int_var(IntVar::implied("a", 0, wide));
        model.add_linear(LinearExpr::sum(["x", "y"]), Relation::Eq, 1_000_000);
        model.add_linear(
            LinearExpr::new()
                .with_term("x", 7_000)
                .with_term("y", 9_000)
                .with_term("mix", -1),
            Relation::Eq,
            0,
        );
        model.add_linear(
            LinearExpr::var("mix").with_term("dev", -1),
            Relation::Eq,
            8_000_000_000,
        );
        model.add_abs_equality("a", "dev");
        model.set_objective(Objective::Minimize {
            terms: vec![("a".into(), 1)],
        });
        assert!(MilpSolver::new().check_model(&model).is_ok());

        let solution = MilpSolver::new().solve(&model, &SolverConfig::default());

        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.int_value("x"), Some(500_000));
        assert_eq!(solution.int_value("y"), Some(500_000));
    }

    #[test]
    fn test_relaxable_abs_targets() {
        let mut model = abs_model();
        model.set_objective(Objective::Minimize {
            terms: vec![("a".into(), 1)],
        });
        assert!(relaxable_abs_targets(&model).contains("a"));

        // A constrained target needs the indicator.
        let mut constrained = model.clone();
        constrained.add_linear(LinearExpr::var("a"), Relation::Le, 5);
        assert!(relaxable_abs_targets(&constrained).is_empty());

        // A target that cannot be zero needs it too.
        let mut positive = model.clone();
        positive.add_int_var(IntVar::new("a", 2, 10));
        assert!(relaxable_abs_targets(&positive).is_empty());

        model.set_objective(Objective::Maximize {
            terms: vec![("a".into(), 1)],
        });
        assert!(relaxable_abs_targets(&model).is_empty());
    }

    #[test]
    fn test_column_scale() {
        assert_eq!(column_scale(100_000_000, 10_000), 8_192.0);
        assert_eq!(column_scale(5, 10), 1.0);
        assert_eq!(column_scale(0, 1), 1.0);
        assert_eq!(column_scale(1 << 40, 1), (1u64 << 40) as f64);
    }

    #[test]
    fn test_stop_after_first() {
        let mut model = abs_model();
        model.set_objective(Objective::Minimize {
            terms: vec![("a".into(), 1)],
        });
        let config = SolverConfig::default().with_stop_after_first(true);

        let solution = MilpSolver::new().solve(&model, &config);

        assert!(solution.is_solution_found());
        assert!(model.check_assignment(&solution.int_vars).is_ok());
    }
}
