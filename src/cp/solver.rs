//! CP solver interface.

use super::model::CpModel;
use std::collections::HashMap;

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible (but not necessarily optimal) solution found.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// The objective can be improved without limit.
    Unbounded,
    /// Model is invalid or malformed.
    ModelInvalid,
    /// Solver exceeded time limit.
    Timeout,
    /// No solution found for unknown reasons.
    Unknown,
}

impl SolverStatus {
    /// Whether this status carries a usable assignment.
    pub fn has_solution(self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

/// Solution from a CP solver.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective function value (if any), as reported by the solver.
    pub objective_value: Option<f64>,
    /// Integer variable assignments.
    pub int_vars: HashMap<String, i64>,
    /// Free-form diagnostic text from the solver (error messages,
    /// statistics).
    pub diagnostics: Option<String>,
    /// Solve time in milliseconds.
    pub solve_time_ms: i64,
}

impl CpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            int_vars: HashMap::new(),
            diagnostics: None,
            solve_time_ms: 0,
        }
    }

    /// Attaches diagnostic text.
    pub fn with_diagnostics(mut self, text: impl Into<String>) -> Self {
        self.diagnostics = Some(text.into());
        self
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        self.status.has_solution()
    }

    /// Value assigned to an integer variable.
    pub fn int_value(&self, name: &str) -> Option<i64> {
        self.int_vars.get(name).copied()
    }
}

/// Solver configuration.
///
/// Budget parameters are fixed before submission; there is no
/// mid-solve cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Maximum solve time in milliseconds.
    pub time_limit_ms: i64,
    /// Number of parallel workers.
    pub num_workers: usize,
    /// Stop after finding the first feasible solution.
    pub stop_after_first: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 60_000,
            num_workers: 1,
            stop_after_first: false,
        }
    }
}

impl SolverConfig {
    /// Sets the time limit in milliseconds.
    pub fn with_time_limit_ms(mut self, ms: i64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Sets the number of workers.
    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    /// Stop at the first feasible solution instead of proving optimality.
    pub fn with_stop_after_first(mut self, stop: bool) -> Self {
        self.stop_after_first = stop;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.time_limit_ms <= 0 {
            return Err("time_limit_ms must be positive".into());
        }
        if self.num_workers == 0 {
            return Err("num_workers must be at least 1".into());
        }
        Ok(())
    }
}

/// Trait for CP solver implementations.
///
/// Implementors provide the actual constraint solving logic and must
/// treat the model as read-only. This can wrap external engines
/// (MILP libraries, CP-SAT) or custom search.
pub trait CpSolver {
    /// Solves the model and returns a solution.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;

    /// Checks, without solving, that this solver can represent `model`.
    ///
    /// `solve` reports the same failure as [`SolverStatus::ModelInvalid`].
    fn check_model(&self, model: &CpModel) -> Result<(), String> {
        model.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_config_default() {
        let config = SolverConfig::default();
        assert_eq!(config.time_limit_ms, 60_000);
        assert_eq!(config.num_workers, 1);
        assert!(!config.stop_after_first);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_solver_config_builder() {
        let config = SolverConfig::default()
            .with_time_limit_ms(5_000)
            .with_num_workers(4)
            .with_stop_after_first(true);
        assert_eq!(config.time_limit_ms, 5_000);
        assert_eq!(config.num_workers, 4);
        assert!(config.stop_after_first);
    }

    #[test]
    fn test_solver_config_invalid() {
        assert!(SolverConfig::default()
            .with_time_limit_ms(0)
            .validate()
            .is_err());
        assert!(SolverConfig::default()
            .with_num_workers(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_status_has_solution() {
        assert!(SolverStatus::Optimal.has_solution());
        assert!(SolverStatus::Feasible.has_solution());
        assert!(!SolverStatus::Infeasible.has_solution());
        assert!(!SolverStatus::Unbounded.has_solution());
        assert!(!SolverStatus::Timeout.has_solution());
        assert!(!SolverStatus::ModelInvalid.has_solution());
        assert!(!SolverStatus::Unknown.has_solution());
    }

    #[test]
    fn test_empty_solution() {
        let solution = CpSolution::empty(SolverStatus::Infeasible).with_diagnostics("no bindings");
        assert!(!solution.is_solution_found());
        assert_eq!(solution.int_value("x"), None);
        assert_eq!(solution.diagnostics.as_deref(), Some("no bindings"));
    }
}
