//! CP model definition.

use super::variables::{IntVar, LinearExpr};
use std::collections::HashMap;

/// Relation between the two sides of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `lhs == rhs`
    Eq,
    /// `lhs <= rhs`
    Le,
    /// `lhs >= rhs`
    Ge,
}

impl Relation {
    fn holds(self, lhs: i128, rhs: i128) -> bool {
        match self {
            Relation::Eq => lhs == rhs,
            Relation::Le => lhs <= rhs,
            Relation::Ge => lhs >= rhs,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Relation::Eq => "==",
            Relation::Le => "<=",
            Relation::Ge => ">=",
        }
    }
}

/// A constraint in the CP model.
///
/// Only the primitives an integer blending model needs: linear
/// relations and an exact absolute-value equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Linear constraint: `expr <relation> rhs`.
    Linear {
        /// Left-hand side (its constant is part of the expression).
        expr: LinearExpr,
        /// Relation to the right-hand side.
        relation: Relation,
        /// Right-hand side constant.
        rhs: i64,
    },

    /// Absolute-value equality: `target == |source|`.
    ///
    /// This is an exact equality, not the `target >= ±source`
    /// relaxation: a solver must never report an assignment where
    /// `target` exceeds `|source|`.
    AbsEquality {
        /// Variable receiving the absolute value.
        target: String,
        /// Variable whose absolute value is taken.
        source: String,
    },
}

/// Objective function for the CP model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Objective {
    /// Minimize a linear combination of integer variables.
    Minimize {
        /// (variable_name, coefficient) pairs.
        terms: Vec<(String, i64)>,
    },

    /// Maximize a linear combination of integer variables.
    Maximize {
        /// (variable_name, coefficient) pairs.
        terms: Vec<(String, i64)>,
    },
}

impl Objective {
    /// The (variable_name, coefficient) pairs of the objective.
    pub fn terms(&self) -> &[(String, i64)] {
        match self {
            Objective::Minimize { terms } | Objective::Maximize { terms } => terms,
        }
    }
}

/// A constraint programming model over bounded integer variables.
///
/// Contains variables, constraints, and an optional objective function.
///
/// # Examples
///
/// ```
/// use u_blend::cp::{CpModel, IntVar, LinearExpr, Objective, Relation};
///
/// let mut model = CpModel::new("example");
/// model.add_int_var(IntVar::new("x", 0, 10));
/// model.add_int_var(IntVar::new("y", 0, 10));
/// model.add_linear(LinearExpr::sum(["x", "y"]), Relation::Eq, 10);
/// model.set_objective(Objective::Minimize {
///     terms: vec![("x".into(), 1)],
/// });
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Integer variables.
    pub int_vars: HashMap<String, IntVar>,
    /// Constraints.
    pub constraints: Vec<Constraint>,
    /// Objective function.
    pub objective: Option<Objective>,
}

impl CpModel {
    /// Creates a new empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            int_vars: HashMap::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    /// Adds an integer variable.
    pub fn add_int_var(&mut self, var: IntVar) {
        self.int_vars.insert(var.name.clone(), var);
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Convenience: add a linear constraint.
    pub fn add_linear(&mut self, expr: LinearExpr, relation: Relation, rhs: i64) {
        self.constraints.push(Constraint::Linear {
            expr,
            relation,
            rhs,
        });
    }

    /// Convenience: add `target == |source|`.
    pub fn add_abs_equality(&mut self, target: impl Into<String>, source: impl Into<String>) {
        self.constraints.push(Constraint::AbsEquality {
            target: target.into(),
            source: source.into(),
        });
    }

    /// Sets the objective function.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Validates the model for consistency.
    ///
    /// Checks that all referenced variable names exist and that every
    /// declared domain is non-empty.
    pub fn validate(&self) -> Result<(), String> {
        for var in self.int_vars.values() {
            if var.min > var.max {
                return Err(format!(
                    "empty domain for {}: [{}, {}]",
                    var.name, var.min, var.max
                ));
            }
        }
        for constraint in &self.constraints {
            match constraint {
                Constraint::Linear { expr, .. } => {
                    for (name, _) in &expr.terms {
                        self.require_var(name)?;
                    }
                }
                Constraint::AbsEquality { target, source } => {
                    self.require_var(target)?;
                    self.require_var(source)?;
                }
            }
        }
        if let Some(objective) = &self.objective {
            for (name, _) in objective.terms() {
                self.require_var(name)?;
            }
        }
        Ok(())
    }

    fn require_var(&self, name: &str) -> Result<(), String> {
        if self.int_vars.contains_key(name) {
            Ok(())
        } else {
            Err(format!("undefined variable: {name}"))
        }
    }

    /// Checks a complete assignment against every domain and constraint.
    ///
    /// Returns the first violation found, described in plain text.
    pub fn check_assignment(&self, values: &HashMap<String, i64>) -> Result<(), String> {
        let mut names: Vec<&String> = self.int_vars.keys().collect();
        names.sort();
        for name in names {
            let var = &self.int_vars[name];
            let Some(&value) = values.get(name) else {
                return Err(format!("missing value for {name}"));
            };
            if !var.contains(value) {
                return Err(format!(
                    "{name} = {value} outside domain [{}, {}]",
                    var.min, var.max
                ));
            }
        }

        for (idx, constraint) in self.constraints.iter().enumerate() {
            match constraint {
                Constraint::Linear {
                    expr,
                    relation,
                    rhs,
                } => {
                    let lhs = expr
                        .evaluate(values)
                        .ok_or_else(|| format!("constraint {idx}: unbound variable"))?;
                    if !relation.holds(lhs, *rhs as i128) {
                        return Err(format!(
                            "constraint {idx}: {lhs} {} {rhs} violated",
                            relation.symbol()
                        ));
                    }
                }
                Constraint::AbsEquality { target, source } => {
                    let (Some(&t), Some(&s)) = (values.get(target), values.get(source)) else {
                        return Err(format!("constraint {idx}: unbound variable"));
                    };
                    if t as i128 != (s as i128).abs() {
                        return Err(format!(
                            "constraint {idx}: {target} = {t} but |{source}| = {}",
                            (s as i128).abs()
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Evaluates the objective under an assignment.
    pub fn objective_value(&self, values: &HashMap<String, i64>) -> Option<i128> {
        let objective = self.objective.as_ref()?;
        let mut acc = 0i128;
        for (name, coef) in objective.terms() {
            acc += *coef as i128 * *values.get(name)? as i128;
        }
        Some(acc)
    }

    /// Returns the number of integer variables.
    pub fn var_count(&self) -> usize {
        self.int_vars.len()
    }

    /// Returns the number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}
