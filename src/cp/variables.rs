//! CP variable and expression types.

use std::collections::HashMap;

/// An integer variable with a domain [min, max].
///
/// Represents a decision or derived variable that takes integer values
/// within the specified bounds. Can be fixed to a single value.
///
/// A variable marked `implied` is integral in every feasible assignment
/// because equality or absolute-value constraints tie it to other integer
/// variables with integer coefficients. Backends may drop its
/// integrality requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntVar {
    /// Variable name (unique identifier within a model).
    pub name: String,
    /// Minimum value.
    pub min: i64,
    /// Maximum value.
    pub max: i64,
    /// Fixed value, if any.
    pub fixed: Option<i64>,
    /// Integrality follows from the constraints.
    pub implied: bool,
}

impl IntVar {
    /// Creates a new integer variable with the given bounds.
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            fixed: None,
            implied: false,
        }
    }

    /// Creates a variable whose integrality is implied by the model.
    pub fn implied(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            implied: true,
            ..Self::new(name, min, max)
        }
    }

    /// Creates a fixed integer variable.
    pub fn fixed(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            min: value,
            max: value,
            fixed: Some(value),
            implied: false,
        }
    }

    /// Whether this variable is fixed to a single value.
    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }

    /// Domain size (max - min + 1), widened to avoid overflow on
    /// symmetric domains near `i64` limits.
    pub fn domain_size(&self) -> i128 {
        self.max as i128 - self.min as i128 + 1
    }

    /// Whether `value` lies inside the declared domain.
    pub fn contains(&self, value: i64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Largest absolute value the domain admits.
    ///
    /// Used as the big-M constant when linearizing absolute values.
    pub fn magnitude(&self) -> u64 {
        self.min.unsigned_abs().max(self.max.unsigned_abs())
    }
}

/// A linear expression `Σ coef·var + constant` over integer variables.
///
/// # Examples
///
/// ```
/// use u_blend::cp::LinearExpr;
///
/// let expr = LinearExpr::new()
///     .with_term("x", 3)
///     .with_term("y", -1)
///     .with_constant(10);
/// assert_eq!(expr.terms.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    /// (variable_name, coefficient) pairs.
    pub terms: Vec<(String, i64)>,
    /// Constant offset.
    pub constant: i64,
}

impl LinearExpr {
    /// Creates an empty expression (value 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Expression consisting of a single variable with coefficient 1.
    pub fn var(name: impl Into<String>) -> Self {
        Self::new().with_term(name, 1)
    }

    /// Sum of the given variables, each with coefficient 1.
    pub fn sum<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: names.into_iter().map(|n| (n.into(), 1)).collect(),
            constant: 0,
        }
    }

    /// Adds a `coef·var` term.
    pub fn with_term(mut self, name: impl Into<String>, coef: i64) -> Self {
        self.terms.push((name.into(), coef));
        self
    }

    /// Sets the constant offset.
    pub fn with_constant(mut self, constant: i64) -> Self {
        self.constant = constant;
        self
    }

    /// Evaluates the expression under an assignment.
    ///
    /// Arithmetic is carried out in `i128` so products of two scaled
    /// quantities cannot overflow. Returns `None` if a referenced variable
    /// has no value.
    pub fn evaluate(&self, values: &HashMap<String, i64>) -> Option<i128> {
        let mut acc = self.constant as i128;
        for (name, coef) in &self.terms {
            let v = *values.get(name)?;
            acc += *coef as i128 * v as i128;
        }
        Some(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_var() {
        let v = IntVar::new("x", 0, 10);
        assert_eq!(v.domain_size(), 11);
        assert!(!v.is_fixed());
        assert!(v.contains(0));
        assert!(v.contains(10));
        assert!(!v.contains(11));

        let f = IntVar::fixed("y", 5);
        assert!(f.is_fixed());
        assert_eq!(f.domain_size(), 1);
    }

    #[test]
    fn test_implied() {
        let v = IntVar::implied("mix", 0, 1 << 40);
        assert!(v.implied);
        assert!(!v.is_fixed());
        assert_eq!(v.magnitude(), 1 << 40);
        assert!(!IntVar::new("x", 0, 1).implied);
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(IntVar::new("d", -300, 200).magnitude(), 300);
        assert_eq!(IntVar::new("d", 0, 50).magnitude(), 50);
        assert_eq!(IntVar::new("d", i64::MIN, 0).magnitude(), 1u64 << 63);
    }

    #[test]
    fn test_wide_domain_size() {
        let v = IntVar::new("w", -i64::MAX, i64::MAX);
        assert_eq!(v.domain_size(), 2 * i64::MAX as i128 + 1);
    }

    #[test]
    fn test_evaluate() {
        let expr = LinearExpr::new()
            .with_term("x", 3)
            .with_term("y", -2)
            .with_constant(7);
        let mut values = HashMap::new();
        values.insert("x".to_string(), 4);
        values.insert("y".to_string(), 5);
        assert_eq!(expr.evaluate(&values), Some(12 - 10 + 7));

        values.remove("y");
        assert_eq!(expr.evaluate(&values), None);
    }

    #[test]
    fn test_evaluate_no_overflow() {
        let expr = LinearExpr::new().with_term("x", i64::MAX).with_term("y", i64::MAX);
        let mut values = HashMap::new();
        values.insert("x".to_string(), i64::MAX);
        values.insert("y".to_string(), i64::MAX);
        let expected = 2 * (i64::MAX as i128) * (i64::MAX as i128);
        assert_eq!(expr.evaluate(&values), Some(expected));
    }

    #[test]
    fn test_sum() {
        let expr = LinearExpr::sum(["a", "b", "c"]);
        assert_eq!(expr.terms.len(), 3);
        assert!(expr.terms.iter().all(|(_, c)| *c == 1));
        assert_eq!(expr.constant, 0);
    }
}
