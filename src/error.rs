//! Build-time errors.
//!
//! Solver outcomes (infeasible, unknown) are not errors; they are
//! returned as [`BlendOutcome`](crate::blend::BlendOutcome) values.

use thiserror::Error;

/// Errors raised while validating inputs or building a blend model.
///
/// Both variants are reported before any solver is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlendError {
    /// Invalid scaling or solver configuration (negative precision,
    /// integer overflow of the scaled domains).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Empty or mismatched material/target collections, out-of-range
    /// fractions, unknown material ids.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, BlendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = BlendError::Configuration("decimal_precision must be non-negative".into());
        assert_eq!(
            err.to_string(),
            "configuration error: decimal_precision must be non-negative"
        );

        let err = BlendError::InvalidInput("materials must not be empty".into());
        assert_eq!(err.to_string(), "invalid input: materials must not be empty");
    }
}
