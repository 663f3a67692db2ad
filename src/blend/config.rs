//! Blend configuration.
//!
//! [`ScalingConfig`] controls how percentages become integers;
//! [`BlendConfig`] bundles it with the solver budget.

use crate::cp::SolverConfig;
use crate::error::{BlendError, Result};

/// Decimal precision of the integer model.
///
/// `multiplier = 100 · 10^decimal_precision`. Volume shares are modeled in
/// units of `1 / multiplier` percent, so `decimal_precision = 0` already
/// resolves shares to 0.01 %.
///
/// # Examples
///
/// ```
/// use u_blend::blend::ScalingConfig;
///
/// let config = ScalingConfig::default();
/// assert_eq!(config.decimal_precision, 2);
/// assert_eq!(config.multiplier().unwrap(), 10_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalingConfig {
    /// Number of decimal digits of percentage precision preserved.
    ///
    /// Signed so that configuration read from external sources can be
    /// rejected with a descriptive error rather than wrapping.
    pub decimal_precision: i32,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            decimal_precision: 2,
        }
    }
}

impl ScalingConfig {
    pub fn new(decimal_precision: i32) -> Self {
        Self { decimal_precision }
    }

    /// `100 · 10^decimal_precision`, or a configuration error if the
    /// precision is negative or the multiplier overflows `i64`.
    pub fn multiplier(&self) -> Result<i64> {
        if self.decimal_precision < 0 {
            return Err(BlendError::Configuration(format!(
                "decimal_precision must be non-negative, got {}",
                self.decimal_precision
            )));
        }
        10i64
            .checked_pow(self.decimal_precision as u32)
            .and_then(|p| p.checked_mul(100))
            .ok_or_else(|| {
                BlendError::Configuration(format!(
                    "decimal_precision {} overflows the integer domain",
                    self.decimal_precision
                ))
            })
    }

    /// Validates the configuration for a model with `sieve_count` sieves.
    ///
    /// Besides the multiplier itself, `(100 · multiplier)²` (the widest
    /// per-sieve domain) and `sieve_count · (100 · multiplier)²` (the
    /// objective's range) must fit in `i64`.
    pub fn check_capacity(&self, sieve_count: usize) -> Result<()> {
        let multiplier = self.multiplier()?;
        let overflow = || {
            BlendError::Configuration(format!(
                "decimal_precision {} with {sieve_count} sieves overflows the integer domain",
                self.decimal_precision
            ))
        };
        let total = multiplier.checked_mul(100).ok_or_else(overflow)?;
        let squared = total.checked_mul(total).ok_or_else(overflow)?;
        let sieves = i64::try_from(sieve_count).map_err(|_| overflow())?;
        squared.checked_mul(sieves).ok_or_else(overflow)?;
        Ok(())
    }

    /// Validates the configuration independently of problem size.
    pub fn validate(&self) -> Result<()> {
        self.check_capacity(1)
    }
}

/// Configuration for a blend solve.
///
/// # Builder Pattern
///
/// ```
/// use u_blend::blend::BlendConfig;
///
/// let config = BlendConfig::default()
///     .with_decimal_precision(1)
///     .with_time_limit_ms(5_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlendConfig {
    /// Integer scaling.
    pub scaling: ScalingConfig,
    /// Budget handed to the solver before submission.
    pub solver: SolverConfig,
}

impl BlendConfig {
    /// Sets the decimal precision.
    pub fn with_decimal_precision(mut self, decimal_precision: i32) -> Self {
        self.scaling.decimal_precision = decimal_precision;
        self
    }

    /// Sets the solver time limit in milliseconds.
    pub fn with_time_limit_ms(mut self, ms: i64) -> Self {
        self.solver.time_limit_ms = ms;
        self
    }

    /// Sets the number of solver workers.
    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.solver.num_workers = n;
        self
    }

    /// Sets the full solver configuration.
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Preset for quick checks: whole-percent pass fractions,
    /// shares resolved to 0.01 %.
    ///
    /// - Precision: 0, Time limit: 10s
    pub fn coarse() -> Self {
        Self::default()
            .with_decimal_precision(0)
            .with_time_limit_ms(10_000)
    }

    /// Preset for laboratory-grade inputs.
    ///
    /// - Precision: 3, Time limit: 60s
    pub fn fine() -> Self {
        Self::default()
            .with_decimal_precision(3)
            .with_time_limit_ms(60_000)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.scaling.validate()?;
        self.solver.validate().map_err(BlendError::Configuration)
    }
}
