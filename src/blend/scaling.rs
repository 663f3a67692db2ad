//! Scaling engine: real-valued fractions and percentages to exact integers.
//!
//! Units used throughout the model:
//!
//! | quantity            | unit                        | range                     |
//! |---------------------|-----------------------------|---------------------------|
//! | pass fraction       | `1 / multiplier`            | `[0, multiplier]`         |
//! | volume share        | `1 / multiplier` percent    | `[0, 100 · multiplier]`   |
//! | mixture pass, target| `1 / multiplier²` percent   | `[0, 100 · multiplier²]`  |
//!
//! A mixture pass value is the product of a pass fraction and a volume
//! share, which is why it lives on the squared scale.
//!
//! Rounding is half-away-from-zero ([`f64::round`]) everywhere.

use super::config::ScalingConfig;
use crate::error::Result;

/// Variable domain bounds derived from the scaling multiplier.
///
/// Every bound in a blend model comes from here; nothing is hardcoded in
/// the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainBounds {
    /// `100 · 10^decimal_precision`.
    pub multiplier: i64,
    /// `100 · multiplier`: the volume units of a complete blend (100 %).
    /// Volume variables live in `[0, total_volume]`.
    pub total_volume: i64,
    /// `total_volume²`: upper bound of mixture pass variables. The largest
    /// reachable mixture value is `multiplier · total_volume`, so this
    /// leaves a factor of 100 of headroom.
    pub mixture_max: i64,
    /// Deviation variables live in `[-deviation_max, deviation_max]`,
    /// absolute deviations in `[0, deviation_max]`. Equal to
    /// `mixture_max`, since both mixture and target lie in
    /// `[0, mixture_max]`.
    pub deviation_max: i64,
    /// `sieve_count · deviation_max`: range of the objective.
    pub objective_max: i64,
}

impl DomainBounds {
    /// Derives all bounds, failing with a configuration error on overflow.
    pub fn from_scaling(config: &ScalingConfig, sieve_count: usize) -> Result<Self> {
        config.check_capacity(sieve_count)?;
        let multiplier = config.multiplier()?;
        // check_capacity guarantees none of these overflow.
        let total_volume = multiplier * 100;
        let mixture_max = total_volume * total_volume;
        Ok(Self {
            multiplier,
            total_volume,
            mixture_max,
            deviation_max: mixture_max,
            objective_max: mixture_max * sieve_count as i64,
        })
    }
}

/// Converts between real-valued percentages and model units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingEngine {
    bounds: DomainBounds,
}

impl ScalingEngine {
    /// Creates an engine for a model with `sieve_count` sieves.
    pub fn new(config: &ScalingConfig, sieve_count: usize) -> Result<Self> {
        Ok(Self {
            bounds: DomainBounds::from_scaling(config, sieve_count)?,
        })
    }

    pub fn bounds(&self) -> &DomainBounds {
        &self.bounds
    }

    pub fn multiplier(&self) -> i64 {
        self.bounds.multiplier
    }

    /// Pass fraction in `[0, 1]` → `[0, multiplier]`.
    pub fn fraction_to_units(&self, fraction: f64) -> i64 {
        (fraction * self.bounds.multiplier as f64).round() as i64
    }

    /// Volume share in percent → volume units.
    pub fn percent_to_units(&self, percent: f64) -> i64 {
        (percent * self.bounds.multiplier as f64).round() as i64
    }

    /// Volume units → volume share in percent.
    pub fn units_to_percent(&self, units: i64) -> f64 {
        units as f64 / self.bounds.multiplier as f64
    }

    /// Target pass fraction → mixture units.
    ///
    /// A blend matching the target exactly has mixture value
    /// `Σ fraction_units · volume = fraction_units · total_volume`.
    pub fn target_units(&self, fraction: f64) -> i64 {
        self.fraction_to_units(fraction) * self.bounds.total_volume
    }

    /// Mixture units → pass percentage.
    pub fn mixture_units_to_percent(&self, units: i64) -> f64 {
        let m = self.bounds.multiplier as f64;
        units as f64 / (m * m)
    }

    /// Largest round-trip error of [`fraction_to_units`](Self::fraction_to_units),
    /// in percentage points: `0.5 · 10^-decimal_precision`.
    pub fn tolerance_percent(&self) -> f64 {
        50.0 / self.bounds.multiplier as f64
    }
}
