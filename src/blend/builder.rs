//! Model builder: materials and target profile → integer CP model.
//!
//! [`BlendModelBuilder::build`] runs the steps in order:
//!
//! 1. [`create_volume_variables`](BlendModelBuilder::create_volume_variables)
//! 2. [`create_mixture_pass_variables`](BlendModelBuilder::create_mixture_pass_variables)
//! 3. [`add_mixing_constraint`](BlendModelBuilder::add_mixing_constraint) per sieve
//! 4. [`add_total_volume_constraint`](BlendModelBuilder::add_total_volume_constraint)
//! 5. [`add_deviation_constraints`](BlendModelBuilder::add_deviation_constraints) per sieve
//! 6. [`add_share_constraints`](BlendModelBuilder::add_share_constraints)
//! 7. [`set_objective`](BlendModelBuilder::set_objective)
//!
//! The steps are public so that callers can assemble variants, but each
//! one checks that its prerequisites exist.

use super::config::ScalingConfig;
use super::scaling::{DomainBounds, ScalingEngine};
use super::types::{validate_fraction, validate_share, Material, ShareConstraint, TargetProfile};
use crate::cp::{CpModel, IntVar, LinearExpr, Objective, Relation};
use crate::error::{BlendError, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Name of the volume variable for a material.
pub fn volume_var(material_id: &str) -> String {
    format!("volume[{material_id}]")
}

/// Name of the mixture pass variable for a sieve.
pub fn mix_pass_var(sieve: usize) -> String {
    format!("mix_pass[{sieve}]")
}

/// Name of the signed deviation variable for a sieve.
pub fn deviation_var(sieve: usize) -> String {
    format!("deviation[{sieve}]")
}

/// Name of the absolute deviation variable for a sieve.
pub fn abs_deviation_var(sieve: usize) -> String {
    format!("abs_deviation[{sieve}]")
}

/// Identity of a material inside a built model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialRef {
    pub id: String,
    pub name: String,
}

/// Builds the integer blend model step by step.
///
/// # Examples
///
/// ```
/// use u_blend::blend::{BlendModelBuilder, Material, ScalingConfig, TargetProfile};
///
/// let materials = vec![
///     Material::new("M1", "Coarse", vec![0.70, 0.30]),
///     Material::new("M2", "Fine", vec![0.90, 0.75]),
/// ];
/// let target = TargetProfile::new(vec![0.80, 0.50]);
/// let model = BlendModelBuilder::new(&materials, &target, &[], &ScalingConfig::new(0))
///     .unwrap()
///     .build()
///     .unwrap();
/// // 2 volume + 2 × (mixture, deviation, absolute deviation)
/// assert_eq!(model.cp_model().var_count(), 8);
/// ```
pub struct BlendModelBuilder<'a> {
    materials: &'a [Material],
    target: &'a TargetProfile,
    shares: &'a [ShareConstraint],
    engine: ScalingEngine,
    model: CpModel,
    volume_vars: Vec<String>,
    mix_vars: Vec<String>,
    deviation_vars: Vec<String>,
    abs_vars: Vec<String>,
    /// `pass_units[material][sieve]`, filled by the mixing constraints.
    pass_units: Vec<Vec<i64>>,
    /// Target per sieve in mixture units.
    target_units: Vec<i64>,
}

impl<'a> BlendModelBuilder<'a> {
    /// Creates a builder. Only the scaling configuration is checked here;
    /// inputs are checked by the step that consumes them.
    pub fn new(
        materials: &'a [Material],
        target: &'a TargetProfile,
        shares: &'a [ShareConstraint],
        scaling: &ScalingConfig,
    ) -> Result<Self> {
        let sieve_count = target.sieve_count().max(1);
        let engine = ScalingEngine::new(scaling, sieve_count)?;
        Ok(Self {
            materials,
            target,
            shares,
            engine,
            model: CpModel::new("sieve_blend"),
            volume_vars: Vec::new(),
            mix_vars: Vec::new(),
            deviation_vars: Vec::new(),
            abs_vars: Vec::new(),
            pass_units: vec![vec![0; target.sieve_count()]; materials.len()],
            target_units: vec![0; target.sieve_count()],
        })
    }

    /// Analytic domain bounds used by this builder.
    pub fn bounds(&self) -> &DomainBounds {
        self.engine.bounds()
    }

    /// Number of sieves, taken from the target profile.
    pub fn sieve_count(&self) -> usize {
        self.target.sieve_count()
    }

    /// One volume variable per material, domain `[0, 100 · multiplier]`.
    pub fn create_volume_variables(&mut self) -> Result<()> {
        if self.materials.is_empty() {
            return Err(BlendError::InvalidInput("materials must not be empty".into()));
        }
        let mut seen = HashSet::with_capacity(self.materials.len());
        for material in self.materials {
            if !seen.insert(material.id.as_str()) {
                return Err(BlendError::InvalidInput(format!(
                    "duplicate material id: {}",
                    material.id
                )));
            }
        }

        let total = self.engine.bounds().total_volume;
        self.volume_vars = self
            .materials
            .iter()
            .map(|m| volume_var(&m.id))
            .collect();
        for name in &self.volume_vars {
            self.model.add_int_var(IntVar::new(name.clone(), 0, total));
        }
        Ok(())
    }

    /// One mixture pass variable per sieve, domain `[0, (100 · multiplier)²]`.
    ///
    /// Mixture, deviation and absolute deviation variables are
    /// [implied](IntVar::implied): the mixing equalities fix them from the
    /// integer volumes.
    pub fn create_mixture_pass_variables(&mut self) -> Result<()> {
        let mixture_max = self.engine.bounds().mixture_max;
        self.mix_vars = (0..self.sieve_count()).map(mix_pass_var).collect();
        for name in &self.mix_vars {
            self.model
                .add_int_var(IntVar::implied(name.clone(), 0, mixture_max));
        }
        Ok(())
    }

    /// `mix_pass[s] = Σ_i pass_units[i][s] · volume[i]`.
    ///
    /// The mixture's pass fraction is the volume-weighted combination of
    /// the constituents' pass fractions.
    pub fn add_mixing_constraint(&mut self, sieve: usize) -> Result<()> {
        self.require_volume_vars()?;
        if sieve >= self.mix_vars.len() {
            return Err(BlendError::InvalidInput(format!(
                "sieve {sieve} has no mixture pass variable ({} created)",
                self.mix_vars.len()
            )));
        }

        let mut expr = LinearExpr::new();
        for (i, material) in self.materials.iter().enumerate() {
            let Some(&fraction) = material.pass_fractions.get(sieve) else {
                return Err(BlendError::InvalidInput(format!(
                    "material {} has {} pass fractions, sieve {sieve} requested",
                    material.id,
                    material.sieve_count()
                )));
            };
            validate_fraction(fraction, &format!("material {} sieve {sieve}", material.id))?;
            let units = self.engine.fraction_to_units(fraction);
            self.pass_units[i][sieve] = units;
            expr = expr.with_term(self.volume_vars[i].clone(), units);
        }
        expr = expr.with_term(self.mix_vars[sieve].clone(), -1);
        self.model.add_linear(expr, Relation::Eq, 0);
        Ok(())
    }

    /// `Σ volume[i] = 100 · multiplier`: the shares add up to exactly 100 %.
    pub fn add_total_volume_constraint(&mut self) -> Result<()> {
        self.require_volume_vars()?;
        let total = self.engine.bounds().total_volume;
        self.model
            .add_linear(LinearExpr::sum(self.volume_vars.iter().cloned()), Relation::Eq, total);
        Ok(())
    }

    /// `deviation[s] = mix_pass[s] − target_units[s]` and
    /// `abs_deviation[s] = |deviation[s]|`.
    ///
    /// Deviation domain is `[-(100 · multiplier)², (100 · multiplier)²]`,
    /// absolute deviation `[0, (100 · multiplier)²]`.
    pub fn add_deviation_constraints(&mut self, sieve: usize) -> Result<()> {
        if self.target.is_empty() {
            return Err(BlendError::InvalidInput(
                "target profile must not be empty".into(),
            ));
        }
        for material in self.materials {
            if material.sieve_count() != self.target.sieve_count() {
                return Err(BlendError::InvalidInput(format!(
                    "material {} has {} pass fractions, target profile has {}",
                    material.id,
                    material.sieve_count(),
                    self.target.sieve_count()
                )));
            }
        }
        if sieve >= self.mix_vars.len() {
            return Err(BlendError::InvalidInput(format!(
                "sieve {sieve} has no mixture pass variable ({} created)",
                self.mix_vars.len()
            )));
        }
        let fraction = self.target.pass_fractions[sieve];
        validate_fraction(fraction, &format!("target sieve {sieve}"))?;

        let bounds = *self.engine.bounds();
        let target = self.engine.target_units(fraction);
        self.target_units[sieve] = target;

        let dev = deviation_var(sieve);
        let abs = abs_deviation_var(sieve);
        self.model.add_int_var(IntVar::implied(
            dev.clone(),
            -bounds.deviation_max,
            bounds.deviation_max,
        ));
        self.model
            .add_int_var(IntVar::implied(abs.clone(), 0, bounds.deviation_max));

        // mix - dev == target
        self.model.add_linear(
            LinearExpr::var(self.mix_vars[sieve].clone()).with_term(dev.clone(), -1),
            Relation::Eq,
            target,
        );
        self.model.add_abs_equality(abs.clone(), dev.clone());

        self.deviation_vars.push(dev);
        self.abs_vars.push(abs);
        Ok(())
    }

    /// Bounds on individual shares; a pinned share becomes one equality.
    pub fn add_share_constraints(&mut self) -> Result<()> {
        if self.shares.is_empty() {
            return Ok(());
        }
        self.require_volume_vars()?;
        let total = self.engine.bounds().total_volume;
        for share in self.shares {
            validate_share(share, self.materials)?;
            let var = volume_var(&share.material_id);
            let lo = self.engine.percent_to_units(share.min_percent);
            let hi = self.engine.percent_to_units(share.max_percent);
            if lo == hi {
                self.model.add_linear(LinearExpr::var(var), Relation::Eq, lo);
                continue;
            }
            if lo > 0 {
                self.model
                    .add_linear(LinearExpr::var(var.clone()), Relation::Ge, lo);
            }
            if hi < total {
                self.model.add_linear(LinearExpr::var(var), Relation::Le, hi);
            }
        }
        Ok(())
    }

    /// Minimize `Σ_s abs_deviation[s]`, every sieve weighted equally.
    pub fn set_objective(&mut self) -> Result<()> {
        if self.abs_vars.len() != self.sieve_count() || self.abs_vars.is_empty() {
            return Err(BlendError::InvalidInput(format!(
                "objective needs an absolute deviation per sieve ({} of {} created)",
                self.abs_vars.len(),
                self.sieve_count()
            )));
        }
        self.model.set_objective(Objective::Minimize {
            terms: self.abs_vars.iter().map(|n| (n.clone(), 1)).collect(),
        });
        Ok(())
    }

    /// Runs every step and returns the finished model.
    pub fn build(mut self) -> Result<BlendModel> {
        if self.target.is_empty() {
            return Err(BlendError::InvalidInput(
                "target profile must not be empty".into(),
            ));
        }
        self.create_volume_variables()?;
        self.create_mixture_pass_variables()?;
        for s in 0..self.sieve_count() {
            self.add_mixing_constraint(s)?;
        }
        self.add_total_volume_constraint()?;
        for s in 0..self.sieve_count() {
            self.add_deviation_constraints(s)?;
        }
        self.add_share_constraints()?;
        self.set_objective()?;
        self.finish()
    }

    /// Returns the model assembled so far, checked for consistency.
    pub fn finish(self) -> Result<BlendModel> {
        self.model.validate().map_err(BlendError::InvalidInput)?;
        debug!(
            materials = self.volume_vars.len(),
            sieves = self.mix_vars.len(),
            vars = self.model.var_count(),
            constraints = self.model.constraint_count(),
            multiplier = self.engine.multiplier(),
            "blend model built"
        );
        Ok(BlendModel {
            model: self.model,
            engine: self.engine,
            materials: self
                .materials
                .iter()
                .map(|m| MaterialRef {
                    id: m.id.clone(),
                    name: m.name.clone(),
                })
                .collect(),
            volume_vars: self.volume_vars,
            mix_vars: self.mix_vars,
            deviation_vars: self.deviation_vars,
            abs_vars: self.abs_vars,
            pass_units: self.pass_units,
            target_units: self.target_units,
        })
    }

    fn require_volume_vars(&self) -> Result<()> {
        if self.volume_vars.is_empty() {
            Err(BlendError::InvalidInput(
                "volume variables must be created first".into(),
            ))
        } else {
            Ok(())
        }
    }
}

/// A built blend model.
///
/// Owns the [`CpModel`] and the variable handles. Solvers and the result
/// interpreter only borrow it.
#[derive(Debug, Clone)]
pub struct BlendModel {
    model: CpModel,
    engine: ScalingEngine,
    materials: Vec<MaterialRef>,
    volume_vars: Vec<String>,
    mix_vars: Vec<String>,
    deviation_vars: Vec<String>,
    abs_vars: Vec<String>,
    pass_units: Vec<Vec<i64>>,
    target_units: Vec<i64>,
}

impl BlendModel {
    pub fn cp_model(&self) -> &CpModel {
        &self.model
    }

    pub fn engine(&self) -> &ScalingEngine {
        &self.engine
    }

    pub fn bounds(&self) -> &DomainBounds {
        self.engine.bounds()
    }

    pub fn materials(&self) -> &[MaterialRef] {
        &self.materials
    }

    pub fn volume_vars(&self) -> &[String] {
        &self.volume_vars
    }

    pub fn sieve_count(&self) -> usize {
        self.mix_vars.len()
    }

    /// Target per sieve in mixture units.
    pub fn target_units(&self) -> &[i64] {
        &self.target_units
    }

    /// Computes every variable's value from the volume units, exactly.
    ///
    /// Follows the same formulas as the constraints, so for volumes that
    /// satisfy the total-volume and share constraints the result passes
    /// [`CpModel::check_assignment`]. Fails if `volumes` has the wrong
    /// length or a derived value leaves the `i64` range.
    pub fn derive_assignment(
        &self,
        volumes: &[i64],
    ) -> std::result::Result<HashMap<String, i64>, String> {
        if volumes.len() != self.volume_vars.len() {
            return Err(format!(
                "expected {} volumes, got {}",
                self.volume_vars.len(),
                volumes.len()
            ));
        }
        let mut values = HashMap::with_capacity(self.model.var_count());
        for (name, &v) in self.volume_vars.iter().zip(volumes) {
            values.insert(name.clone(), v);
        }
        for s in 0..self.sieve_count() {
            let mix: i128 = self
                .pass_units
                .iter()
                .zip(volumes)
                .map(|(units, &v)| units[s] as i128 * v as i128)
                .sum();
            let dev = mix - self.target_units[s] as i128;
            let narrow = |x: i128| {
                i64::try_from(x).map_err(|_| format!("sieve {s}: value {x} exceeds i64"))
            };
            values.insert(self.mix_vars[s].clone(), narrow(mix)?);
            if let (Some(d), Some(a)) = (self.deviation_vars.get(s), self.abs_vars.get(s)) {
                values.insert(d.clone(), narrow(dev)?);
                values.insert(a.clone(), narrow(dev.abs())?);
            }
        }
        Ok(values)
    }
}
