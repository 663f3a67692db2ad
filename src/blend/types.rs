//! Input records for blend problems.

use super::builder::BlendModelBuilder;
use super::config::ScalingConfig;
use crate::error::{BlendError, Result};
use std::collections::HashSet;

/// A raw material characterized by its sieve pass fractions.
///
/// `pass_fractions[s]` is the volume fraction of the material finer than
/// sieve `s`, in `[0, 1]`. Sieve-order monotonicity is not required.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    /// Unique identifier within a problem.
    pub id: String,
    /// Display label.
    pub name: String,
    /// Pass fraction per sieve.
    pub pass_fractions: Vec<f64>,
}

impl Material {
    /// Creates a material. Fractions are checked when a
    /// [`BlendProblem`] is assembled.
    pub fn new(id: impl Into<String>, name: impl Into<String>, pass_fractions: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pass_fractions,
        }
    }

    /// Number of sieves this material is characterized on.
    pub fn sieve_count(&self) -> usize {
        self.pass_fractions.len()
    }
}

/// Target pass fraction per sieve for the blended material.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetProfile {
    /// Target pass fraction per sieve, in `[0, 1]`.
    pub pass_fractions: Vec<f64>,
}

impl TargetProfile {
    /// Creates a target profile from one pass fraction per sieve.
    pub fn new(pass_fractions: Vec<f64>) -> Self {
        Self { pass_fractions }
    }

    pub fn sieve_count(&self) -> usize {
        self.pass_fractions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pass_fractions.is_empty()
    }
}

/// Bounds on one material's volume share, in percent.
///
/// A pinned share (`min == max`) is modeled as a single equality.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShareConstraint {
    /// Id of the constrained material.
    pub material_id: String,
    /// Minimum share in percent.
    pub min_percent: f64,
    /// Maximum share in percent.
    pub max_percent: f64,
}

impl ShareConstraint {
    /// Share must lie in `[min_percent, max_percent]`.
    pub fn range(material_id: impl Into<String>, min_percent: f64, max_percent: f64) -> Self {
        Self {
            material_id: material_id.into(),
            min_percent,
            max_percent,
        }
    }

    /// Share must equal `percent` exactly.
    pub fn pinned(material_id: impl Into<String>, percent: f64) -> Self {
        Self::range(material_id, percent, percent)
    }

    /// Whether this constraint fixes the share to a single value.
    pub fn is_pinned(&self) -> bool {
        self.min_percent == self.max_percent
    }
}

/// A validated blend problem: materials, target profile and optional
/// share constraints.
///
/// # Examples
///
/// ```
/// use u_blend::blend::{BlendProblem, Material, TargetProfile};
///
/// let problem = BlendProblem::new(
///     vec![
///         Material::new("M1", "Coarse", vec![0.70, 0.30]),
///         Material::new("M2", "Fine", vec![0.90, 0.75]),
///     ],
///     TargetProfile::new(vec![0.80, 0.50]),
/// )
/// .unwrap();
/// assert_eq!(problem.sieve_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BlendProblem {
    materials: Vec<Material>,
    target: TargetProfile,
    shares: Vec<ShareConstraint>,
}

impl BlendProblem {
    /// Creates a problem, validating the inputs.
    ///
    /// Fails with [`BlendError::InvalidInput`] if the materials or the
    /// target profile are empty, if any pass sequence length differs,
    /// if a fraction is outside `[0, 1]`, or if material ids repeat.
    pub fn new(materials: Vec<Material>, target: TargetProfile) -> Result<Self> {
        validate_inputs(&materials, &target)?;
        Ok(Self {
            materials,
            target,
            shares: Vec::new(),
        })
    }

    /// Adds a share constraint after validating it against the materials.
    pub fn with_share_constraint(mut self, share: ShareConstraint) -> Result<Self> {
        validate_share(&share, &self.materials)?;
        self.shares.push(share);
        Ok(self)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn target(&self) -> &TargetProfile {
        &self.target
    }

    pub fn shares(&self) -> &[ShareConstraint] {
        &self.shares
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn sieve_count(&self) -> usize {
        self.target.sieve_count()
    }

    /// Creates a model builder over this problem.
    pub fn builder(&self, scaling: &ScalingConfig) -> Result<BlendModelBuilder<'_>> {
        BlendModelBuilder::new(&self.materials, &self.target, &self.shares, scaling)
    }
}

/// Checks a pass fraction: finite and within `[0, 1]`.
pub(crate) fn validate_fraction(value: f64, what: &str) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(BlendError::InvalidInput(format!(
            "{what}: pass fraction {value} outside [0, 1]"
        )))
    }
}

/// Validates materials and target profile together.
pub(crate) fn validate_inputs(materials: &[Material], target: &TargetProfile) -> Result<()> {
    if materials.is_empty() {
        return Err(BlendError::InvalidInput("materials must not be empty".into()));
    }
    if target.is_empty() {
        return Err(BlendError::InvalidInput(
            "target profile must not be empty".into(),
        ));
    }

    let sieves = target.sieve_count();
    let mut seen = HashSet::with_capacity(materials.len());
    for material in materials {
        if !seen.insert(material.id.as_str()) {
            return Err(BlendError::InvalidInput(format!(
                "duplicate material id: {}",
                material.id
            )));
        }
        if material.sieve_count() != sieves {
            return Err(BlendError::InvalidInput(format!(
                "material {} has {} pass fractions, target profile has {}",
                material.id,
                material.sieve_count(),
                sieves
            )));
        }
        for (s, &f) in material.pass_fractions.iter().enumerate() {
            validate_fraction(f, &format!("material {} sieve {s}", material.id))?;
        }
    }
    for (s, &f) in target.pass_fractions.iter().enumerate() {
        validate_fraction(f, &format!("target sieve {s}"))?;
    }
    Ok(())
}

/// Validates a share constraint's range and material reference.
pub(crate) fn validate_share(share: &ShareConstraint, materials: &[Material]) -> Result<()> {
    if !materials.iter().any(|m| m.id == share.material_id) {
        return Err(BlendError::InvalidInput(format!(
            "share constraint references unknown material: {}",
            share.material_id
        )));
    }
    let (lo, hi) = (share.min_percent, share.max_percent);
    if !(lo.is_finite() && hi.is_finite() && 0.0 <= lo && lo <= hi && hi <= 100.0) {
        return Err(BlendError::InvalidInput(format!(
            "share constraint for {}: need 0 <= min <= max <= 100, got [{lo}, {hi}]",
            share.material_id
        )));
    }
    Ok(())
}
