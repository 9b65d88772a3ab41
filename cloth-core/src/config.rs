//! Simulation parameters.
//!
//! [`Config::default`] reproduces the constants of the classic cloth
//! exercise: a 1 × 1 sheet, 0.1 kg particles, `k = 30`, damping `1.0`
//! and a 1 ms substep, with no cap on substeps per frame.

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ClothError;
use crate::types::ParticleId;

/// Standard gravity in m/s².
pub const STANDARD_GRAVITY: f32 = 9.80665;

/// Which particles are excluded from integration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PinSet {
    /// Nothing is pinned; the sheet free-falls.
    None,
    /// The two ends of the first row (particles `0` and `size - 1`).
    TopCorners,
    /// Every particle of the first row.
    TopRow,
    /// An explicit list of particle indices.
    Indices(Vec<ParticleId>),
}

impl PinSet {
    /// Resolves the set to concrete particle indices for a `size × size` lattice.
    pub fn resolve(&self, size: usize) -> Vec<ParticleId> {
        match self {
            PinSet::None => Vec::new(),
            PinSet::TopCorners if size == 0 => Vec::new(),
            PinSet::TopCorners => vec![0, size - 1],
            PinSet::TopRow => (0..size).collect(),
            PinSet::Indices(ids) => ids.clone(),
        }
    }
}

/// Parameters of one cloth simulation.
///
/// Deserializing fills missing fields from [`Config::default`], so partial
/// JSON files are accepted. Nothing is checked until [`Config::validate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of particles along each side of the lattice.
    pub size: usize,
    /// Side length of the undeformed sheet.
    pub extent: f32,
    /// World position of particle 0.
    pub origin: Vec3,
    /// Mass of every particle.
    pub mass: f32,
    /// Spring stiffness `k`, shared by all springs.
    pub stiffness: f32,
    /// Damping coefficient along the spring axis, shared by all springs.
    pub damping: f32,
    /// Gravitational acceleration.
    pub gravity: Vec3,
    /// Uniform external force applied to every particle (wind).
    pub external_force: Vec3,
    /// Fixed physics timestep in seconds.
    pub time_step: f32,
    /// Upper bound on substeps run for one frame; `0` (the default) means
    /// unbounded. A non-zero cap trades frame-rate independence for bounded
    /// work after a stall.
    pub max_substeps_per_frame: u32,
    /// Springs per parallel force task; `0` accumulates forces serially.
    pub parallel_chunk_len: usize,
    /// Particles excluded from integration.
    pub pins: PinSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: 20,
            extent: 1.0,
            origin: Vec3::new(-0.5, 0.0, -0.5),
            mass: 0.1,
            stiffness: 30.0,
            damping: 1.0,
            gravity: Vec3::new(0.0, -STANDARD_GRAVITY, 0.0),
            external_force: Vec3::ZERO,
            time_step: 0.001,
            max_substeps_per_frame: 0,
            parallel_chunk_len: 0,
            pins: PinSet::TopCorners,
        }
    }
}

impl Config {
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets the sheet extent and re-centres the origin on it.
    pub fn with_extent(mut self, extent: f32) -> Self {
        self.extent = extent;
        self.origin = Vec3::new(-0.5 * extent, self.origin.y, -0.5 * extent);
        self
    }

    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_stiffness(mut self, stiffness: f32) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_external_force(mut self, force: Vec3) -> Self {
        self.external_force = force;
        self
    }

    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_max_substeps_per_frame(mut self, max: u32) -> Self {
        self.max_substeps_per_frame = max;
        self
    }

    pub fn with_parallel_chunk_len(mut self, chunk_len: usize) -> Self {
        self.parallel_chunk_len = chunk_len;
        self
    }

    pub fn with_pins(mut self, pins: PinSet) -> Self {
        self.pins = pins;
        self
    }

    /// Rest spacing between lattice neighbours: `extent / (size - 1)`.
    ///
    /// Only meaningful once [`Config::validate`] has accepted `size`.
    pub fn spacing(&self) -> f32 {
        self.extent / (self.size.saturating_sub(1).max(1) as f32)
    }

    /// Checks every parameter, returning the first offending one.
    ///
    /// ### Errors
    /// - [`ClothError::InvalidLatticeSize`] if `size < 2` or `size²`
    ///   overflows `usize`.
    /// - Anything [`Config::validate_physics`] reports.
    /// - [`ClothError::PinOutOfRange`] for pins outside the lattice.
    pub fn validate(&self) -> Result<(), ClothError> {
        let count = match self.size.checked_mul(self.size) {
            Some(count) if self.size >= 2 => count,
            _ => return Err(ClothError::InvalidLatticeSize { size: self.size }),
        };

        positive("extent", self.extent)?;
        finite("origin", self.origin)?;
        self.validate_physics()?;

        if let Some(&index) = self.pins.resolve(self.size).iter().find(|&&i| i >= count) {
            return Err(ClothError::PinOutOfRange { index, count });
        }

        Ok(())
    }

    /// Checks the physical constants only, ignoring lattice layout and pins.
    ///
    /// ### Errors
    /// - [`ClothError::ParameterOutOfRange`] if mass or time step are not
    ///   strictly positive, or stiffness or damping are negative
    ///   (non-finite values are rejected too).
    /// - [`ClothError::TimestepTooSmall`] if the time step is below 1 ns.
    /// - [`ClothError::ParameterOutOfRange`] naming `time_step` if it does
    ///   not fit in a [`Duration`].
    /// - [`ClothError::NonFiniteParameter`] for non-finite vectors.
    pub fn validate_physics(&self) -> Result<(), ClothError> {
        positive("mass", self.mass)?;
        positive("time_step", self.time_step)?;
        non_negative("stiffness", self.stiffness)?;
        non_negative("damping", self.damping)?;

        if f64::from(self.time_step) < 1e-9 {
            return Err(ClothError::TimestepTooSmall {
                time_step: self.time_step,
            });
        }
        if Duration::try_from_secs_f64(f64::from(self.time_step)).is_err() {
            return Err(ClothError::ParameterOutOfRange {
                name: "time_step",
                value: self.time_step,
            });
        }

        finite("gravity", self.gravity)?;
        finite("external_force", self.external_force)?;
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ClothError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ClothError::ParameterOutOfRange { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ClothError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ClothError::ParameterOutOfRange { name, value })
    }
}

fn finite(name: &'static str, v: Vec3) -> Result<(), ClothError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ClothError::NonFiniteParameter { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn spacing_divides_extent_by_cell_count() {
        let cfg = Config::default().with_size(5).with_extent(2.0);
        assert!((cfg.spacing() - 0.5).abs() < 1e-6);
        assert_eq!(cfg.origin, Vec3::new(-1.0, 0.0, -1.0));
    }

    #[test_case(0 ; "empty")]
    #[test_case(1 ; "single particle")]
    fn rejects_degenerate_lattice(size: usize) {
        let cfg = Config::default().with_size(size);
        assert_eq!(cfg.validate(), Err(ClothError::InvalidLatticeSize { size }));
    }

    #[test_case(Config::default().with_mass(0.0), "mass" ; "zero mass")]
    #[test_case(Config::default().with_mass(-0.1), "mass" ; "negative mass")]
    #[test_case(Config::default().with_time_step(0.0), "time_step" ; "zero time step")]
    #[test_case(Config::default().with_time_step(f32::NAN), "time_step" ; "nan time step")]
    #[test_case(Config::default().with_stiffness(-1.0), "stiffness" ; "negative stiffness")]
    #[test_case(Config::default().with_damping(f32::INFINITY), "damping" ; "infinite damping")]
    #[test_case(Config::default().with_time_step(1e20), "time_step" ; "huge time step")]
    fn reports_offending_parameter(cfg: Config, expected: &str) {
        match cfg.validate() {
            Err(ClothError::ParameterOutOfRange { name, .. }) => assert_eq!(name, expected),
            other => panic!("expected ParameterOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn rejects_lattice_whose_particle_count_overflows() {
        let size = usize::MAX / 2;
        let cfg = Config::default().with_size(size);
        assert_eq!(cfg.validate(), Err(ClothError::InvalidLatticeSize { size }));
    }

    #[test]
    fn default_substeps_are_unbounded() {
        assert_eq!(Config::default().max_substeps_per_frame, 0);
    }

    #[test]
    fn rejects_sub_nanosecond_time_step() {
        let cfg = Config::default().with_time_step(1e-10);
        assert!(matches!(cfg.validate(), Err(ClothError::TimestepTooSmall { .. })));
    }

    #[test]
    fn rejects_non_finite_gravity() {
        let cfg = Config::default().with_gravity(Vec3::new(0.0, f32::NAN, 0.0));
        assert_eq!(
            cfg.validate(),
            Err(ClothError::NonFiniteParameter { name: "gravity" })
        );
    }

    #[test]
    fn rejects_pins_outside_lattice() {
        let cfg = Config::default()
            .with_size(3)
            .with_pins(PinSet::Indices(vec![0, 9]));
        assert_eq!(
            cfg.validate(),
            Err(ClothError::PinOutOfRange { index: 9, count: 9 })
        );
    }

    #[test]
    fn pin_sets_resolve_against_lattice_size() {
        assert_eq!(PinSet::TopCorners.resolve(4), vec![0, 3]);
        assert_eq!(PinSet::TopRow.resolve(3), vec![0, 1, 2]);
        assert!(PinSet::None.resolve(4).is_empty());
    }
}
