//! Error types for cloth simulation.

use std::fmt;

use crate::types::ParticleId;

/// Errors that can occur while building or advancing a cloth simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum ClothError {
    /// Lattice must be at least 2x2.
    InvalidLatticeSize { size: usize },
    /// A scalar parameter is out of its allowed range or not finite.
    ParameterOutOfRange { name: &'static str, value: f32 },
    /// A vector parameter has a non-finite component.
    NonFiniteParameter { name: &'static str },
    /// The timestep is below the one-nanosecond clock resolution.
    TimestepTooSmall { time_step: f32 },
    /// A pinned particle index is outside the lattice.
    PinOutOfRange { index: ParticleId, count: usize },
    /// A spring is self-connected or references a missing particle.
    InvalidSpring {
        index: usize,
        p: ParticleId,
        q: ParticleId,
        count: usize,
    },
    /// A triangle references a missing particle.
    InvalidTriangle { index: usize, count: usize },
    /// A position, velocity or normal became non-finite.
    Diverged { substep: u64, particle: ParticleId },
    /// The simulation diverged earlier and must be reset before advancing.
    Halted,
}

impl fmt::Display for ClothError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClothError::InvalidLatticeSize { size } => {
                write!(f, "lattice size must be at least 2, got {size}")
            }
            ClothError::ParameterOutOfRange { name, value } => {
                write!(f, "parameter `{name}` is out of range: {value}")
            }
            ClothError::NonFiniteParameter { name } => {
                write!(f, "parameter `{name}` has a non-finite component")
            }
            ClothError::TimestepTooSmall { time_step } => {
                write!(f, "time step {time_step} s is below clock resolution (1 ns)")
            }
            ClothError::PinOutOfRange { index, count } => {
                write!(f, "pinned particle {index} out of bounds (count: {count})")
            }
            ClothError::InvalidSpring { index, p, q, count } => write!(
                f,
                "spring {index} connects ({p}, {q}), which is invalid for {count} particles"
            ),
            ClothError::InvalidTriangle { index, count } => write!(
                f,
                "triangle {index} references a particle outside 0..{count}"
            ),
            ClothError::Diverged { substep, particle } => write!(
                f,
                "simulation diverged at substep {substep} (particle {particle})"
            ),
            ClothError::Halted => write!(f, "simulation has diverged; reset it before advancing"),
        }
    }
}

impl std::error::Error for ClothError {}
