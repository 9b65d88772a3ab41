//! Mass-spring cloth simulation core.
//!
//! Main components:
//! - [`particle`]: the particle lattice (positions, velocities, pins).
//! - [`topology`]: spring network and triangulation built from the lattice size.
//! - [`phases`]: force accumulation and semi-implicit Euler integration.
//! - [`force_buffer`]: per-particle force accumulators shared between phases.
//! - [`normals`]: per-vertex normal estimation for shading.
//! - [`clock`]: fixed-timestep bookkeeping.
//! - [`simulation`]: the context that owns all state and runs a frame.
//! - [`scheduler`]: frame loop with an injectable time source.
//! - [`render`]: the interface a renderer uses to consume output.
//! - [`config`]: simulation parameters.
//! - [`error`]: error type.
//! - [`types`]: shared type aliases and IDs.

pub mod clock;
pub mod config;
pub mod error;
pub mod force_buffer;
pub mod normals;
pub mod particle;
pub mod phases;
pub mod render;
pub mod scheduler;
pub mod simulation;
pub mod topology;
pub mod types;

pub use config::{Config, PinSet};
pub use error::ClothError;
pub use render::{ClothFrame, Renderer, SurfaceSource};
pub use scheduler::{ManualTimeSource, MonotonicTimeSource, Scheduler, TimeSource};
pub use simulation::{FrameReport, Simulation, SimulationStatus};
