//! The simulation context.
//!
//! [`Simulation`] owns every piece of state (particles, springs,
//! triangulation, scratch buffers, clock) and drives the phases in order:
//!
//! ```text
//! advance(elapsed)
//!   └─ N × [force_phase → integration_phase]
//!   └─ estimate_normals, divergence check, flatten output buffers
//! ```
//!
//! Several independent simulations can coexist; nothing is global.

use std::time::Duration;

use glam::Vec3;
use rand::Rng;

use crate::{
    clock::SimulationClock,
    config::Config,
    error::ClothError,
    force_buffer::ForceBuffer,
    normals::{estimate_normals, first_non_finite},
    particle::ParticleGrid,
    phases::{force_phase, force_phase_par, integration_phase},
    render::SurfaceSource,
    topology::{Spring, build_springs, build_triangles, validate_springs, validate_triangles},
    types::{ParticleId, Triangle},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationStatus {
    Running,
    /// Integration stopped; only [`Simulation::reset`] recovers.
    Diverged { substep: u64, particle: ParticleId },
}

/// What one [`Simulation::advance`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Substeps executed this frame.
    pub substeps: u64,
    /// Wall time skipped because of the per-frame substep cap.
    pub dropped: Duration,
    /// Total simulated time after this frame.
    pub sim_time: Duration,
}

#[derive(Debug)]
pub struct Simulation {
    cfg: Config,
    grid: ParticleGrid,
    /// State restored by [`Simulation::reset`].
    initial: ParticleGrid,
    springs: Vec<Spring>,
    triangles: Vec<Triangle>,
    forces: ForceBuffer,
    normals: Vec<Vec3>,
    clock: SimulationClock,
    status: SimulationStatus,
    /// Substeps actually executed, including ones run outside the clock.
    steps_run: u64,

    scratch_positions: Vec<Vec3>,
    position_buf: Vec<f32>,
    normal_buf: Vec<f32>,
    index_buf: Vec<u32>,
}

impl Simulation {
    /// Builds a lattice simulation from a configuration.
    ///
    /// The sheet starts flat and at rest, pins from `cfg.pins` applied, and
    /// the output buffers (positions, normals, indices) already filled.
    ///
    /// ### Errors
    /// Any configuration error from [`Config::validate`].
    pub fn new(cfg: Config) -> Result<Self, ClothError> {
        cfg.validate()?;

        let spacing = cfg.spacing();
        let mut grid = ParticleGrid::lattice(cfg.size, spacing, cfg.origin, cfg.mass);
        grid.pin_all(&cfg.pins.resolve(cfg.size))?;
        let springs = build_springs(cfg.size, spacing)?;
        let triangles = build_triangles(cfg.size)?;

        ftlog::info!(
            "cloth: {0}x{0} lattice, spacing {1:.4}, {2} springs, {3} triangles, {4} pinned",
            cfg.size,
            spacing,
            springs.len(),
            triangles.len(),
            grid.pinned_ids().count()
        );

        Self::assemble(grid, springs, triangles, cfg)
    }

    /// Builds a simulation from hand-made parts.
    ///
    /// The grid's own pin flags and mass are used; `cfg.size`, `cfg.extent`,
    /// `cfg.origin`, `cfg.mass` and `cfg.pins` are not consulted.
    ///
    /// ### Errors
    /// - Any error from [`Config::validate_physics`].
    /// - [`ClothError::ParameterOutOfRange`] if the grid's mass is not positive.
    /// - [`ClothError::InvalidSpring`] / [`ClothError::InvalidTriangle`] for
    ///   indices outside the grid.
    pub fn from_parts(
        grid: ParticleGrid,
        springs: Vec<Spring>,
        triangles: Vec<Triangle>,
        cfg: Config,
    ) -> Result<Self, ClothError> {
        cfg.validate_physics()?;
        let mass = grid.mass();
        if !(mass.is_finite() && mass > 0.0) {
            return Err(ClothError::ParameterOutOfRange {
                name: "mass",
                value: mass,
            });
        }
        validate_springs(&springs, grid.len())?;
        validate_triangles(&triangles, grid.len())?;

        Self::assemble(grid, springs, triangles, cfg)
    }

    fn assemble(
        grid: ParticleGrid,
        springs: Vec<Spring>,
        triangles: Vec<Triangle>,
        cfg: Config,
    ) -> Result<Self, ClothError> {
        let clock = SimulationClock::new(cfg.time_step, cfg.max_substeps_per_frame);
        let index_buf = triangles.iter().flatten().copied().collect();

        let mut sim = Self {
            forces: ForceBuffer::with_len(grid.len()),
            normals: Vec::with_capacity(grid.len()),
            initial: grid.clone(),
            grid,
            springs,
            triangles,
            clock,
            status: SimulationStatus::Running,
            steps_run: 0,
            scratch_positions: Vec::new(),
            position_buf: Vec::new(),
            normal_buf: Vec::new(),
            index_buf,
            cfg,
        };
        sim.refresh_output()?;
        Ok(sim)
    }

    /// Runs one force phase followed by one integration phase.
    ///
    /// ### Errors
    /// - [`ClothError::Halted`] if the simulation already diverged.
    /// - [`ClothError::Diverged`] if this substep produced non-finite state;
    ///   the simulation is halted.
    pub fn substep(&mut self) -> Result<(), ClothError> {
        self.ensure_running()?;

        match self.cfg.parallel_chunk_len {
            0 => force_phase(&self.grid, &self.springs, &self.cfg, &mut self.forces),
            chunk_len => force_phase_par(
                &self.grid,
                &self.springs,
                &self.cfg,
                chunk_len,
                &mut self.forces,
            ),
        }

        let substep = self.steps_run;
        self.steps_run += 1;
        integration_phase(&mut self.grid, &self.forces, self.cfg.time_step, substep)
            .map_err(|err| self.halt(err))
    }

    /// Runs `n` substeps back to back, stopping at the first error.
    ///
    /// Output buffers are not refreshed; see [`Simulation::refresh_output`].
    pub fn step_substeps(&mut self, n: u64) -> Result<(), ClothError> {
        for _ in 0..n {
            self.substep()?;
        }
        Ok(())
    }

    /// Advances by one frame's worth of elapsed wall time.
    ///
    /// Runs the whole number of substeps the clock hands out, then
    /// recomputes normals and refreshes the output buffers once.
    ///
    /// ### Errors
    /// [`ClothError::Halted`] or [`ClothError::Diverged`], as for
    /// [`Simulation::substep`]. On divergence the output buffers keep the
    /// last good frame.
    pub fn advance(&mut self, elapsed: Duration) -> Result<FrameReport, ClothError> {
        self.ensure_running()?;

        let step = self.clock.advance(elapsed);
        if !step.dropped.is_zero() {
            ftlog::warn!(
                "cloth: frame needed more than {} substeps, dropped {:?} of simulated time",
                self.cfg.max_substeps_per_frame,
                step.dropped
            );
        }

        self.step_substeps(step.substeps)?;
        self.refresh_output()?;

        Ok(FrameReport {
            substeps: step.substeps,
            dropped: step.dropped,
            sim_time: self.clock.elapsed(),
        })
    }

    /// Recomputes normals from the current positions and rewrites the
    /// flattened position and normal buffers.
    ///
    /// ### Errors
    /// [`ClothError::Diverged`] if a normal is non-finite; the buffers are
    /// left untouched and the simulation is halted.
    pub fn refresh_output(&mut self) -> Result<(), ClothError> {
        self.scratch_positions.clear();
        self.scratch_positions
            .extend(self.grid.particles.iter().map(|p| p.pos));
        estimate_normals(&self.scratch_positions, &self.triangles, &mut self.normals);

        if let Some(particle) = first_non_finite(&self.normals) {
            let err = ClothError::Diverged {
                substep: self.steps_run,
                particle,
            };
            return Err(self.halt(err));
        }

        self.grid.write_positions(&mut self.position_buf);
        self.normal_buf.clear();
        for n in &self.normals {
            self.normal_buf.extend_from_slice(&n.to_array());
        }
        Ok(())
    }

    /// Restores the initial particle state and clears the clock and any
    /// divergence.
    pub fn reset(&mut self) -> Result<(), ClothError> {
        self.grid = self.initial.clone();
        self.clock = SimulationClock::new(self.cfg.time_step, self.cfg.max_substeps_per_frame);
        self.status = SimulationStatus::Running;
        self.steps_run = 0;
        self.forces.clear();
        ftlog::info!("cloth: simulation reset");
        self.refresh_output()
    }

    /// Like [`Simulation::reset`], but the new starting state is the current
    /// particle state after `edit` has been applied to it.
    ///
    /// Used to shake or reshape the sheet interactively.
    pub fn restart_with(&mut self, edit: impl FnOnce(&mut ParticleGrid)) -> Result<(), ClothError> {
        let mut grid = self.initial.clone();
        edit(&mut grid);
        self.initial = grid;
        self.reset()
    }

    /// Randomly displaces the free particles of the running sheet and
    /// refreshes the output buffers. See [`ParticleGrid::perturb`].
    ///
    /// ### Errors
    /// [`ClothError::Halted`] if the simulation has diverged.
    pub fn perturb(&mut self, amplitude: f32, rng: &mut impl Rng) -> Result<(), ClothError> {
        self.ensure_running()?;
        self.grid.perturb(amplitude, rng);
        self.refresh_output()
    }

    fn ensure_running(&self) -> Result<(), ClothError> {
        match self.status {
            SimulationStatus::Running => Ok(()),
            SimulationStatus::Diverged { .. } => Err(ClothError::Halted),
        }
    }

    fn halt(&mut self, err: ClothError) -> ClothError {
        if let ClothError::Diverged { substep, particle } = err {
            self.status = SimulationStatus::Diverged { substep, particle };
            ftlog::error!("cloth: {}; integration halted until reset", err);
        }
        err
    }

    /// Whether the simulation is running or halted on divergence.
    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn is_diverged(&self) -> bool {
        matches!(self.status, SimulationStatus::Diverged { .. })
    }

    /// The configuration this simulation was built from.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Current particle state.
    pub fn grid(&self) -> &ParticleGrid {
        &self.grid
    }

    /// Spring network, fixed for the lifetime of the simulation.
    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    /// Surface triangles, wound so the flat sheet faces `+Y`.
    ///
    /// ### Returns
    /// Index triples into [`Simulation::grid`]; the flattened form is
    /// [`SurfaceSource::triangles`].
    pub fn triangle_list(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Per-vertex normals as of the last [`Simulation::refresh_output`].
    pub fn normal_vectors(&self) -> &[Vec3] {
        &self.normals
    }

    /// Fixed-step bookkeeping, including the unspent remainder and dropped time.
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Substeps executed since construction or the last reset.
    pub fn steps_run(&self) -> u64 {
        self.steps_run
    }

    /// See [`ParticleGrid::kinetic_energy`].
    pub fn kinetic_energy(&self) -> f32 {
        self.grid.kinetic_energy()
    }

    /// Elastic energy of all springs plus gravitational potential energy
    /// (zero at `y = 0` for the default downward gravity).
    pub fn potential_energy(&self) -> f32 {
        let k = self.cfg.stiffness;
        let particles = &self.grid.particles;
        let elastic: f32 = self
            .springs
            .iter()
            .map(|s| {
                let dx = (particles[s.q].pos - particles[s.p].pos).length() - s.rest_length();
                0.5 * k * dx * dx
            })
            .sum();
        let gravity: f32 = particles
            .iter()
            .map(|p| -self.grid.mass() * self.cfg.gravity.dot(p.pos))
            .sum();
        elastic + gravity
    }
}

impl SurfaceSource for Simulation {
    fn positions(&self) -> &[f32] {
        &self.position_buf
    }

    fn normals(&self) -> &[f32] {
        &self.normal_buf
    }

    fn triangles(&self) -> &[u32] {
        &self.index_buf
    }
}
