//! Per-substep simulation phases for the mass-spring cloth.
//!
//! One substep is:
//! 1. [`force_phase`] (or [`force_phase_par`]): seed every particle with
//!    gravity and external load, then add each spring's elastic and damping
//!    force into a [`ForceBuffer`].
//! 2. [`integration_phase`]: semi-implicit Euler on every free particle,
//!    with divergence detection.
//!
//! Integration must not start before the force phase has returned; both
//! force phases only return once every contribution has been summed.

use glam::Vec3;
use rayon::prelude::*;

use crate::{
    config::Config, error::ClothError, force_buffer::ForceBuffer, particle::ParticleGrid,
    topology::Spring,
};

/// Springs shorter than this have no defined direction and exert no force.
pub const DEGENERATE_LENGTH: f32 = 1e-6;

/// Force exerted by one spring on its first endpoint `p`.
///
/// The force on `q` is the negation. The result is Hooke's law against the
/// rest length plus damping of the relative velocity along the spring axis:
///
/// `((k * (len - rest)) + c * ((v_q - v_p) · dir)) * dir`, with
/// `dir = (x_q - x_p) / len`.
///
/// Returns `Vec3::ZERO` when `len <= DEGENERATE_LENGTH`.
///
/// ### Parameters
/// - `xp`, `xq` - Endpoint positions.
/// - `vp`, `vq` - Endpoint velocities.
/// - `rest` - Rest length of the spring.
/// - `k` - Stiffness.
/// - `c` - Damping coefficient.
#[inline]
pub fn spring_force(xp: Vec3, xq: Vec3, vp: Vec3, vq: Vec3, rest: f32, k: f32, c: f32) -> Vec3 {
    let d = xq - xp;
    let len = d.length();
    if len <= DEGENERATE_LENGTH {
        return Vec3::ZERO;
    }

    let dir = d / len;
    let elastic = k * (len - rest);
    let damping = c * (vq - vp).dot(dir);
    (elastic + damping) * dir
}

/// Constant load on every particle: `mass * gravity + external_force`.
pub fn body_force(grid: &ParticleGrid, cfg: &Config) -> Vec3 {
    grid.mass() * cfg.gravity + cfg.external_force
}

/// Adds the contribution of each spring in `springs` to `acc`.
fn accumulate_springs(
    grid: &ParticleGrid,
    springs: &[Spring],
    cfg: &Config,
    acc: &mut ForceBuffer,
) {
    let particles = &grid.particles;
    for s in springs {
        let (a, b) = (&particles[s.p], &particles[s.q]);
        let f = spring_force(
            a.pos,
            b.pos,
            a.vel,
            b.vel,
            s.rest_length(),
            cfg.stiffness,
            cfg.damping,
        );
        acc.add_pair(s.p, s.q, f);
    }
}

/// Computes the net force on every particle for the current state.
///
/// The buffer is resized to `grid.len()`, seeded with [`body_force`] and
/// then every spring adds `+f` to `p` and `-f` to `q` (see
/// [`spring_force`]). Nothing outside `acc` is written.
///
/// ### Parameters
/// - `grid` - Current particle state; only read access is required.
/// - `springs` - The spring network.
/// - `cfg` - Supplies stiffness, damping, gravity and external force.
/// - `acc` - Output buffer of per-particle forces.
pub fn force_phase(grid: &ParticleGrid, springs: &[Spring], cfg: &Config, acc: &mut ForceBuffer) {
    acc.ensure_len(grid.len());
    acc.fill(body_force(grid, cfg));
    accumulate_springs(grid, springs, cfg, acc);
}

/// Parallel version of [`force_phase`].
///
/// Springs are split into contiguous chunks of `chunk_len`; each chunk is
/// summed into its own partial [`ForceBuffer`] on the rayon pool, and the
/// partial buffers are merged into `acc` in chunk order. For a fixed
/// `chunk_len` the result is bit-identical from run to run. It matches
/// [`force_phase`] up to floating point reassociation.
///
/// ### Parameters
/// - `chunk_len` - Springs per task; `0` is treated as `1`.
pub fn force_phase_par(
    grid: &ParticleGrid,
    springs: &[Spring],
    cfg: &Config,
    chunk_len: usize,
    acc: &mut ForceBuffer,
) {
    acc.ensure_len(grid.len());
    acc.fill(body_force(grid, cfg));

    let partials: Vec<ForceBuffer> = springs
        .par_chunks(chunk_len.max(1))
        .map(|chunk| {
            let mut part = ForceBuffer::with_len(grid.len());
            accumulate_springs(grid, chunk, cfg, &mut part);
            part
        })
        .collect();

    for part in &partials {
        acc.merge_from(part);
    }
}

/// Advances every free particle by one semi-implicit Euler step.
///
/// For each non-pinned particle:
/// `vel += dt * force / mass`, then `pos += dt * vel`.
/// Pinned particles are not touched at all.
///
/// ### Parameters
/// - `grid` - Particle state to advance.
/// - `acc` - Forces from the force phase of the same substep.
/// - `dt` - Fixed substep length in seconds.
/// - `substep` - Index of this substep, used for error reporting.
///
/// ### Errors
/// [`ClothError::Diverged`] as soon as a particle's position or velocity has
/// a non-finite component. Particles after it are left un-advanced.
pub fn integration_phase(
    grid: &mut ParticleGrid,
    acc: &ForceBuffer,
    dt: f32,
    substep: u64,
) -> Result<(), ClothError> {
    let inv_mass = 1.0 / grid.mass();

    for (id, p) in grid.particles.iter_mut().enumerate() {
        if p.pinned {
            continue;
        }

        p.vel += dt * acc.get(id) * inv_mass;
        p.pos += dt * p.vel;

        if !(p.pos.is_finite() && p.vel.is_finite()) {
            return Err(ClothError::Diverged {
                substep,
                particle: id,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::build_springs;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use test_case::test_case;

    fn weightless() -> Config {
        Config::default().with_gravity(Vec3::ZERO)
    }

    #[test_case(0.0 ; "slack")]
    #[test_case(1.0 ; "unit")]
    #[test_case(30.0 ; "default")]
    #[test_case(1.0e4 ; "stiff")]
    fn spring_at_rest_length_exerts_no_elastic_force(k: f32) {
        let f = spring_force(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 0.25),
            Vec3::ZERO,
            Vec3::ZERO,
            0.25,
            k,
            1.0,
        );
        assert_eq!(f, Vec3::ZERO);
    }

    #[test]
    fn degenerate_spring_exerts_no_force() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        let f = spring_force(p, p, Vec3::X, -Vec3::X, 1.0, 30.0, 1.0);
        assert_eq!(f, Vec3::ZERO);
    }

    #[test]
    fn stretched_spring_pulls_endpoints_together() {
        // Two free particles, one spring, stretched to twice its rest length.
        let rest = 0.5;
        let cfg = weightless().with_stiffness(30.0);
        let mut grid = ParticleGrid::lattice(2, rest, Vec3::ZERO, cfg.mass);
        grid.particles[1].pos = Vec3::new(2.0 * rest, 0.0, 0.0);
        let springs = [Spring::new(0, 1, rest)];

        let mut acc = ForceBuffer::with_len(0);
        force_phase(&grid, &springs, &cfg, &mut acc);

        let expected = cfg.stiffness * rest;
        assert!((acc.get(0).length() - expected).abs() < 1e-5);
        assert!((acc.get(1).length() - expected).abs() < 1e-5);
        assert!(acc.get(0).x > 0.0, "p is pulled towards q");
        assert!(acc.get(1).x < 0.0, "q is pulled towards p");
        assert_eq!(acc.get(2), Vec3::ZERO);
        assert_eq!(acc.get(3), Vec3::ZERO);
    }

    #[test]
    fn damping_opposes_separation_along_axis() {
        let f = spring_force(
            Vec3::ZERO,
            Vec3::X,
            Vec3::ZERO,
            Vec3::new(2.0, 5.0, 0.0),
            1.0,
            0.0,
            0.5,
        );
        // Only the axial part (2.0) of the relative velocity is damped.
        assert_eq!(f, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn force_phase_seeds_gravity_and_external_load() {
        let cfg = Config::default()
            .with_size(3)
            .with_external_force(Vec3::new(0.2, 0.0, 0.0));
        let grid = ParticleGrid::lattice(3, cfg.spacing(), cfg.origin, cfg.mass);
        let springs = build_springs(3, cfg.spacing()).unwrap();

        let mut acc = ForceBuffer::with_len(0);
        force_phase(&grid, &springs, &cfg, &mut acc);

        // The undeformed sheet is at rest length everywhere.
        let load = cfg.mass * cfg.gravity + cfg.external_force;
        for id in 0..grid.len() {
            assert!((acc.get(id) - load).length() < 1e-5);
        }
    }

    #[test]
    fn parallel_accumulation_matches_serial_and_is_repeatable() {
        let cfg = Config::default().with_size(12);
        let mut grid = ParticleGrid::lattice(12, cfg.spacing(), cfg.origin, cfg.mass);
        grid.perturb(0.02, &mut StdRng::seed_from_u64(3));
        let springs = build_springs(12, cfg.spacing()).unwrap();

        let mut serial = ForceBuffer::with_len(0);
        force_phase(&grid, &springs, &cfg, &mut serial);

        let mut first = ForceBuffer::with_len(0);
        force_phase_par(&grid, &springs, &cfg, 64, &mut first);
        for _ in 0..4 {
            let mut again = ForceBuffer::with_len(0);
            force_phase_par(&grid, &springs, &cfg, 64, &mut again);
            assert_eq!(first.as_slice(), again.as_slice());
        }

        for (a, b) in serial.as_slice().iter().zip(first.as_slice()) {
            assert!((*a - *b).length() < 1e-4, "serial {a} vs parallel {b}");
        }
    }

    #[test]
    fn integration_is_semi_implicit_euler() {
        let mut grid = ParticleGrid::lattice(2, 1.0, Vec3::ZERO, 0.5);
        let mut acc = ForceBuffer::with_len(4);
        acc.add(3, Vec3::new(0.0, -1.0, 0.0));

        integration_phase(&mut grid, &acc, 0.1, 0).unwrap();

        // v = 0.1 * (-1 / 0.5) = -0.2, x = 0.1 * v (new velocity)
        let p = grid.particles[3];
        assert!((p.vel.y + 0.2).abs() < 1e-6);
        assert!((p.pos.y + 0.02).abs() < 1e-6);
    }

    #[test]
    fn integration_skips_pinned_particles() {
        let mut grid = ParticleGrid::lattice(2, 1.0, Vec3::ZERO, 0.1);
        grid.pin_all(&[0]).unwrap();
        let before = grid.particles[0];
        let mut acc = ForceBuffer::with_len(4);
        acc.fill(Vec3::new(3.0, -7.0, 1.0));

        for substep in 0..100 {
            integration_phase(&mut grid, &acc, 0.01, substep).unwrap();
        }

        assert_eq!(grid.particles[0], before);
        assert_ne!(grid.particles[1].pos, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn unforced_particles_stay_put() {
        let mut grid = ParticleGrid::lattice(3, 1.0, Vec3::ZERO, 0.1);
        let before = grid.clone();
        let acc = ForceBuffer::with_len(grid.len());

        for substep in 0..1000 {
            integration_phase(&mut grid, &acc, 0.001, substep).unwrap();
        }

        for (a, b) in grid.particles.iter().zip(&before.particles) {
            assert_eq!(a.pos, b.pos);
        }
    }

    #[test]
    fn integration_reports_non_finite_state() {
        let mut grid = ParticleGrid::lattice(2, 1.0, Vec3::ZERO, 0.1);
        let mut acc = ForceBuffer::with_len(4);
        acc.add(2, Vec3::new(f32::INFINITY, 0.0, 0.0));

        let err = integration_phase(&mut grid, &acc, 0.001, 17).unwrap_err();
        assert_eq!(
            err,
            ClothError::Diverged {
                substep: 17,
                particle: 2
            }
        );
    }
}
