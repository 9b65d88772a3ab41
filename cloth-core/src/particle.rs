//! The particle lattice: point masses with position, velocity and pin flag.

use glam::Vec3;
use rand::Rng;

use crate::error::ClothError;
use crate::types::ParticleId;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub pos: Vec3,
    pub vel: Vec3,
    pub pinned: bool,
}

impl Particle {
    /// A free particle at `pos` with zero velocity.
    pub fn at_rest(pos: Vec3) -> Self {
        Self {
            pos,
            vel: Vec3::ZERO,
            pinned: false,
        }
    }
}

/// A row-major `size × size` lattice of particles sharing one mass.
#[derive(Clone, Debug)]
pub struct ParticleGrid {
    pub particles: Vec<Particle>,
    size: usize,
    mass: f32,
}

impl ParticleGrid {
    /// Lays out a flat sheet in the XZ plane.
    ///
    /// Particle `(row, col)` sits at `origin + (col * spacing, 0, row * spacing)`,
    /// at rest and unpinned.
    pub fn lattice(size: usize, spacing: f32, origin: Vec3, mass: f32) -> Self {
        let mut particles = Vec::with_capacity(size * size);
        for row in 0..size {
            for col in 0..size {
                let offset = Vec3::new(col as f32 * spacing, 0.0, row as f32 * spacing);
                particles.push(Particle::at_rest(origin + offset));
            }
        }

        Self {
            particles,
            size,
            mass,
        }
    }

    /// Flat index of the particle at `(row, col)`.
    ///
    /// ### Parameters
    /// - `row` - Row in `0..size`.
    /// - `col` - Column in `0..size`.
    ///
    /// ### Returns
    /// `row * size + col`. Out-of-range inputs are not checked.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> ParticleId {
        row * self.size + col
    }

    /// Particles along each side.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Mass shared by every particle.
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Total particle count, `size * size`.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Pins every listed particle, leaving the others untouched.
    ///
    /// A pinned particle's velocity is zeroed so it stays put.
    ///
    /// ### Errors
    /// [`ClothError::PinOutOfRange`] for the first index outside the lattice;
    /// no particle is pinned in that case.
    pub fn pin_all(&mut self, ids: &[ParticleId]) -> Result<(), ClothError> {
        let count = self.particles.len();
        if let Some(&index) = ids.iter().find(|&&i| i >= count) {
            return Err(ClothError::PinOutOfRange { index, count });
        }
        for &id in ids {
            let p = &mut self.particles[id];
            p.pinned = true;
            p.vel = Vec3::ZERO;
        }
        Ok(())
    }

    /// Indices of pinned particles in ascending order.
    pub fn pinned_ids(&self) -> impl Iterator<Item = ParticleId> + '_ {
        self.particles
            .iter()
            .enumerate()
            .filter_map(|(i, p)| if p.pinned { Some(i) } else { None })
    }

    /// Displaces every free particle by a uniform random offset in
    /// `[-amplitude, amplitude]` per axis.
    pub fn perturb(&mut self, amplitude: f32, rng: &mut impl Rng) {
        if amplitude <= 0.0 {
            return;
        }
        for p in self.particles.iter_mut().filter(|p| !p.pinned) {
            p.pos += Vec3::new(
                rng.random_range(-amplitude..=amplitude),
                rng.random_range(-amplitude..=amplitude),
                rng.random_range(-amplitude..=amplitude),
            );
        }
    }

    /// Writes positions as `[x0, y0, z0, x1, ...]`, reusing `out`'s allocation.
    pub fn write_positions(&self, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(self.particles.len() * 3);
        for p in &self.particles {
            out.extend_from_slice(&p.pos.to_array());
        }
    }

    /// Total kinetic energy `½ m Σ |v|²`.
    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.particles.iter().map(|p| p.vel.length_squared()).sum::<f32>()
    }
}
