/// Identifier for a particle in a [`crate::particle::ParticleGrid`].
///
/// This is a row-major index into `ParticleGrid::particles`
/// (`row * size + col`), and is only meaningful within the lifetime of a
/// given grid.
pub type ParticleId = usize;

/// One triangle of the cloth surface, as indices into the position buffer.
pub type Triangle = [u32; 3];
