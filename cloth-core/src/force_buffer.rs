use crate::types::ParticleId;
use glam::Vec3;

/// A scratch buffer that accumulates the net force on each particle.
///
/// The buffer is rebuilt every substep: it is first seeded with the
/// constant per-particle load (gravity plus external force), then every
/// spring adds its contribution to both of its endpoints.
///
/// Partial buffers filled from disjoint slices of the spring list can be
/// combined with [`ForceBuffer::merge_from`]; merging in a fixed order keeps
/// the summation order, and therefore the result, deterministic.
#[derive(Clone, Debug)]
pub struct ForceBuffer {
    /// Accumulated force for each particle.
    force: Vec<Vec3>,
}

impl ForceBuffer {
    /// Creates a new [`ForceBuffer`] with the given length.
    ///
    /// All forces are initialized to `Vec3::ZERO`.
    ///
    /// ### Parameters
    /// - `len` - Number of particles this buffer stores forces for.
    pub fn with_len(len: usize) -> Self {
        Self {
            force: vec![Vec3::ZERO; len],
        }
    }

    /// Ensures that the internal storage has exactly the given length.
    ///
    /// After this call every entry is `Vec3::ZERO`, even if the length was
    /// already correct.
    ///
    /// ### Parameters
    /// - `len` - Desired length of the internal buffer.
    pub fn ensure_len(&mut self, len: usize) {
        if self.force.len() != len {
            self.force.resize(len, Vec3::ZERO);
        }
        self.clear();
    }

    /// Resets every entry to `Vec3::ZERO`, keeping the length.
    pub fn clear(&mut self) {
        self.fill(Vec3::ZERO);
    }

    /// Sets every entry to the same force.
    pub fn fill(&mut self, value: Vec3) {
        for f in &mut self.force {
            *f = value;
        }
    }

    /// Adds `f` to the force acting on particle `id`.
    ///
    /// ### Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    pub fn add(&mut self, id: ParticleId, f: Vec3) {
        self.force[id] += f;
    }

    /// Applies an equal and opposite pair: `+f` on `p`, `-f` on `q`.
    ///
    /// ### Panics
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn add_pair(&mut self, p: ParticleId, q: ParticleId, f: Vec3) {
        self.force[p] += f;
        self.force[q] -= f;
    }

    /// Returns the accumulated force on particle `id`.
    #[inline]
    pub fn get(&self, id: ParticleId) -> Vec3 {
        self.force[id]
    }

    pub fn len(&self) -> usize {
        self.force.len()
    }

    pub fn is_empty(&self) -> bool {
        self.force.is_empty()
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.force
    }

    /// Merges another [`ForceBuffer`] into this one, entry by entry.
    ///
    /// ### Parameters
    /// - `other` - The partial buffer whose forces are added to `self`.
    ///
    /// ### Panics
    /// Panics if the two buffers have different lengths.
    pub fn merge_from(&mut self, other: &ForceBuffer) {
        assert_eq!(self.force.len(), other.force.len());
        for (f, o) in self.force.iter_mut().zip(&other.force) {
            *f += *o;
        }
    }
}
