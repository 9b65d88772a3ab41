//! Per-vertex normals for shading.
//!
//! Normals are a rendering input, so they are recomputed once per frame
//! rather than once per substep.

use glam::Vec3;

use crate::types::{ParticleId, Triangle};

/// Normal given to vertices that no (non-degenerate) triangle touches.
pub const DEFAULT_NORMAL: Vec3 = Vec3::Y;

/// Recomputes one unit normal per vertex.
///
/// Each triangle `[a, b, c]` adds its raw face normal
/// `(x_b - x_a) × (x_c - x_a)` to its three corners, so larger faces weigh
/// more. Zero-area faces add nothing. Accumulated vectors are then
/// normalized; a vertex left at zero gets [`DEFAULT_NORMAL`].
///
/// `normals` is resized to `positions.len()`.
///
/// ### Panics
/// Panics if a triangle indexes outside `positions`.
pub fn estimate_normals(positions: &[Vec3], triangles: &[Triangle], normals: &mut Vec<Vec3>) {
    normals.clear();
    normals.resize(positions.len(), Vec3::ZERO);

    for &[a, b, c] in triangles {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    // Only an exactly-zero sum falls back; non-finite sums stay non-finite
    // so divergence remains visible to the caller.
    for n in normals.iter_mut() {
        let len = n.length();
        *n = if len == 0.0 { DEFAULT_NORMAL } else { *n / len };
    }
}

/// Index of the first normal with a non-finite component, if any.
pub fn first_non_finite(normals: &[Vec3]) -> Option<ParticleId> {
    normals.iter().position(|n| !n.is_finite())
}
