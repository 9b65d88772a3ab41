//! Spring network and triangulation of the lattice.
//!
//! Both are derived once from the lattice size and never change during a
//! run.

use std::f32::consts::SQRT_2;

use crate::error::ClothError;
use crate::types::{ParticleId, Triangle};

/// An elastic link between particles `p` and `q`.
///
/// Stiffness and damping are shared by every spring and live in
/// [`crate::config::Config`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spring {
    pub p: ParticleId,
    pub q: ParticleId,
    rest_length: f32,
}

impl Spring {
    pub fn new(p: ParticleId, q: ParticleId, rest_length: f32) -> Self {
        debug_assert!(p != q, "spring endpoints must differ");
        Self { p, q, rest_length }
    }

    pub fn rest_length(&self) -> f32 {
        self.rest_length
    }
}

/// Builds the six springs of every unit cell of an `n × n` lattice.
///
/// For the cell whose top-left particle is `top`, in order: the two
/// vertical edges, the two horizontal edges and both diagonals. Edges shared
/// by two cells are emitted by each of them, giving `6 (n - 1)²` springs.
///
/// ### Errors
/// [`ClothError::InvalidLatticeSize`] if `n < 2`.
pub fn build_springs(n: usize, spacing: f32) -> Result<Vec<Spring>, ClothError> {
    if n < 2 {
        return Err(ClothError::InvalidLatticeSize { size: n });
    }

    let diagonal = SQRT_2 * spacing;
    let mut springs = Vec::with_capacity(6 * (n - 1) * (n - 1));

    for i in 0..n - 1 {
        for j in 0..n - 1 {
            let top = i * n + j;
            springs.push(Spring::new(top, top + n, spacing));
            springs.push(Spring::new(top, top + 1, spacing));
            springs.push(Spring::new(top + 1, top + 1 + n, spacing));
            springs.push(Spring::new(top + n, top + 1 + n, spacing));
            springs.push(Spring::new(top, top + 1 + n, diagonal));
            springs.push(Spring::new(top + 1, top + n, diagonal));
        }
    }

    Ok(springs)
}

/// Splits every unit cell into two triangles, `[tl, bl, tr]` and `[tr, bl, br]`.
///
/// The winding makes the normals of the undeformed sheet (rows along +Z,
/// columns along +X) point along +Y.
///
/// ### Errors
/// [`ClothError::InvalidLatticeSize`] if `n < 2`.
pub fn build_triangles(n: usize) -> Result<Vec<Triangle>, ClothError> {
    if n < 2 {
        return Err(ClothError::InvalidLatticeSize { size: n });
    }

    let mut triangles = Vec::with_capacity(2 * (n - 1) * (n - 1));
    for i in 0..n - 1 {
        for j in 0..n - 1 {
            let tl = (i * n + j) as u32;
            let tr = tl + 1;
            let bl = tl + n as u32;
            let br = bl + 1;
            triangles.push([tl, bl, tr]);
            triangles.push([tr, bl, br]);
        }
    }

    Ok(triangles)
}

/// Checks that every spring joins two distinct, existing particles.
///
/// ### Errors
/// [`ClothError::InvalidSpring`] for the first offending spring.
pub fn validate_springs(springs: &[Spring], count: usize) -> Result<(), ClothError> {
    for (index, s) in springs.iter().enumerate() {
        if s.p == s.q || s.p >= count || s.q >= count {
            return Err(ClothError::InvalidSpring {
                index,
                p: s.p,
                q: s.q,
                count,
            });
        }
    }
    Ok(())
}

/// Checks that every triangle references existing particles.
///
/// ### Errors
/// [`ClothError::InvalidTriangle`] for the first offending triangle.
pub fn validate_triangles(triangles: &[Triangle], count: usize) -> Result<(), ClothError> {
    match triangles
        .iter()
        .position(|t| t.iter().any(|&v| v as usize >= count))
    {
        Some(index) => Err(ClothError::InvalidTriangle { index, count }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(2)]
    #[test_case(3)]
    #[test_case(10)]
    #[test_case(33)]
    fn spring_and_triangle_counts_follow_cell_count(n: usize) {
        let cells = (n - 1) * (n - 1);
        assert_eq!(build_springs(n, 1.0).unwrap().len(), 6 * cells);
        assert_eq!(build_triangles(n).unwrap().len(), 2 * cells);
    }

    #[test]
    fn two_by_two_cell_has_expected_springs() {
        let springs = build_springs(2, 0.5).unwrap();
        let pairs: Vec<_> = springs.iter().map(|s| (s.p, s.q)).collect();
        assert_eq!(pairs, vec![(0, 2), (0, 1), (1, 3), (2, 3), (0, 3), (1, 2)]);

        for s in &springs[..4] {
            assert_eq!(s.rest_length(), 0.5);
        }
        for s in &springs[4..] {
            assert!((s.rest_length() - 0.5 * SQRT_2).abs() < 1e-6);
        }
    }

    #[test]
    fn generated_springs_are_valid() {
        let n = 7;
        let springs = build_springs(n, 1.0).unwrap();
        assert_eq!(validate_springs(&springs, n * n), Ok(()));
        assert_eq!(validate_triangles(&build_triangles(n).unwrap(), n * n), Ok(()));
        assert_eq!(
            validate_triangles(&[[0, 1, 9]], 9),
            Err(ClothError::InvalidTriangle { index: 0, count: 9 })
        );
    }

    #[test]
    fn rejects_tiny_lattice() {
        assert_eq!(
            build_springs(1, 1.0),
            Err(ClothError::InvalidLatticeSize { size: 1 })
        );
        assert_eq!(
            build_triangles(0),
            Err(ClothError::InvalidLatticeSize { size: 0 })
        );
    }

    #[test]
    fn validate_springs_reports_first_bad_spring() {
        let springs = [Spring::new(0, 1, 1.0), Spring::new(1, 5, 1.0)];
        assert_eq!(
            validate_springs(&springs, 4),
            Err(ClothError::InvalidSpring {
                index: 1,
                p: 1,
                q: 5,
                count: 4
            })
        );
    }
}
