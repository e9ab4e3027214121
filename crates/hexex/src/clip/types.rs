//! Core 3D types: half-spaces and face-labelled convex polytopes.

use nalgebra::Vector3;

/// Closed half-space `n . x <= c` in R^3.
///
/// Invariants:
/// - Built from tet faces, `n` is unit length so `eps` is a distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hs3 {
    pub n: Vector3<f64>,
    pub c: f64,
}

impl Hs3 {
    #[inline]
    pub fn new(n: Vector3<f64>, c: f64) -> Self {
        Self { n, c }
    }

    /// Signed distance-like value; positive means outside.
    #[inline]
    pub fn eval(&self, p: Vector3<f64>) -> f64 {
        self.n.dot(&p) - self.c
    }

    #[inline]
    pub fn satisfies(&self, p: Vector3<f64>, eps: f64) -> bool {
        self.eval(p) <= eps
    }
}

/// Where a polytope face came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaceOrigin {
    /// Unit-cube face `0..6` (`-x, +x, -y, +y, -z, +z`).
    Cube(u8),
    /// Supporting plane of the tet face opposite local corner `0..4`.
    Tet(u8),
}

/// Planar convex polygon, counterclockwise seen from outside the polytope.
#[derive(Clone, Debug, PartialEq)]
pub struct Facet {
    pub origin: FaceOrigin,
    pub vertices: Vec<Vector3<f64>>,
}

/// Convex polytope in R^3 stored as its boundary facets.
///
/// Invariants:
/// - Facets are outward oriented and together close the surface.
/// - An empty facet list means the empty (or flat) polytope.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Poly3 {
    pub facets: Vec<Facet>,
}
