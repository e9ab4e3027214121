//! Convex polytope clipping in parameter space and the per-tet cube classifier.
//!
//! - `types`: half-spaces and face-labelled polytopes.
//! - `polytope`: half-space intersection with capping, volumes.
//! - `classify`: lattice claims and cube candidates for one tetrahedron.

mod classify;
mod polytope;
mod types;

pub use classify::{
    classify_cube, contribute, CellCandidate, ClassifyOpts, CubeKind, EdgePiece, FacePiece,
    LatticeClaim, TetContribution, MIN_COVERAGE,
};
pub use polytope::area_vector2;
pub use types::{FaceOrigin, Facet, Hs3, Poly3};
