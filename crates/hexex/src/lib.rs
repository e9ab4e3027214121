//! Hexahedral mesh extraction from integer-grid maps.
//!
//! Input: a tetrahedral mesh with a per-(cell, corner) parametrization whose
//! scaled integer lattice defines the hex cells. Output: the hex mesh, an
//! optional piecewise-linear trace of its boundary, and a report.
//!
//! Pipeline (see `extract`):
//! - `chart`: grid transitions across tet faces, one chart per component.
//! - `tet`: Jacobian check and affine frames (Degeneracy Handler).
//! - `lattice`: lattice points, cube tables, per-tet locator.
//! - `clip`: polytope clipping and per-cube classification.
//! - `assemble`: deterministic merge, cells, faces, edges, topology checks.
//! - `pwl`: boundary tracing through the tets.
//! - `report`: stage timings and counters.
//!
//! API Policy
//! - The library never reads files other than an explicitly requested config,
//!   never parses flags and never installs a logger; the `hexex` binary does.

pub mod assemble;
pub mod chart;
pub mod clip;
pub mod config;
pub mod error;
pub mod extract;
pub mod fixtures;
pub mod lattice;
pub mod mesh;
pub mod pwl;
pub mod report;
pub mod tet;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::Config;
pub use error::ExtractError;
pub use extract::{extract, ExtractionResult};
pub use mesh::{HexMesh, Parametrization, PiecewiseLinearMesh, TetMesh};
pub use report::Report;

/// Common exports for callers.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::ExtractError;
    pub use crate::extract::{extract, ExtractionResult};
    pub use crate::lattice::LatticePoint;
    pub use crate::mesh::{HexEdge, HexFace, HexMesh, Parametrization, PiecewiseLinearMesh, TetMesh};
    pub use crate::report::Report;
    pub use nalgebra::Vector3 as Vec3;
}
