//! Mesh data model shared by every stage.
//!
//! - `TetMesh` + `Parametrization`: the read-only input.
//! - `HexMesh`: the assembled output with derived face/edge adjacency.
//! - `PiecewiseLinearMesh`: traced boundary surface/curves.

mod types;
mod validate;

pub use types::{
    HexEdge, HexFace, HexMesh, Parametrization, PiecewiseLinearMesh, TetMesh,
};
pub use validate::check_input;
