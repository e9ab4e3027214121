//! Structural checks on the input. Any failure here aborts the extraction.

use super::types::{Parametrization, TetMesh};
use crate::error::ExtractError;

/// Validate that `mesh` and `igm` describe a well-formed parametrized tet mesh.
///
/// Checks (in order): one corner set per cell, vertex references in range and
/// pairwise distinct, finite world and parameter coordinates.
pub fn check_input(mesh: &TetMesh, igm: &Parametrization) -> Result<(), ExtractError> {
    if igm.len() != mesh.cells.len() {
        return Err(ExtractError::ParametrizationMismatch {
            cells: mesh.cells.len(),
            parametrized: igm.len(),
        });
    }
    let num_vertices = mesh.vertices.len();
    for (ci, cell) in mesh.cells.iter().enumerate() {
        for (k, &v) in cell.iter().enumerate() {
            if v >= num_vertices {
                return Err(ExtractError::VertexOutOfRange {
                    cell: ci,
                    vertex: v,
                    num_vertices,
                });
            }
            if cell[..k].contains(&v) {
                return Err(ExtractError::RepeatedVertex {
                    cell: ci,
                    vertex: v,
                });
            }
        }
    }
    if let Some(i) = mesh
        .vertices
        .iter()
        .position(|p| !p.iter().all(|x| x.is_finite()))
    {
        return Err(ExtractError::NonFiniteCoordinate {
            what: "vertex",
            index: i,
        });
    }
    if let Some(i) = igm
        .corners
        .iter()
        .position(|cs| !cs.iter().all(|p| p.iter().all(|x| x.is_finite())))
    {
        return Err(ExtractError::NonFiniteCoordinate {
            what: "parameter",
            index: i,
        });
    }
    Ok(())
}
