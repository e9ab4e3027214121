//! Complete cubes to hex cells: vertex numbering and canonical corner order.

use nalgebra::Vector3;
use rustc_hash::FxHashMap;

use super::Merged;
use crate::lattice::{LatticePoint, HEX_TETS, MIRROR_X};
use crate::mesh::HexMesh;

/// Outcome counters of cell assembly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellStats {
    /// Cubes with some coverage that never became a cell.
    pub discarded_partial_cubes: usize,
    /// Emitted cells whose summed coverage exceeds one (overlapping tets).
    pub overlapping_cells: usize,
    /// Cells emitted in mirrored corner order.
    pub mirrored_cells: usize,
}

fn hex_volume(corners: &[Vector3<f64>; 8]) -> f64 {
    HEX_TETS
        .iter()
        .map(|t| {
            let [a, b, c, d] = t.map(|k| corners[k]);
            (b - a).cross(&(c - a)).dot(&(d - a)) / 6.0
        })
        .sum()
}

/// Emit every complete cube as a cell; faces and edges are left empty.
pub fn build(merged: &Merged, coverage_tolerance: f64) -> (HexMesh, CellStats) {
    let mut stats = CellStats::default();

    let mut origins: Vec<LatticePoint> = merged.cubes.keys().copied().collect();
    origins.sort_unstable();

    let mut complete = Vec::new();
    for origin in origins {
        let acc = merged.cubes[&origin];
        let corners = origin.cube_corners();
        let claimed = corners.iter().all(|p| merged.lattice.contains_key(p));
        if acc.coverage >= 1.0 - coverage_tolerance && claimed {
            let overlapping = acc.coverage > 1.0 + coverage_tolerance;
            complete.push((origin, corners, overlapping));
        } else {
            stats.discarded_partial_cubes += 1;
        }
    }

    let mut points: Vec<LatticePoint> = complete
        .iter()
        .flat_map(|(_, corners, _)| corners.iter().copied())
        .collect();
    points.sort_unstable();
    points.dedup();
    let index: FxHashMap<LatticePoint, usize> =
        points.iter().enumerate().map(|(i, &p)| (p, i)).collect();

    let mut hex = HexMesh {
        vertices: Vec::with_capacity(points.len()),
        vertex_lattice: points,
        vertex_owner: Vec::new(),
        ..HexMesh::default()
    };
    for p in &hex.vertex_lattice {
        let entry = &merged.lattice[p];
        hex.vertices.push(entry.world);
        hex.vertex_owner.push(entry.owner);
    }

    for (origin, corners, overlapping) in complete {
        let ids = corners.map(|p| index[&p]);
        let world = ids.map(|i| hex.vertices[i]);
        let cell = if hex_volume(&world) < 0.0 {
            stats.mirrored_cells += 1;
            MIRROR_X.map(|k| ids[k])
        } else {
            ids
        };
        if overlapping {
            stats.overlapping_cells += 1;
            hex.anomalous_cells.push(hex.cells.len());
        }
        hex.cells.push(cell);
        hex.cell_lattice.push(origin);
    }

    (hex, stats)
}
