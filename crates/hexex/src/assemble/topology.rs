//! Derived faces/edges and the non-fatal topology checks.

use rustc_hash::FxHashMap;

use crate::lattice::{HEX_EDGES, HEX_FACES};
use crate::mesh::{HexEdge, HexFace, HexMesh};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopologyStats {
    /// Faces shared by more than two cells.
    pub non_manifold_faces: usize,
    /// Edges whose cell count is neither the face count nor one less.
    pub inconsistent_edges: usize,
    pub boundary_faces: usize,
}

fn sorted<const N: usize>(mut v: [usize; N]) -> [usize; N] {
    v.sort_unstable();
    v
}

/// Fill `hex.faces` and `hex.edges` and mark anomalous cells.
///
/// Face and edge order is first appearance in cell order, so the result is a
/// pure function of `hex.cells`.
pub fn derive(hex: &mut HexMesh) -> TopologyStats {
    let mut stats = TopologyStats::default();

    let mut face_of: FxHashMap<[usize; 4], usize> = FxHashMap::default();
    let mut faces: Vec<HexFace> = Vec::new();
    let mut edge_of: FxHashMap<[usize; 2], usize> = FxHashMap::default();
    let mut edges: Vec<HexEdge> = Vec::new();

    for (c, cell) in hex.cells.iter().enumerate() {
        for quad in HEX_FACES {
            let vertices = quad.map(|k| cell[k]);
            let key = sorted(vertices);
            match face_of.get(&key) {
                Some(&f) => faces[f].cells.push(c),
                None => {
                    face_of.insert(key, faces.len());
                    faces.push(HexFace {
                        vertices,
                        cells: vec![c],
                    });
                }
            }
        }
        for pair in HEX_EDGES {
            let key = sorted(pair.map(|k| cell[k]));
            match edge_of.get(&key) {
                Some(&e) => edges[e].cells.push(c),
                None => {
                    edge_of.insert(key, edges.len());
                    edges.push(HexEdge {
                        vertices: key,
                        cells: vec![c],
                        num_faces: 0,
                    });
                }
            }
        }
    }

    for face in &faces {
        let v = face.vertices;
        for i in 0..4 {
            let key = sorted([v[i], v[(i + 1) % 4]]);
            if let Some(&e) = edge_of.get(&key) {
                edges[e].num_faces += 1;
            }
        }
    }

    let mut marked = std::mem::take(&mut hex.anomalous_cells);
    for face in &faces {
        match face.cells.len() {
            1 => stats.boundary_faces += 1,
            2 => {}
            _ => {
                stats.non_manifold_faces += 1;
                marked.extend_from_slice(&face.cells);
            }
        }
    }
    for edge in &edges {
        let (nc, nf) = (edge.cells.len(), edge.num_faces);
        if nc != nf && nc + 1 != nf {
            stats.inconsistent_edges += 1;
            marked.extend_from_slice(&edge.cells);
        }
    }
    marked.sort_unstable();
    marked.dedup();

    hex.faces = faces;
    hex.edges = edges;
    hex.anomalous_cells = marked;
    stats
}
