//! In-memory meshes: the parametrized tetrahedral input and both outputs.

use nalgebra::Vector3;

use crate::lattice::{LatticePoint, HEX_TETS};

/// Tetrahedral input mesh. Read-only for the whole extraction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TetMesh {
    pub vertices: Vec<Vector3<f64>>,
    pub cells: Vec<[usize; 4]>,
}

impl TetMesh {
    pub fn new(vertices: Vec<Vector3<f64>>, cells: Vec<[usize; 4]>) -> Self {
        Self { vertices, cells }
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// World-space corners of `cell` in local corner order.
    #[inline]
    pub fn corners(&self, cell: usize) -> [Vector3<f64>; 4] {
        self.cells[cell].map(|v| self.vertices[v])
    }
}

/// Integer-grid map stored per (cell, local corner).
///
/// Invariant: `corners[c][i]` is the parameter of `mesh.cells[c][i]` as seen
/// from cell `c`. The same world vertex may carry different values in
/// different cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parametrization {
    pub corners: Vec<[Vector3<f64>; 4]>,
}

impl Parametrization {
    pub fn new(corners: Vec<[Vector3<f64>; 4]>) -> Self {
        Self { corners }
    }

    /// Build a seamless parametrization from one parameter per world vertex.
    pub fn from_vertex_params(mesh: &TetMesh, params: &[Vector3<f64>]) -> Self {
        let corners = mesh
            .cells
            .iter()
            .map(|cell| cell.map(|v| params[v]))
            .collect();
        Self { corners }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.corners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }
}

/// Face of the hex complex with its incident cells (at most two when valid).
#[derive(Clone, Debug, PartialEq)]
pub struct HexFace {
    /// Oriented outward from `cells[0]`.
    pub vertices: [usize; 4],
    pub cells: Vec<usize>,
}

impl HexFace {
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.cells.len() == 1
    }
}

/// Edge of the hex complex with its incident cells and face count.
#[derive(Clone, Debug, PartialEq)]
pub struct HexEdge {
    /// Sorted ascending.
    pub vertices: [usize; 2],
    pub cells: Vec<usize>,
    pub num_faces: usize,
}

/// Extracted hexahedral mesh.
///
/// Invariants:
/// - Vertices are sorted by lattice coordinate, cells by cube origin.
/// - Every cell has positive world volume in its stored corner order.
/// - `faces` and `edges` are derived from `cells` and never edited directly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HexMesh {
    pub vertices: Vec<Vector3<f64>>,
    pub cells: Vec<[usize; 8]>,
    /// Lattice coordinate of each vertex (at the configured scale).
    pub vertex_lattice: Vec<LatticePoint>,
    /// Tetrahedron that claimed each vertex.
    pub vertex_owner: Vec<usize>,
    /// Lattice cube origin of each cell.
    pub cell_lattice: Vec<LatticePoint>,
    pub faces: Vec<HexFace>,
    pub edges: Vec<HexEdge>,
    /// Cells touching a topology anomaly, sorted.
    pub anomalous_cells: Vec<usize>,
}

impl HexMesh {
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Signed world volume of one cell (six-tet split around the 0-6 diagonal).
    pub fn cell_volume(&self, cell: usize) -> f64 {
        let c = &self.cells[cell];
        HEX_TETS
            .iter()
            .map(|t| {
                let [a, b, cc, d] = t.map(|k| self.vertices[c[k]]);
                (b - a).cross(&(cc - a)).dot(&(d - a)) / 6.0
            })
            .sum()
    }

    pub fn total_volume(&self) -> f64 {
        (0..self.cells.len()).map(|c| self.cell_volume(c)).sum()
    }

    pub fn boundary_faces(&self) -> impl Iterator<Item = &HexFace> {
        self.faces.iter().filter(|f| f.is_boundary())
    }
}

/// Piecewise-linear surface/curve mesh.
///
/// Faces list half-edge ids: `2 * e` walks `edges[e]` forward, `2 * e + 1` backward.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PiecewiseLinearMesh {
    pub points: Vec<Vector3<f64>>,
    pub edges: Vec<[usize; 2]>,
    pub faces: Vec<Vec<usize>>,
}

impl PiecewiseLinearMesh {
    /// Start vertex of half-edge `he`.
    #[inline]
    pub fn halfedge_from(&self, he: usize) -> usize {
        let [a, b] = self.edges[he / 2];
        if he % 2 == 0 {
            a
        } else {
            b
        }
    }

    /// Vertex loop of `face` in traversal order.
    pub fn face_vertices(&self, face: usize) -> Vec<usize> {
        self.faces[face]
            .iter()
            .map(|&he| self.halfedge_from(he))
            .collect()
    }
}
