//! Mesh Assembler: merges per-tet contributions into one hexahedral complex.
//!
//! Flow
//! - `merge`: single-threaded fold of the ordered contributions into the
//!   lattice table, per-cube coverage sums and (optionally) boundary pieces.
//! - `cells::build`: complete cubes become hex cells with canonical corners.
//! - `topology::derive`: faces, edges and the non-fatal topology checks.
//!
//! Every tie-break depends on the tet index or the lattice coordinate only,
//! never on the order in which workers finished.

mod cells;
mod topology;

use nalgebra::Vector3;
use rustc_hash::FxHashMap;

use crate::clip::{EdgePiece, FacePiece, TetContribution};
use crate::lattice::LatticePoint;
use crate::mesh::HexMesh;

pub use cells::{build as build_cells, CellStats};
pub use topology::{derive as derive_topology, TopologyStats};

/// Owner and world position of one claimed lattice point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeEntry {
    pub owner: usize,
    pub world: Vector3<f64>,
    /// Number of tets that claimed the point (only the owner's claim is used).
    pub claims: u32,
    /// Claims from tets holding the point strictly inside.
    pub interior_claims: u32,
}

/// Coverage accumulated for one lattice cube.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CubeAccum {
    pub coverage: f64,
    pub tets: u32,
}

/// Face and edge pieces keyed by `(cube origin, local face/edge)`, in tet order.
#[derive(Clone, Debug, Default)]
pub struct PieceStore {
    pub faces: FxHashMap<(LatticePoint, u8), Vec<(usize, FacePiece)>>,
    pub edges: FxHashMap<(LatticePoint, u8), Vec<(usize, EdgePiece)>>,
}

impl PieceStore {
    pub fn face_pieces(&self, cube: LatticePoint, face: u8) -> &[(usize, FacePiece)] {
        self.faces.get(&(cube, face)).map_or(&[], Vec::as_slice)
    }

    pub fn edge_pieces(&self, cube: LatticePoint, edge: u8) -> &[(usize, EdgePiece)] {
        self.edges.get(&(cube, edge)).map_or(&[], Vec::as_slice)
    }
}

/// Global state after all contributions were merged.
#[derive(Clone, Debug, Default)]
pub struct Merged {
    pub lattice: FxHashMap<LatticePoint, LatticeEntry>,
    pub cubes: FxHashMap<LatticePoint, CubeAccum>,
    pub pieces: PieceStore,
}

impl Merged {
    /// Lattice points claimed by more than one tet (shared faces, edges, vertices).
    pub fn shared_points(&self) -> usize {
        self.lattice.values().filter(|e| e.claims > 1).count()
    }

    /// Points claimed several times although some claimant holds them in its
    /// interior: the parametrization folds over there.
    pub fn folded_points(&self) -> usize {
        self.lattice
            .values()
            .filter(|e| e.claims > 1 && e.interior_claims > 0)
            .count()
    }
}

/// Fold contributions into the global tables.
///
/// The smallest tet index wins every lattice point regardless of the order
/// of `contributions`; coverage is summed in the given order, which callers
/// keep sorted by tet index so the floating-point sums are reproducible.
pub fn merge<I>(contributions: I) -> Merged
where
    I: IntoIterator<Item = TetContribution>,
{
    let mut merged = Merged::default();
    for contrib in contributions {
        let tet = contrib.tet;
        for claim in contrib.claims {
            let interior = u32::from(!claim.on_boundary);
            merged
                .lattice
                .entry(claim.point)
                .and_modify(|e| {
                    e.claims += 1;
                    e.interior_claims += interior;
                    if tet < e.owner {
                        e.owner = tet;
                        e.world = claim.world;
                    }
                })
                .or_insert(LatticeEntry {
                    owner: tet,
                    world: claim.world,
                    claims: 1,
                    interior_claims: interior,
                });
        }
        for cand in contrib.candidates {
            let acc = merged.cubes.entry(cand.cube).or_default();
            acc.coverage += cand.coverage;
            acc.tets += 1;
            for piece in cand.face_pieces {
                merged
                    .pieces
                    .faces
                    .entry((cand.cube, piece.face))
                    .or_default()
                    .push((tet, piece));
            }
            for piece in cand.edge_pieces {
                merged
                    .pieces
                    .edges
                    .entry((cand.cube, piece.edge))
                    .or_default()
                    .push((tet, piece));
            }
        }
    }
    merged
}

/// Counters produced by [`assemble`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub cells: CellStats,
    pub topology: TopologyStats,
}

/// Build the hex mesh from merged tables; `None` if no cube became a cell.
pub fn assemble(merged: &Merged, coverage_tolerance: f64) -> (Option<HexMesh>, AssemblyStats) {
    let (mut hex, cells) = build_cells(merged, coverage_tolerance);
    if hex.cells.is_empty() {
        return (
            None,
            AssemblyStats {
                cells,
                topology: TopologyStats::default(),
            },
        );
    }
    let topology = derive_topology(&mut hex);
    (Some(hex), AssemblyStats { cells, topology })
}
