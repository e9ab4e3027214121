//! Piecewise-Linear Boundary Extractor.
//!
//! Traces the boundary of the assembled hex mesh through the tetrahedra:
//! - faces: every boundary hex face is replaced by the pieces the tets cut out
//!   of it, each mapped to world space by its own tet;
//! - edges: every boundary hex edge becomes a polyline broken wherever a tet
//!   boundary crosses it.
//!
//! Points are shared through a snapped parameter-space key, and face pieces
//! are refined with the breakpoints of the hex edges they lie on, so the traced
//! surface has the boundary loops and genus of the hex mesh.

use nalgebra::Vector3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::assemble::PieceStore;
use crate::lattice::{LatticePoint, CUBE_CORNERS, HEX_EDGES, HEX_FACES};
use crate::mesh::{HexMesh, PiecewiseLinearMesh};

/// Parameter coordinates closer than `1 / KEY_SCALE` share one point.
const KEY_SCALE: f64 = 1e7;
/// Distance to a hex edge (parameter units) counted as lying on it.
const ON_EDGE_TOL: f64 = 1e-9;

type PointKey = [i64; 3];

#[inline]
fn key(p: Vector3<f64>) -> PointKey {
    [
        (p.x * KEY_SCALE).round() as i64,
        (p.y * KEY_SCALE).round() as i64,
        (p.z * KEY_SCALE).round() as i64,
    ]
}

#[derive(Default)]
struct Builder {
    mesh: PiecewiseLinearMesh,
    point_of: FxHashMap<PointKey, usize>,
    edge_of: FxHashMap<[usize; 2], usize>,
}

impl Builder {
    /// Id of the point at parameter `param`; the first world position wins.
    fn point(&mut self, param: Vector3<f64>, world: Vector3<f64>) -> usize {
        let points = &mut self.mesh.points;
        *self.point_of.entry(key(param)).or_insert_with(|| {
            points.push(world);
            points.len() - 1
        })
    }

    /// Half-edge id for `a -> b`, creating the undirected edge on first use.
    fn halfedge(&mut self, a: usize, b: usize) -> usize {
        let k = if a < b { [a, b] } else { [b, a] };
        let edges = &mut self.mesh.edges;
        let e = *self.edge_of.entry(k).or_insert_with(|| {
            edges.push(k);
            edges.len() - 1
        });
        if a == k[0] {
            2 * e
        } else {
            2 * e + 1
        }
    }
}

/// A boundary hex edge in lattice order (`lo < hi`, differing along `axis`).
#[derive(Clone, Copy, Debug)]
struct SideKey {
    lo: LatticePoint,
    hi: LatticePoint,
    axis: usize,
}

impl SideKey {
    fn new(a: LatticePoint, b: LatticePoint) -> Option<Self> {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let axis = (0..3).find(|&i| lo.0[i] != hi.0[i])?;
        Some(Self { lo, hi, axis })
    }

    /// Position of `p` along the edge, if it lies on it.
    fn locate(&self, p: Vector3<f64>) -> Option<f64> {
        let lo = self.lo.to_vector();
        for i in 0..3 {
            if i != self.axis && (p[i] - lo[i]).abs() > ON_EDGE_TOL {
                return None;
            }
        }
        let t = p[self.axis] - lo[self.axis];
        (-ON_EDGE_TOL..=1.0 + ON_EDGE_TOL)
            .contains(&t)
            .then(|| t.clamp(0.0, 1.0))
    }
}

/// Sorted breakpoints `(t, point id)` per boundary hex edge.
type Breakpoints = FxHashMap<(LatticePoint, LatticePoint), Vec<(f64, usize)>>;

fn push_breakpoint(bp: &mut Breakpoints, side: &SideKey, t: f64, id: usize) {
    bp.entry((side.lo, side.hi)).or_default().push((t, id));
}

/// Local face index of the cube at `origin` whose lattice corners match `corners`.
fn local_face(origin: LatticePoint, corners: [LatticePoint; 4]) -> Option<u8> {
    let mut want = corners;
    want.sort_unstable();
    let cube = origin.cube_corners();
    HEX_FACES
        .iter()
        .position(|quad| {
            let mut have = quad.map(|k| cube[k]);
            have.sort_unstable();
            have == want
        })
        .map(|f| f as u8)
}

/// Local edge index joining `lo` and `hi`, and whether it runs from `hi` to `lo`.
fn local_edge(origin: LatticePoint, lo: LatticePoint, hi: LatticePoint) -> Option<(u8, bool)> {
    HEX_EDGES.iter().enumerate().find_map(|(e, [a, b])| {
        let pa = origin.offset(CUBE_CORNERS[*a]);
        let pb = origin.offset(CUBE_CORNERS[*b]);
        if pa == lo && pb == hi {
            Some((e as u8, false))
        } else if pa == hi && pb == lo {
            Some((e as u8, true))
        } else {
            None
        }
    })
}

struct BoundaryFace {
    cube: LatticePoint,
    face: u8,
    sides: [SideKey; 4],
}

/// Trace the boundary of `hex` through the stored tet pieces.
pub fn extract_piecewise_linear(
    hex: &HexMesh,
    pieces: &PieceStore,
    with_faces: bool,
    with_edges: bool,
) -> PiecewiseLinearMesh {
    let mut b = Builder::default();
    let lattice = |v: usize| hex.vertex_lattice[v];

    let mut faces = Vec::new();
    let mut sides: Vec<SideKey> = Vec::new();
    let mut seen: FxHashSet<(LatticePoint, LatticePoint)> = FxHashSet::default();
    let mut side_vertex: FxHashMap<LatticePoint, usize> = FxHashMap::default();
    for face in hex.boundary_faces() {
        let cube = hex.cell_lattice[face.cells[0]];
        let Some(f) = local_face(cube, face.vertices.map(lattice)) else {
            continue;
        };
        let mut quad_sides = Vec::with_capacity(4);
        for i in 0..4 {
            let (va, vb) = (face.vertices[i], face.vertices[(i + 1) % 4]);
            side_vertex.insert(lattice(va), va);
            let Some(side) = SideKey::new(lattice(va), lattice(vb)) else {
                continue;
            };
            if seen.insert((side.lo, side.hi)) {
                sides.push(side);
            }
            quad_sides.push(side);
        }
        let quad_sides: Result<[SideKey; 4], _> = quad_sides.try_into();
        if let Ok(sides) = quad_sides {
            faces.push(BoundaryFace {
                cube,
                face: f,
                sides,
            });
        }
    }

    // Hex corners first, positioned by their owning tets.
    let mut bp: Breakpoints = FxHashMap::default();
    for side in &sides {
        for (t, p) in [(0.0, side.lo), (1.0, side.hi)] {
            let world = hex.vertices[side_vertex[&p]];
            let id = b.point(p.to_vector(), world);
            push_breakpoint(&mut bp, side, t, id);
        }
    }

    if with_edges {
        let cell_of: FxHashMap<[usize; 2], usize> = hex
            .edges
            .iter()
            .map(|e| (e.vertices, e.cells[0]))
            .collect();
        for side in &sides {
            let (va, vb) = (side_vertex[&side.lo], side_vertex[&side.hi]);
            let k = if va < vb { [va, vb] } else { [vb, va] };
            let Some(&cell) = cell_of.get(&k) else {
                continue;
            };
            let cube = hex.cell_lattice[cell];
            let Some((e, reversed)) = local_edge(cube, side.lo, side.hi) else {
                continue;
            };
            let lo = side.lo.to_vector();
            let dir = side.hi.to_vector() - lo;
            for (_, piece) in pieces.edge_pieces(cube, e) {
                for t_local in [piece.t0, piece.t1] {
                    let t = if reversed { 1.0 - t_local } else { t_local };
                    if t <= ON_EDGE_TOL || t >= 1.0 - ON_EDGE_TOL {
                        continue;
                    }
                    let id = b.point(lo + dir * t, piece.world_at(t_local));
                    push_breakpoint(&mut bp, side, t, id);
                }
            }
        }
    }

    // Face pieces as loops of point ids with their parameter positions.
    let mut loops: Vec<(usize, Vec<(usize, Vector3<f64>)>)> = Vec::new();
    if with_faces {
        for (fi, bf) in faces.iter().enumerate() {
            for (_, piece) in pieces.face_pieces(bf.cube, bf.face) {
                let mut lp = Vec::with_capacity(piece.param.len());
                for (&param, &world) in piece.param.iter().zip(&piece.world) {
                    let id = b.point(param, world);
                    for side in &bf.sides {
                        if let Some(t) = side.locate(param) {
                            push_breakpoint(&mut bp, side, t, id);
                        }
                    }
                    lp.push((id, param));
                }
                loops.push((fi, lp));
            }
        }
    }

    for list in bp.values_mut() {
        list.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
        list.dedup_by_key(|x| x.1);
    }

    if with_edges {
        for side in &sides {
            let Some(list) = bp.get(&(side.lo, side.hi)) else {
                continue;
            };
            for w in list.windows(2) {
                if w[0].1 != w[1].1 {
                    b.halfedge(w[0].1, w[1].1);
                }
            }
        }
    }

    for (fi, lp) in loops {
        let bf = &faces[fi];
        let mut ids: Vec<usize> = Vec::with_capacity(lp.len() * 2);
        for i in 0..lp.len() {
            let (ia, pa) = lp[i];
            let (_, pb) = lp[(i + 1) % lp.len()];
            ids.push(ia);
            for side in &bf.sides {
                let (Some(ta), Some(tb)) = (side.locate(pa), side.locate(pb)) else {
                    continue;
                };
                let Some(list) = bp.get(&(side.lo, side.hi)) else {
                    continue;
                };
                let (lo, hi) = if ta < tb { (ta, tb) } else { (tb, ta) };
                let mut inner: Vec<(f64, usize)> = list
                    .iter()
                    .copied()
                    .filter(|&(t, _)| t > lo + ON_EDGE_TOL && t < hi - ON_EDGE_TOL)
                    .collect();
                if ta > tb {
                    inner.reverse();
                }
                ids.extend(inner.into_iter().map(|(_, id)| id));
                break;
            }
        }
        ids.dedup();
        while ids.len() > 1 && ids.first() == ids.last() {
            ids.pop();
        }
        if ids.len() < 3 {
            continue;
        }
        let face = (0..ids.len())
            .map(|i| b.halfedge(ids[i], ids[(i + 1) % ids.len()]))
            .collect();
        b.mesh.faces.push(face);
    }

    b.mesh
}
