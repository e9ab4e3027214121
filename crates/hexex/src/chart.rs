//! Chart alignment across parametrization seams.
//!
//! The parametrization is stored per (cell, corner), so two tets sharing a
//! face may see it through different charts. Across a seam the charts differ
//! by a grid automorphism: one of the 24 rotations of the cube plus an
//! integer translation. `align_charts` walks the face adjacency breadth-first
//! from the smallest unvisited tet and maps every tet into the chart of that
//! root, so lattice points and cubes on both sides of a seam share one key.
//!
//! A face is only crossed when the transition keeps the two tets on opposite
//! sides of it. Faces whose sides still disagree afterwards (non-grid or
//! folding transitions, holonomy around singular edges) are counted, never
//! fatal.

use std::collections::VecDeque;

use nalgebra::Vector3;
use rustc_hash::FxHashMap;

use crate::mesh::TetMesh;

/// Parameter distance (unscaled lattice units) under which two corner values coincide.
pub const TRANSITION_TOLERANCE: f64 = 1e-6;

/// `x -> R x + t`, `R` a signed axis permutation with determinant +1.
///
/// Output axis `i` is `sign[i] * x[perm[i]] + shift[i]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridTransform {
    pub perm: [usize; 3],
    pub sign: [i64; 3],
    pub shift: [i64; 3],
}

const PERMS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [1, 2, 0],
    [2, 0, 1],
    [0, 2, 1],
    [2, 1, 0],
    [1, 0, 2],
];

impl GridTransform {
    pub const IDENTITY: Self = Self {
        perm: [0, 1, 2],
        sign: [1, 1, 1],
        shift: [0, 0, 0],
    };

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    #[inline]
    pub fn apply(&self, x: Vector3<f64>) -> Vector3<f64> {
        if self.is_identity() {
            return x;
        }
        Vector3::from_fn(|i, _| self.sign[i] as f64 * x[self.perm[i]] + self.shift[i] as f64)
    }

    #[inline]
    fn rotate(&self, x: Vector3<f64>) -> Vector3<f64> {
        Vector3::from_fn(|i, _| self.sign[i] as f64 * x[self.perm[i]])
    }

    /// `self ∘ other` (apply `other` first). Exact in integers.
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            perm: std::array::from_fn(|j| other.perm[self.perm[j]]),
            sign: std::array::from_fn(|j| self.sign[j] * other.sign[self.perm[j]]),
            shift: std::array::from_fn(|j| {
                self.sign[j] * other.shift[self.perm[j]] + self.shift[j]
            }),
        }
    }

    /// The 24 orientation-preserving rotations of the cube, identity first.
    pub fn rotations() -> impl Iterator<Item = Self> {
        (0..PERMS.len()).flat_map(|k| {
            (0..8u8).filter_map(move |bits| {
                let sign = [0, 1, 2].map(|i| if bits >> i & 1 == 1 { -1 } else { 1 });
                let parity = if k < 3 { 1 } else { -1 };
                (parity * sign[0] * sign[1] * sign[2] == 1).then_some(Self {
                    perm: PERMS[k],
                    sign,
                    shift: [0; 3],
                })
            })
        })
    }
}

/// Grid transform taking `from[k]` onto `to[k]` for all three points, if one exists.
///
/// `None` for a flat triangle (rotation ambiguous) or when the best rotation
/// leaves a non-integer translation.
pub fn fit_transition(
    from: &[Vector3<f64>; 3],
    to: &[Vector3<f64>; 3],
    tol: f64,
) -> Option<GridTransform> {
    let d = [from[1] - from[0], from[2] - from[0]];
    let e = [to[1] - to[0], to[2] - to[0]];
    if d[0].cross(&d[1]).norm() <= tol {
        return None;
    }
    let (err, mut t) = GridTransform::rotations()
        .map(|r| {
            let err = (r.rotate(d[0]) - e[0])
                .amax()
                .max((r.rotate(d[1]) - e[1]).amax());
            (err, r)
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))?;
    if err > tol {
        return None;
    }
    let off = to[0] - t.rotate(from[0]);
    let shift = off.map(f64::round);
    if (off - shift).amax() > tol {
        return None;
    }
    t.shift = [shift.x as i64, shift.y as i64, shift.z as i64];
    Some(t)
}

/// Two tets sharing a face; `corners[s][k]` is the local corner of `tets[s]`
/// at the `k`-th shared vertex (shared vertices sorted by id).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Interface {
    tets: [usize; 2],
    corners: [[usize; 3]; 2],
}

impl Interface {
    /// Local corner of `tets[side]` opposite the shared face.
    fn apex(&self, side: usize) -> usize {
        6 - self.corners[side].iter().sum::<usize>()
    }
}

/// `a` and `b` lie strictly on different sides of the plane through `face`.
fn opposite_sides(face: &[Vector3<f64>; 3], a: Vector3<f64>, b: Vector3<f64>) -> bool {
    let n = (face[1] - face[0]).cross(&(face[2] - face[0]));
    n.dot(&(a - face[0])) * n.dot(&(b - face[0])) < 0.0
}

fn interfaces(mesh: &TetMesh) -> Vec<Interface> {
    let mut open: FxHashMap<[usize; 3], (usize, [usize; 3])> = FxHashMap::default();
    let mut out = Vec::new();
    for (t, cell) in mesh.cells.iter().enumerate() {
        for skip in 0..4 {
            let mut local = [(skip + 1) % 4, (skip + 2) % 4, (skip + 3) % 4];
            local.sort_unstable_by_key(|&c| cell[c]);
            let key = local.map(|c| cell[c]);
            match open.remove(&key) {
                Some((s, other)) => out.push(Interface {
                    tets: [s, t],
                    corners: [other, local],
                }),
                None => {
                    open.insert(key, (t, local));
                }
            }
        }
    }
    out
}

fn coincide(a: &[Vector3<f64>; 3], b: &[Vector3<f64>; 3], tol: f64) -> bool {
    a.iter().zip(b).all(|(p, q)| (p - q).amax() <= tol)
}

/// Per-tet transforms into canonical charts, plus seam statistics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartAlignment {
    pub transforms: Vec<GridTransform>,
    /// Interior tet faces whose two sides use different charts.
    pub seam_faces: usize,
    /// Interior tet faces still disagreeing after alignment.
    pub unglued_faces: usize,
}

impl ChartAlignment {
    /// Tets whose parameters were moved into another chart.
    pub fn realigned_tets(&self) -> usize {
        self.transforms.iter().filter(|t| !t.is_identity()).count()
    }

    /// Corners of tet `t` in its canonical chart.
    #[inline]
    pub fn apply(&self, t: usize, corners: &[Vector3<f64>; 4]) -> [Vector3<f64>; 4] {
        let tr = self.transforms[t];
        corners.map(|p| tr.apply(p))
    }
}

/// Align every tet of `mesh` into the chart of the smallest tet of its
/// face-connected component; `params` are the per-tet corner parameters.
pub fn align_charts(mesh: &TetMesh, params: &[[Vector3<f64>; 4]], tol: f64) -> ChartAlignment {
    let n = mesh.num_cells();
    let faces = interfaces(mesh);
    let mut adjacent: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, f) in faces.iter().enumerate() {
        adjacent[f.tets[0]].push(i);
        adjacent[f.tets[1]].push(i);
    }

    let mut chart: Vec<Option<GridTransform>> = vec![None; n];
    let mut queue = VecDeque::new();
    for root in 0..n {
        if chart[root].is_some() {
            continue;
        }
        chart[root] = Some(GridTransform::IDENTITY);
        queue.push_back(root);
        while let Some(t) = queue.pop_front() {
            let Some(to_root) = chart[t] else {
                continue;
            };
            for &i in &adjacent[t] {
                let f = &faces[i];
                let (me, other) = if f.tets[0] == t { (0, 1) } else { (1, 0) };
                let nb = f.tets[other];
                if chart[nb].is_some() {
                    continue;
                }
                let from = f.corners[other].map(|c| params[nb][c]);
                let to = f.corners[me].map(|c| params[t][c]);
                let Some(step) = fit_transition(&from, &to, tol) else {
                    continue;
                };
                let apex_nb = step.apply(params[nb][f.apex(other)]);
                if !opposite_sides(&to, params[t][f.apex(me)], apex_nb) {
                    continue;
                }
                chart[nb] = Some(to_root.compose(&step));
                queue.push_back(nb);
            }
        }
    }
    let transforms: Vec<GridTransform> = chart
        .into_iter()
        .map(|c| c.unwrap_or(GridTransform::IDENTITY))
        .collect();

    let mut seam_faces = 0;
    let mut unglued_faces = 0;
    for f in &faces {
        let [a, b] = f.tets;
        let pa = f.corners[0].map(|c| params[a][c]);
        let pb = f.corners[1].map(|c| params[b][c]);
        if !coincide(&pa, &pb, tol) {
            seam_faces += 1;
        }
        let qa = pa.map(|p| transforms[a].apply(p));
        let qb = pb.map(|p| transforms[b].apply(p));
        if !coincide(&qa, &qb, tol) {
            unglued_faces += 1;
        }
    }

    ChartAlignment {
        transforms,
        seam_faces,
        unglued_faces,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{kuhn_box, remap_cells, tet_pair};

    fn v(x: f64, y: f64, z: f64) -> Vector3<f64> {
        Vector3::new(x, y, z)
    }

    #[test]
    fn rotation_group_is_closed() {
        let all: Vec<GridTransform> = GridTransform::rotations().collect();
        assert_eq!(all.len(), 24);
        assert_eq!(all[0], GridTransform::IDENTITY);
        for a in &all {
            for b in &all {
                assert!(all.contains(&a.compose(b)));
            }
        }
    }

    #[test]
    fn compose_matches_sequential_application() {
        let quarter_z = GridTransform {
            perm: [1, 0, 2],
            sign: [-1, 1, 1],
            shift: [3, 0, -2],
        };
        let flip_yz = GridTransform {
            perm: [0, 2, 1],
            sign: [-1, 1, 1],
            shift: [0, 5, 1],
        };
        let x = v(0.25, -1.5, 2.0);
        let both = quarter_z.compose(&flip_yz);
        assert_eq!(both.apply(x), quarter_z.apply(flip_yz.apply(x)));
    }

    #[test]
    fn fit_recovers_rotation_and_shift() {
        let t = GridTransform {
            perm: [1, 0, 2],
            sign: [-1, 1, 1],
            shift: [4, -1, 7],
        };
        let from = [v(0.0, 0.0, 0.0), v(1.0, 0.5, 0.0), v(0.2, 0.0, 1.0)];
        let to = from.map(|p| t.apply(p));
        assert_eq!(fit_transition(&from, &to, 1e-9), Some(t));
    }

    #[test]
    fn fit_rejects_fractional_shift_and_flat_faces() {
        let from = [v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0)];
        let to = from.map(|p| p + v(0.3, 0.0, 0.0));
        assert_eq!(fit_transition(&from, &to, 1e-9), None);
        let flat = [v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(2.0, 0.0, 0.0)];
        assert_eq!(fit_transition(&flat, &flat, 1e-9), None);
    }

    #[test]
    fn seamless_box_has_no_seams() {
        let (mesh, igm) = kuhn_box([2, 2, 1]);
        let a = align_charts(&mesh, &igm.corners, 1e-9);
        assert_eq!(a.seam_faces, 0);
        assert_eq!(a.unglued_faces, 0);
        assert_eq!(a.realigned_tets(), 0);
    }

    #[test]
    fn shifted_half_is_moved_back() {
        let (mesh, mut igm) = kuhn_box([2, 1, 1]);
        let seamless = igm.clone();
        remap_cells(&mut igm, 6..12, |p| p + v(10.0, 0.0, -3.0));
        let a = align_charts(&mesh, &igm.corners, 1e-9);
        // The square between the two cubes is split into two triangles.
        assert_eq!(a.seam_faces, 2);
        assert_eq!(a.unglued_faces, 0);
        assert_eq!(a.realigned_tets(), 6);
        for t in 0..mesh.num_cells() {
            assert_eq!(a.apply(t, &igm.corners[t]), seamless.corners[t]);
        }
    }

    #[test]
    fn folded_neighbor_is_not_crossed() {
        let (mesh, mut igm) = tet_pair();
        // Apex of tet 1 mirrored through the shared face, then a half turn
        // about z with a lattice shift.
        igm.corners[1][3] = v(-1.0 / 3.0, -1.0 / 3.0, -1.0 / 3.0);
        remap_cells(&mut igm, [1], |p| v(-p.x + 5.0, -p.y + 5.0, p.z));
        let a = align_charts(&mesh, &igm.corners, 1e-9);
        assert_eq!(a.seam_faces, 1);
        assert_eq!(a.unglued_faces, 1);
        assert_eq!(a.realigned_tets(), 0);
    }

    #[test]
    fn non_grid_transition_stays_unglued() {
        let (mesh, mut igm) = kuhn_box([2, 1, 1]);
        remap_cells(&mut igm, 6..12, |p| p + v(0.3, 0.0, 0.0));
        let a = align_charts(&mesh, &igm.corners, 1e-9);
        assert_eq!(a.seam_faces, 2);
        assert_eq!(a.unglued_faces, 2);
        assert_eq!(a.realigned_tets(), 0);
    }
}
