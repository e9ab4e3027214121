//! Cell Classifier/Clipper: one tetrahedron against its candidate lattice cubes.
//!
//! Every lattice quantity here is in scaled parameter units, so a lattice cube
//! is a unit cube and its clipped volume is directly the coverage fraction.

use nalgebra::Vector3;

use super::polytope::area_vector2;
use super::types::{FaceOrigin, Poly3};
use crate::lattice::{locate, LatticePoint, CUBE_CORNERS, HEX_EDGES, HEX_FACES};
use crate::tet::TetFrame;

/// Clipped volume (cube fraction) at or below which a candidate is dropped.
pub const MIN_COVERAGE: f64 = 1e-12;
/// Minimal area / parameter length of a recorded face or edge piece.
const MIN_PIECE: f64 = 1e-12;
/// Plane distance under which a clipped vertex counts as on the plane.
const CLIP_EPS: f64 = 1e-12;
/// Edge parameters this close to 0 or 1 are snapped to the cube corner.
const SNAP_T: f64 = 1e-9;

/// Per-run classifier settings derived from the config.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassifyOpts {
    pub inside_tolerance: f64,
    pub face_pieces: bool,
    pub edge_pieces: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CubeKind {
    /// All 8 corners inside the tet.
    Interior,
    /// Partly inside; the coverage comes from clipping.
    Straddling,
}

/// Part of cube face `face` covered by one tet, counterclockwise from outside the cube.
#[derive(Clone, Debug, PartialEq)]
pub struct FacePiece {
    pub face: u8,
    /// Global (scaled) parameter coordinates.
    pub param: Vec<Vector3<f64>>,
    /// Images under the tet's inverse map.
    pub world: Vec<Vector3<f64>>,
}

/// Part `[t0, t1]` of cube edge `edge` covered by one tet; `t` runs from
/// `HEX_EDGES[edge][0]` to `HEX_EDGES[edge][1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePiece {
    pub edge: u8,
    pub t0: f64,
    pub t1: f64,
    /// World positions at `t0` and `t1`.
    pub world: [Vector3<f64>; 2],
}

impl EdgePiece {
    /// World position at `t`, exact because the tet map is affine.
    #[inline]
    pub fn world_at(&self, t: f64) -> Vector3<f64> {
        let span = self.t1 - self.t0;
        if span <= 0.0 {
            return self.world[0];
        }
        let s = (t - self.t0) / span;
        self.world[0] * (1.0 - s) + self.world[1] * s
    }
}

/// Hex Cell Candidate: what one tet contributes to one lattice cube.
#[derive(Clone, Debug, PartialEq)]
pub struct CellCandidate {
    pub cube: LatticePoint,
    pub tet: usize,
    pub kind: CubeKind,
    /// Fraction of the cube inside the tet, in `(0, 1]`.
    pub coverage: f64,
    /// Bit `k` set if canonical corner `k` is inside (within tolerance).
    pub corners_inside: u8,
    pub face_pieces: Vec<FacePiece>,
    pub edge_pieces: Vec<EdgePiece>,
}

/// Lattice point inside one tet, positioned in world space by that tet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeClaim {
    pub point: LatticePoint,
    pub world: Vector3<f64>,
    /// Within tolerance of a tet face, so neighbors may claim it too.
    pub on_boundary: bool,
}

/// Everything one tet hands to the assembler.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TetContribution {
    pub tet: usize,
    pub claims: Vec<LatticeClaim>,
    pub candidates: Vec<CellCandidate>,
    /// Cubes the locator enumerated (before classification).
    pub visited_cubes: usize,
}

impl TetContribution {
    pub fn clipped_cubes(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.kind == CubeKind::Straddling)
            .count()
    }
}

#[inline]
fn inside(l: &[f64; 4], eps: f64) -> bool {
    l.iter().all(|&v| v >= -eps)
}

#[inline]
fn near_face(l: &[f64; 4], eps: f64) -> bool {
    l.iter().any(|&v| v <= eps)
}

/// Locate, claim and classify for a single non-degenerate tet.
pub fn contribute(frame: &TetFrame, opts: &ClassifyOpts) -> TetContribution {
    let eps = opts.inside_tolerance;
    // Barycentric slack scales with the tet's parametric size.
    let extent = frame
        .param
        .iter()
        .flat_map(|p| frame.param.iter().map(move |q| (p - q).amax()))
        .fold(1.0_f64, f64::max);
    let fp = locate(&frame.param, eps * extent);
    let claims = fp
        .points
        .iter()
        .filter_map(|point| {
            let x = point.to_vector();
            let l = frame.barycentric(x);
            inside(&l, eps).then(|| LatticeClaim {
                point,
                world: frame.to_world(x),
                on_boundary: near_face(&l, eps),
            })
        })
        .collect();
    let candidates = fp
        .cubes
        .iter()
        .filter_map(|cube| classify_cube(frame, cube, opts))
        .collect();
    TetContribution {
        tet: frame.index,
        claims,
        candidates,
        visited_cubes: fp.cubes.len(),
    }
}

/// Classify one lattice cube; `None` when the cube is exterior or only touches the tet.
pub fn classify_cube(
    frame: &TetFrame,
    cube: LatticePoint,
    opts: &ClassifyOpts,
) -> Option<CellCandidate> {
    let eps = opts.inside_tolerance;
    let origin = cube.to_vector();
    let bary: [[f64; 4]; 8] =
        CUBE_CORNERS.map(|d| frame.barycentric(origin + LatticePoint(d).to_vector()));

    // Separated by one supporting plane.
    if (0..4).any(|i| bary.iter().all(|l| l[i] <= eps)) {
        return None;
    }

    let mut corners_inside = 0u8;
    for (k, l) in bary.iter().enumerate() {
        if inside(l, eps) {
            corners_inside |= 1 << k;
        }
    }

    if corners_inside == u8::MAX {
        let face_pieces = if opts.face_pieces {
            full_face_pieces(frame, origin)
        } else {
            Vec::new()
        };
        let edge_pieces = if opts.edge_pieces {
            (0..12)
                .map(|e| {
                    let [a, b] = HEX_EDGES[e];
                    EdgePiece {
                        edge: e as u8,
                        t0: 0.0,
                        t1: 1.0,
                        world: [corner_world(frame, origin, a), corner_world(frame, origin, b)],
                    }
                })
                .collect()
        } else {
            Vec::new()
        };
        return Some(CellCandidate {
            cube,
            tet: frame.index,
            kind: CubeKind::Interior,
            coverage: 1.0,
            corners_inside,
            face_pieces,
            edge_pieces,
        });
    }

    let mut poly = Poly3::unit_cube();
    for (i, hs) in frame.planes(origin).iter().enumerate() {
        poly.intersect_halfspace(hs, FaceOrigin::Tet(i as u8), CLIP_EPS);
        if poly.is_empty() {
            return None;
        }
    }
    let coverage = poly.volume().min(1.0);
    if coverage <= MIN_COVERAGE {
        return None;
    }

    let mut face_pieces = Vec::new();
    if opts.face_pieces {
        for facet in &poly.facets {
            let FaceOrigin::Cube(f) = facet.origin else {
                continue;
            };
            if area_vector2(&facet.vertices).norm() * 0.5 <= MIN_PIECE {
                continue;
            }
            let param: Vec<_> = facet.vertices.iter().map(|v| origin + v).collect();
            let world = param.iter().map(|&p| frame.to_world(p)).collect();
            face_pieces.push(FacePiece {
                face: f,
                param,
                world,
            });
        }
    }

    let mut edge_pieces = Vec::new();
    if opts.edge_pieces {
        for (e, [a, b]) in HEX_EDGES.iter().enumerate() {
            if let Some((t0, t1)) = clip_segment(&bary[*a], &bary[*b]) {
                let pa = origin + LatticePoint(CUBE_CORNERS[*a]).to_vector();
                let pb = origin + LatticePoint(CUBE_CORNERS[*b]).to_vector();
                edge_pieces.push(EdgePiece {
                    edge: e as u8,
                    t0,
                    t1,
                    world: [
                        frame.to_world(pa + (pb - pa) * t0),
                        frame.to_world(pa + (pb - pa) * t1),
                    ],
                });
            }
        }
    }

    Some(CellCandidate {
        cube,
        tet: frame.index,
        kind: CubeKind::Straddling,
        coverage,
        corners_inside,
        face_pieces,
        edge_pieces,
    })
}

fn corner_world(frame: &TetFrame, origin: Vector3<f64>, k: usize) -> Vector3<f64> {
    frame.to_world(origin + LatticePoint(CUBE_CORNERS[k]).to_vector())
}

fn full_face_pieces(frame: &TetFrame, origin: Vector3<f64>) -> Vec<FacePiece> {
    HEX_FACES
        .iter()
        .enumerate()
        .map(|(f, quad)| {
            let param: Vec<_> = quad
                .iter()
                .map(|&k| origin + LatticePoint(CUBE_CORNERS[k]).to_vector())
                .collect();
            let world = param.iter().map(|&p| frame.to_world(p)).collect();
            FacePiece {
                face: f as u8,
                param,
                world,
            }
        })
        .collect()
}

/// Parameter interval of the segment `a -> b` where all barycentrics are
/// non-negative (Liang-Barsky over the four face functions).
fn clip_segment(la: &[f64; 4], lb: &[f64; 4]) -> Option<(f64, f64)> {
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for i in 0..4 {
        let (a, b) = (la[i], lb[i]);
        if a < 0.0 && b < 0.0 {
            return None;
        }
        if a < 0.0 {
            t0 = t0.max(a / (a - b));
        } else if b < 0.0 {
            t1 = t1.min(a / (a - b));
        }
    }
    if t0 <= SNAP_T {
        t0 = 0.0;
    }
    if t1 >= 1.0 - SNAP_T {
        t1 = 1.0;
    }
    (t1 - t0 > MIN_PIECE).then_some((t0, t1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ClassifyOpts {
        ClassifyOpts {
            inside_tolerance: 1e-9,
            face_pieces: true,
            edge_pieces: true,
        }
    }

    /// Corner tet with legs of length `n` along the axes; world == param.
    fn corner_frame(n: f64) -> TetFrame {
        let p = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(n, 0.0, 0.0),
            Vector3::new(0.0, n, 0.0),
            Vector3::new(0.0, 0.0, n),
        ];
        TetFrame::new(0, p, p).unwrap()
    }

    #[test]
    fn interior_cube_is_full() {
        let f = corner_frame(8.0);
        let c = classify_cube(&f, LatticePoint::new(1, 1, 1), &opts()).unwrap();
        assert_eq!(c.kind, CubeKind::Interior);
        assert_eq!(c.coverage, 1.0);
        assert_eq!(c.corners_inside, 0xff);
        assert_eq!(c.face_pieces.len(), 6);
        assert_eq!(c.edge_pieces.len(), 12);
    }

    #[test]
    fn diagonal_cube_is_clipped() {
        // The slanted face x + y + z = 3 cuts cube (1,1,0): corner (1,1,0) is
        // inside, corner (2,2,1) is outside.
        let f = corner_frame(3.0);
        let c = classify_cube(&f, LatticePoint::new(1, 1, 0), &opts()).unwrap();
        assert_eq!(c.kind, CubeKind::Straddling);
        // Inside part of the unit cube at (1,1,0): x'+y'+z' <= 1, the corner simplex.
        assert!((c.coverage - 1.0 / 6.0).abs() < 1e-12);
        assert_eq!(c.corners_inside & 1, 1);
        assert_ne!(c.corners_inside, 0xff);
        // Faces -x, -y, -z each keep a half triangle.
        let mut faces: Vec<u8> = c.face_pieces.iter().map(|p| p.face).collect();
        faces.sort_unstable();
        assert_eq!(faces, vec![0, 2, 4]);
        // The three edges from corner 0 are fully covered, the rest only touch.
        assert_eq!(c.edge_pieces.len(), 3);
        for piece in &c.edge_pieces {
            assert_eq!((piece.t0, piece.t1), (0.0, 1.0));
        }
    }

    #[test]
    fn touching_cube_is_exterior() {
        let f = corner_frame(2.0);
        // Shares only the corner (2,0,0) with the tet.
        assert!(classify_cube(&f, LatticePoint::new(2, 0, 0), &opts()).is_none());
        // Below the z = 0 face.
        assert!(classify_cube(&f, LatticePoint::new(0, 0, -1), &opts()).is_none());
    }

    #[test]
    fn contribution_claims_lattice_points() {
        let f = corner_frame(4.0);
        let contrib = contribute(&f, &opts());
        // Points with x+y+z <= 4: C(4+3, 3) = 35.
        assert_eq!(contrib.claims.len(), 35);
        assert_eq!(contrib.visited_cubes, 64);
        let full: f64 = contrib.candidates.iter().map(|c| c.coverage).sum();
        assert!((full - 64.0 / 6.0).abs() < 1e-9);
        let interior = contrib
            .candidates
            .iter()
            .filter(|c| c.kind == CubeKind::Interior)
            .count();
        // Cubes with x+y+z <= 1 (origin sums) : C(1+3,3) = 4.
        assert_eq!(interior, 4);
        assert_eq!(contrib.clipped_cubes(), contrib.candidates.len() - 4);
    }

    #[test]
    fn segment_clip_snaps_ends() {
        let la = [0.5, 0.5, 0.0, 0.0];
        let lb = [-0.5, 0.5, 0.5, 0.5];
        let (t0, t1) = clip_segment(&la, &lb).unwrap();
        assert_eq!(t0, 0.0);
        assert!((t1 - 0.5).abs() < 1e-12);
        assert!(clip_segment(&[-1.0, 1.0, 0.5, 0.5], &[-0.5, 1.0, 0.0, 0.5]).is_none());
    }

    #[test]
    fn edge_piece_interpolates_world() {
        let piece = EdgePiece {
            edge: 0,
            t0: 0.25,
            t1: 0.75,
            world: [Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0)],
        };
        assert!((piece.world_at(0.5) - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-15);
    }
}
