//! Half-space clipping and volume of `Poly3`.
//!
//! Algorithm
//! - Clip every facet polygon against the plane (Sutherland-Hodgman) and keep
//!   the points where the boundary crosses the plane.
//! - Close the cut with a cap facet: the crossing points ordered by angle in an
//!   orthonormal basis of the plane, oriented along the plane normal.
//! - Volume from facet fans anchored at each facet's first vertex
//!   (divergence theorem), so no interior point is needed.
//!
//! Tolerances: `eps` is a distance. Vertices within `eps` of the plane count as
//! on it, which keeps coplanar facets intact and avoids sliver caps.

use nalgebra::Vector3;

use super::types::{FaceOrigin, Facet, Hs3, Poly3};
use crate::lattice::{LatticePoint, CUBE_CORNERS, HEX_FACES};

/// Points closer than this are merged when building caps.
const DEDUP_EPS: f64 = 1e-12;

impl Poly3 {
    /// The unit cube `[0,1]^3` with facets labelled `Cube(0..6)`.
    pub fn unit_cube() -> Self {
        let corners = CUBE_CORNERS.map(|d| LatticePoint(d).to_vector());
        let facets = HEX_FACES
            .iter()
            .enumerate()
            .map(|(f, quad)| Facet {
                origin: FaceOrigin::Cube(f as u8),
                vertices: quad.iter().map(|&k| corners[k]).collect(),
            })
            .collect();
        Self { facets }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Intersect with `hs`; the new cap facet is labelled `origin`.
    pub fn intersect_halfspace(&mut self, hs: &Hs3, origin: FaceOrigin, eps: f64) {
        if self.facets.is_empty() {
            return;
        }
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for f in &self.facets {
            for &p in &f.vertices {
                let d = hs.eval(p);
                lo = lo.min(d);
                hi = hi.max(d);
            }
        }
        if hi <= eps {
            return;
        }
        if lo >= -eps {
            // Entirely outside, or flat against the plane from outside.
            self.facets.clear();
            return;
        }
        let mut cap_points = Vec::new();
        let mut kept = Vec::with_capacity(self.facets.len() + 1);
        for facet in self.facets.drain(..) {
            let clipped = clip_polygon(&facet.vertices, hs, eps, &mut cap_points);
            if clipped.len() >= 3 {
                kept.push(Facet {
                    origin: facet.origin,
                    vertices: clipped,
                });
            }
        }
        dedup_points_in_place(&mut cap_points, DEDUP_EPS);
        if let Some(cap) = order_cap(&cap_points, hs.n) {
            kept.push(Facet {
                origin,
                vertices: cap,
            });
        }
        self.facets = kept;
    }

    /// Enclosed volume (0 for the empty polytope).
    pub fn volume(&self) -> f64 {
        let mut six_v = 0.0;
        for f in &self.facets {
            let p0 = f.vertices[0];
            for k in 1..f.vertices.len() - 1 {
                six_v += p0.dot(&f.vertices[k].cross(&f.vertices[k + 1]));
            }
        }
        (six_v / 6.0).max(0.0)
    }
}

/// Clip one polygon to `hs.eval <= eps`; crossing and on-plane points go to `cap`.
fn clip_polygon(
    poly: &[Vector3<f64>],
    hs: &Hs3,
    eps: f64,
    cap: &mut Vec<Vector3<f64>>,
) -> Vec<Vector3<f64>> {
    let m = poly.len();
    let mut out = Vec::with_capacity(m + 1);
    for i in 0..m {
        let cur = poly[i];
        let nxt = poly[(i + 1) % m];
        let dc = hs.eval(cur);
        let dn = hs.eval(nxt);
        if dc <= eps {
            out.push(cur);
            if dc >= -eps {
                cap.push(cur);
            }
        }
        if (dc < -eps && dn > eps) || (dc > eps && dn < -eps) {
            let t = dc / (dc - dn);
            let x = cur + (nxt - cur) * t;
            out.push(x);
            cap.push(x);
        }
    }
    out
}

/// Twice the vector area of a planar polygon.
#[inline]
pub fn area_vector2(poly: &[Vector3<f64>]) -> Vector3<f64> {
    let mut acc = Vector3::zeros();
    let m = poly.len();
    for i in 0..m {
        acc += poly[i].cross(&poly[(i + 1) % m]);
    }
    acc
}

pub(crate) fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    let mut acc = Vector3::zeros();
    for &p in points {
        acc += p;
    }
    acc / (points.len() as f64)
}

/// Orthonormal `(u, v)` spanning the plane with normal `n`, with `u x v` along `n`.
fn plane_basis(n: Vector3<f64>) -> Option<[Vector3<f64>; 2]> {
    let len = n.norm();
    if len <= DEDUP_EPS {
        return None;
    }
    let n = n / len;
    let trial = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = (trial - n * n.dot(&trial)).normalize();
    let v = n.cross(&u);
    Some([u, v])
}

/// Order coplanar points counterclockwise around `n`; `None` if fewer than 3 remain.
fn order_cap(points: &[Vector3<f64>], n: Vector3<f64>) -> Option<Vec<Vector3<f64>>> {
    if points.len() < 3 {
        return None;
    }
    let [u, v] = plane_basis(n)?;
    let c = centroid(points);
    let mut items = Vec::with_capacity(points.len());
    for &p in points {
        let rel = p - c;
        let angle = v.dot(&rel).atan2(u.dot(&rel));
        if angle.is_nan() {
            return None;
        }
        items.push((angle, p));
    }
    items.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    Some(items.into_iter().map(|(_, p)| p).collect())
}

fn dedup_points_in_place(points: &mut Vec<Vector3<f64>>, tol: f64) {
    if points.len() < 2 {
        return;
    }
    points.sort_by(|a, b| {
        a[0].partial_cmp(&b[0])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a[1].partial_cmp(&b[1]).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a[2].partial_cmp(&b[2]).unwrap_or(std::cmp::Ordering::Equal))
    });
    // Sorting is lexicographic, so near-equal points may not be adjacent.
    let mut out: Vec<Vector3<f64>> = Vec::with_capacity(points.len());
    for &p in points.iter() {
        if !out.iter().any(|q| (p - q).norm() < tol) {
            out.push(p);
        }
    }
    *points = out;
}
