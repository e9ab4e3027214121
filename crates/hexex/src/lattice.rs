//! Integer lattice points, unit-cube topology tables, and the per-tet locator.
//!
//! Conventions
//! - A cube is named by its minimal corner ("origin").
//! - Corner order: bottom face `(0,0,0) (1,0,0) (1,1,0) (0,1,0)`, then the top
//!   face in the same order. This order has positive volume for an
//!   orientation-preserving map.
//! - Cube faces 0..6 are `-x, +x, -y, +y, -z, +z`.

use nalgebra::Vector3;

/// Integer point of the scaled parameter lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LatticePoint(pub [i64; 3]);

impl LatticePoint {
    #[inline]
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self([x, y, z])
    }

    /// Nearest lattice point to `p`.
    #[inline]
    pub fn snap(p: Vector3<f64>) -> Self {
        Self([p.x.round() as i64, p.y.round() as i64, p.z.round() as i64])
    }

    #[inline]
    pub fn offset(self, d: [i64; 3]) -> Self {
        Self([self.0[0] + d[0], self.0[1] + d[1], self.0[2] + d[2]])
    }

    #[inline]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.0[0] as f64, self.0[1] as f64, self.0[2] as f64)
    }

    /// The 8 corners of the cube with this origin, in canonical order.
    #[inline]
    pub fn cube_corners(self) -> [LatticePoint; 8] {
        CUBE_CORNERS.map(|d| self.offset(d))
    }
}

/// Corner offsets of the unit cube in canonical order.
pub const CUBE_CORNERS: [[i64; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Corner quads of faces `-x, +x, -y, +y, -z, +z`, counterclockwise seen from outside.
pub const HEX_FACES: [[usize; 4]; 6] = [
    [0, 4, 7, 3],
    [1, 2, 6, 5],
    [0, 1, 5, 4],
    [3, 7, 6, 2],
    [0, 3, 2, 1],
    [4, 5, 6, 7],
];

/// Corner pairs of the 12 cube edges.
pub const HEX_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Six positively oriented tets around the `0-6` diagonal; they tile the cube.
pub const HEX_TETS: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
    [0, 5, 1, 6],
];

/// Corner permutation mirroring the cube along x (reverses orientation).
pub const MIRROR_X: [usize; 8] = [1, 0, 3, 2, 5, 4, 7, 6];

/// Axis-aligned inclusive range of lattice coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatticeBox {
    pub min: [i64; 3],
    pub max: [i64; 3],
}

impl LatticeBox {
    #[inline]
    pub fn is_empty(&self) -> bool {
        (0..3).any(|a| self.min[a] > self.max[a])
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (0..3)
            .map(|a| (self.max[a] - self.min[a] + 1) as usize)
            .product()
    }

    /// Points in x-fastest order.
    pub fn iter(&self) -> impl Iterator<Item = LatticePoint> {
        let b = *self;
        (b.min[2]..=b.max[2]).flat_map(move |z| {
            (b.min[1]..=b.max[1])
                .flat_map(move |y| (b.min[0]..=b.max[0]).map(move |x| LatticePoint([x, y, z])))
        })
    }
}

/// Conservative lattice range of one tetrahedron's parametric image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TetFootprint {
    /// Lattice points within `eps` of the bounding box.
    pub points: LatticeBox,
    /// Origins of every unit cube overlapping the bounding box.
    pub cubes: LatticeBox,
}

/// Lattice Cell Locator: bounding box of the four (already scaled) parameter corners.
///
/// Never omits a cube that intersects the tet with positive volume; false
/// positives are rejected by the classifier.
pub fn locate(corners: &[Vector3<f64>; 4], eps: f64) -> TetFootprint {
    let mut lo = corners[0];
    let mut hi = corners[0];
    for c in &corners[1..] {
        lo = lo.inf(c);
        hi = hi.sup(c);
    }
    let mut points = LatticeBox {
        min: [0; 3],
        max: [0; 3],
    };
    let mut cubes = points;
    for a in 0..3 {
        points.min[a] = (lo[a] - eps).ceil() as i64;
        points.max[a] = (hi[a] + eps).floor() as i64;
        cubes.min[a] = lo[a].floor() as i64;
        cubes.max[a] = hi[a].ceil() as i64 - 1;
    }
    TetFootprint { points, cubes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_volume(p: [Vector3<f64>; 4]) -> f64 {
        (p[1] - p[0]).cross(&(p[2] - p[0])).dot(&(p[3] - p[0])) / 6.0
    }

    #[test]
    fn hex_tets_tile_the_unit_cube() {
        let corners = CUBE_CORNERS.map(|d| LatticePoint(d).to_vector());
        let mut total = 0.0;
        for t in HEX_TETS {
            let v = signed_volume(t.map(|k| corners[k]));
            assert!(v > 0.0);
            total += v;
        }
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hex_faces_point_outward() {
        let corners = CUBE_CORNERS.map(|d| LatticePoint(d).to_vector());
        let center = Vector3::new(0.5, 0.5, 0.5);
        for (f, quad) in HEX_FACES.iter().enumerate() {
            let [a, b, c, _] = quad.map(|k| corners[k]);
            let n = (b - a).cross(&(c - a));
            let axis = f / 2;
            let sign = if f % 2 == 0 { -1.0 } else { 1.0 };
            assert!(n[axis] * sign > 0.0, "face {f} normal {n:?}");
            assert!(n.dot(&(a - center)) > 0.0);
        }
    }

    #[test]
    fn mirror_reverses_orientation() {
        let corners = CUBE_CORNERS.map(|d| LatticePoint(d).to_vector());
        let mirrored = MIRROR_X.map(|k| corners[k]);
        let v: f64 = HEX_TETS
            .iter()
            .map(|t| signed_volume(t.map(|k| mirrored[k])))
            .sum();
        assert!((v + 1.0).abs() < 1e-12);
    }

    #[test]
    fn footprint_is_conservative() {
        let corners = [
            Vector3::new(0.2, 0.0, 0.0),
            Vector3::new(2.5, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 3.0),
        ];
        let fp = locate(&corners, 1e-9);
        assert_eq!(fp.points.min, [0, 0, 0]);
        assert_eq!(fp.points.max, [2, 1, 3]);
        assert_eq!(fp.cubes.min, [0, 0, 0]);
        assert_eq!(fp.cubes.max, [2, 0, 2]);
        assert_eq!(fp.cubes.len(), 9);
        assert_eq!(fp.cubes.iter().count(), fp.cubes.len());
    }

    #[test]
    fn flat_tet_has_no_cubes() {
        let corners = [
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(2.0, 0.0, 1.0),
            Vector3::new(0.0, 2.0, 1.0),
            Vector3::new(1.0, 1.0, 1.0),
        ];
        let fp = locate(&corners, 1e-9);
        assert!(fp.cubes.is_empty());
        assert_eq!(fp.cubes.iter().count(), 0);
        assert_eq!(fp.points.min[2], 1);
        assert_eq!(fp.points.max[2], 1);
    }

    #[test]
    fn snap_rounds_noise() {
        let p = LatticePoint::snap(Vector3::new(2.0 - 1e-12, -1.0 + 1e-13, 0.4999));
        assert_eq!(p, LatticePoint::new(2, -1, 0));
    }
}
