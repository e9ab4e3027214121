//! Per-tetrahedron affine frames and the Degeneracy Handler.
//!
//! A `TetFrame` holds one tet's world corners, its (scaled) parameter corners,
//! and the affine maps between them. All point-in-tet and clipping work goes
//! through barycentric coordinates so tolerances are dimensionless.

use nalgebra::{Matrix3, Vector3};

use crate::clip::Hs3;
use crate::config::Config;

/// Outcome of the Jacobian check for one tetrahedron.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TetQuality {
    Valid,
    /// Accepted, but the oriented parametric volume is below the quality threshold.
    LowQuality,
    /// Zero, negative or numerically vanishing Jacobian; contributes nothing.
    Degenerate,
}

/// Signed volumes behind a [`TetQuality`] verdict.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JacobianCheck {
    pub world_volume: f64,
    /// Parametric volume in lattice cells (after scaling).
    pub param_volume: f64,
    /// `param_volume` with the sign of the world orientation folded in; its
    /// sign is the sign of the Jacobian determinant of the world->param map.
    pub oriented_volume: f64,
    pub quality: TetQuality,
}

impl JacobianCheck {
    /// Jacobian determinant of the world->param map (0 when the world tet is flat).
    pub fn determinant(&self) -> f64 {
        if self.world_volume == 0.0 {
            0.0
        } else {
            self.param_volume / self.world_volume
        }
    }
}

#[inline]
pub(crate) fn signed_volume(p: &[Vector3<f64>; 4]) -> f64 {
    (p[1] - p[0]).cross(&(p[2] - p[0])).dot(&(p[3] - p[0])) / 6.0
}

/// World volume below which a tet counts as flat, relative to its longest edge cubed.
const WORLD_FLAT_REL: f64 = 1e-14;

fn world_is_flat(world: &[Vector3<f64>; 4], volume: f64) -> bool {
    let mut longest: f64 = 0.0;
    for i in 0..4 {
        for j in i + 1..4 {
            longest = longest.max((world[j] - world[i]).norm());
        }
    }
    volume.abs() <= WORLD_FLAT_REL * longest.powi(3)
}

/// Degeneracy Handler: classify one tet by its oriented parametric volume.
pub fn check_jacobian(
    world: &[Vector3<f64>; 4],
    param: &[Vector3<f64>; 4],
    cfg: &Config,
) -> JacobianCheck {
    let world_volume = signed_volume(world);
    let param_volume = signed_volume(param);
    let flat = world_is_flat(world, world_volume);
    let oriented_volume = if flat {
        0.0
    } else {
        param_volume * world_volume.signum()
    };
    let quality = if flat || oriented_volume <= cfg.degeneracy_threshold {
        TetQuality::Degenerate
    } else if oriented_volume < cfg.low_quality_threshold {
        TetQuality::LowQuality
    } else {
        TetQuality::Valid
    };
    JacobianCheck {
        world_volume,
        param_volume,
        oriented_volume,
        quality,
    }
}

/// Affine frame of one non-degenerate tetrahedron.
///
/// Invariants:
/// - `param` corners are scaled by the lattice factor.
/// - `bary_inv` maps `x - param[0]` to barycentrics `(l1, l2, l3)`; `l0 = 1 - sum`.
#[derive(Clone, Debug)]
pub struct TetFrame {
    pub index: usize,
    pub world: [Vector3<f64>; 4],
    pub param: [Vector3<f64>; 4],
    bary_inv: Matrix3<f64>,
    /// Gradients of the four barycentric functions.
    grads: [Vector3<f64>; 4],
}

impl TetFrame {
    /// Build the frame; `None` if the parameter corners are affinely dependent.
    pub fn new(index: usize, world: [Vector3<f64>; 4], param: [Vector3<f64>; 4]) -> Option<Self> {
        let m = Matrix3::from_columns(&[
            param[1] - param[0],
            param[2] - param[0],
            param[3] - param[0],
        ]);
        let bary_inv = m.try_inverse()?;
        let g1 = bary_inv.row(0).transpose();
        let g2 = bary_inv.row(1).transpose();
        let g3 = bary_inv.row(2).transpose();
        let g0 = -(g1 + g2 + g3);
        Some(Self {
            index,
            world,
            param,
            bary_inv,
            grads: [g0, g1, g2, g3],
        })
    }

    /// Barycentric coordinates of parameter point `x`.
    #[inline]
    pub fn barycentric(&self, x: Vector3<f64>) -> [f64; 4] {
        let l = self.bary_inv * (x - self.param[0]);
        [1.0 - l.x - l.y - l.z, l.x, l.y, l.z]
    }

    /// Point-in-tet with barycentric slack `eps` (boundary counts as inside).
    #[inline]
    pub fn contains(&self, x: Vector3<f64>, eps: f64) -> bool {
        self.barycentric(x).iter().all(|&l| l >= -eps)
    }

    /// Image of parameter point `x` under the inverse parametrization.
    #[inline]
    pub fn to_world(&self, x: Vector3<f64>) -> Vector3<f64> {
        let l = self.barycentric(x);
        self.world[0] * l[0] + self.world[1] * l[1] + self.world[2] * l[2] + self.world[3] * l[3]
    }

    /// Forward parametrization of world point `p`; `None` for a flat world tet.
    pub fn to_param(&self, p: Vector3<f64>) -> Option<Vector3<f64>> {
        let w = Matrix3::from_columns(&[
            self.world[1] - self.world[0],
            self.world[2] - self.world[0],
            self.world[3] - self.world[0],
        ]);
        let mu = w.try_inverse()? * (p - self.world[0]);
        let mu0 = 1.0 - mu.x - mu.y - mu.z;
        Some(self.param[0] * mu0 + self.param[1] * mu.x + self.param[2] * mu.y + self.param[3] * mu.z)
    }

    /// Supporting half-spaces `n . x <= c` with unit normals, one per face
    /// (`planes()[i]` is the face opposite corner `i`), shifted so that
    /// `origin` becomes the coordinate origin.
    pub fn planes(&self, origin: Vector3<f64>) -> [Hs3; 4] {
        std::array::from_fn(|i| {
            let g = self.grads[i];
            // l_i(x) = g . (x - p_i') where p_i' is any point on the opposite face.
            let on_face = self.param[(i + 1) % 4];
            let norm = g.norm();
            let n = -g / norm;
            Hs3::new(n, n.dot(&(on_face - origin)))
        })
    }
}
