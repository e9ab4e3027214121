//! Deterministic parametrized tet meshes for tests, benches and demos.
//!
//! - `kuhn_box`: a box of unit cubes, each split into the six Kuhn tets,
//!   with the identity parametrization.
//! - `corner_tet`: one tet with legs of four lattice units along the axes.
//! - `tet_pair`: the corner tet and its neighbor across the slanted face.
//! - `jitter_world`: seeded world-space noise that keeps the parametrization.
//! - `remap_cells`: per-cell chart changes, for seams.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::mesh::{Parametrization, TetMesh};

/// Axis orders of the six Kuhn tets; odd permutations come second.
const KUHN_PERMS: [([usize; 3], bool); 6] = [
    ([0, 1, 2], false),
    ([1, 2, 0], false),
    ([2, 0, 1], false),
    ([0, 2, 1], true),
    ([1, 0, 2], true),
    ([2, 1, 0], true),
];

/// Box of `dims` unit cubes with world == parameter coordinates.
///
/// Tet `6 * cube + k` walks the cube diagonal along the axis order of the
/// `k`-th Kuhn permutation. Tet 0 covers `x >= y >= z` of the first cube.
/// All tets are positively oriented.
pub fn kuhn_box(dims: [usize; 3]) -> (TetMesh, Parametrization) {
    let [nx, ny, nz] = dims;
    let vid = |x: usize, y: usize, z: usize| x + (nx + 1) * (y + (ny + 1) * z);
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for z in 0..=nz {
        for y in 0..=ny {
            for x in 0..=nx {
                vertices.push(Vector3::new(x as f64, y as f64, z as f64));
            }
        }
    }
    let mut cells = Vec::with_capacity(6 * nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                for (perm, odd) in KUHN_PERMS {
                    let mut p = [x, y, z];
                    let mut tet = [vid(p[0], p[1], p[2]); 4];
                    for (step, &axis) in perm.iter().enumerate() {
                        p[axis] += 1;
                        tet[step + 1] = vid(p[0], p[1], p[2]);
                    }
                    if odd {
                        tet.swap(2, 3);
                    }
                    cells.push(tet);
                }
            }
        }
    }
    let mesh = TetMesh::new(vertices, cells);
    let igm = Parametrization::from_vertex_params(&mesh, &mesh.vertices);
    (mesh, igm)
}

/// Single tet with unit legs in world space and legs of 4 in parameter space.
///
/// At scaling factor `k` it fully contains `C(4k, 3)` lattice cubes.
pub fn corner_tet() -> (TetMesh, Parametrization) {
    let vertices = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
    ];
    let mesh = TetMesh::new(vertices, vec![[0, 1, 2, 3]]);
    let params: Vec<_> = mesh.vertices.iter().map(|v| v * 4.0).collect();
    let igm = Parametrization::from_vertex_params(&mesh, &params);
    (mesh, igm)
}

/// Corner tet plus the tet on the far side of its slanted face, world == param.
///
/// At scaling factor 2 only the cube at the origin is complete, while the
/// shared face carries six lattice points.
pub fn tet_pair() -> (TetMesh, Parametrization) {
    let vertices = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(1.0, 1.0, 1.0),
    ];
    let mesh = TetMesh::new(vertices, vec![[0, 1, 2, 3], [1, 2, 3, 4]]);
    let igm = Parametrization::from_vertex_params(&mesh, &mesh.vertices);
    (mesh, igm)
}

/// Replace the parameters of `cells` by `map` of them (a chart change).
pub fn remap_cells<I, F>(igm: &mut Parametrization, cells: I, map: F)
where
    I: IntoIterator<Item = usize>,
    F: Fn(Vector3<f64>) -> Vector3<f64>,
{
    for c in cells {
        igm.corners[c] = igm.corners[c].map(&map);
    }
}

/// Invert the parametrization of `cell` by swapping two of its corners.
pub fn invert_cell(igm: &mut Parametrization, cell: usize) {
    igm.corners[cell].swap(2, 3);
}

/// Move every world vertex by up to `amplitude` per axis, reproducibly.
pub fn jitter_world(mesh: &mut TetMesh, amplitude: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for v in &mut mesh.vertices {
        for i in 0..3 {
            v[i] += rng.gen_range(-amplitude..=amplitude);
        }
    }
}
