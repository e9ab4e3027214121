use nalgebra::Vector3;
use proptest::prelude::*;
use rustc_hash::FxHashMap;

use super::*;
use crate::clip::{CellCandidate, CubeKind, LatticeClaim};
use crate::fixtures::{corner_tet, invert_cell, jitter_world, kuhn_box, remap_cells, tet_pair};
use crate::lattice::LatticePoint;

fn cfg(scale: i64) -> Config {
    Config {
        igm_scaling_factor: scale,
        num_threads: 2,
        ..Config::default()
    }
}

fn run(mesh: &TetMesh, igm: &Parametrization, cfg: &Config) -> ExtractionResult {
    extract(mesh, igm, cfg).expect("valid input")
}

fn frames(mesh: &TetMesh, igm: &Parametrization, scale: i64) -> Vec<TetFrame> {
    (0..mesh.num_cells())
        .map(|t| {
            let param = igm.corners[t].map(|p| p * scale as f64);
            TetFrame::new(t, mesh.corners(t), param).unwrap()
        })
        .collect()
}

/// Owner of every hex vertex is the smallest tet containing its lattice point.
fn assert_tie_break(hex: &HexMesh, frames: &[TetFrame], eps: f64) {
    assert!(hex.vertex_lattice.windows(2).all(|w| w[0] < w[1]));
    for (v, p) in hex.vertex_lattice.iter().enumerate() {
        let x = p.to_vector();
        let first = frames.iter().position(|f| f.contains(x, eps));
        assert_eq!(first, Some(hex.vertex_owner[v]), "lattice point {p:?}");
    }
}

/// Every lattice point on an interior tet face is in the merged table, claimed
/// by each tet holding it and owned by the smallest one. Returns how many
/// such points were checked.
fn assert_face_points_owned(mesh: &TetMesh, igm: &Parametrization, scale: i64) -> usize {
    let eps = Config::default().inside_tolerance;
    let frames = frames(mesh, igm, scale);
    let opts = ClassifyOpts {
        inside_tolerance: eps,
        face_pieces: false,
        edge_pieces: false,
    };
    let merged = merge(frames.iter().map(|f| contribute(f, &opts)));

    let mut faces: FxHashMap<[usize; 3], Vec<(usize, [usize; 3])>> = FxHashMap::default();
    for (t, cell) in mesh.cells.iter().enumerate() {
        for skip in 0..4 {
            let mut local = [(skip + 1) % 4, (skip + 2) % 4, (skip + 3) % 4];
            local.sort_unstable_by_key(|&c| cell[c]);
            faces.entry(local.map(|c| cell[c])).or_default().push((t, local));
        }
    }

    let mut checked = 0;
    for sides in faces.values().filter(|s| s.len() == 2) {
        let (a, local) = sides[0];
        let b = sides[1].0;
        let tri = local.map(|c| frames[a].param[c]);
        let lo = tri.iter().fold(tri[0], |m, p| m.inf(p)).map(|c| c.floor() as i64);
        let hi = tri.iter().fold(tri[0], |m, p| m.sup(p)).map(|c| c.ceil() as i64);
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    let p = LatticePoint::new(x, y, z);
                    let v = p.to_vector();
                    if !(frames[a].contains(v, eps) && frames[b].contains(v, eps)) {
                        continue;
                    }
                    let holders: Vec<usize> = frames
                        .iter()
                        .filter(|f| f.contains(v, eps))
                        .map(|f| f.index)
                        .collect();
                    let entry = merged.lattice.get(&p).expect("face point claimed");
                    assert_eq!(entry.owner, holders[0], "lattice point {p:?}");
                    assert_eq!(entry.claims as usize, holders.len(), "lattice point {p:?}");
                    checked += 1;
                }
            }
        }
    }
    checked
}

#[test]
fn kuhn_box_yields_one_cell_per_lattice_cube() {
    let (mesh, igm) = kuhn_box([2, 2, 2]);
    for (scale, cells) in [(1, 8), (2, 64)] {
        let res = run(&mesh, &igm, &cfg(scale));
        let hex = res.hex_mesh.expect("hex mesh");
        assert_eq!(hex.num_cells(), cells);
        let side = 2 * scale as usize + 1;
        assert_eq!(hex.num_vertices(), side * side * side);
        assert!(hex.anomalous_cells.is_empty());
        assert_eq!(res.report.hex_cells, cells);
        assert_eq!(res.report.discarded_partial_cubes, 0);
        assert_eq!(res.report.degenerate_tets, 0);
        assert_eq!(res.report.mirrored_cells, 0);
        assert_eq!(res.report.seam_faces, 0);
        assert_eq!(res.report.folded_lattice_points, 0);
        assert!(res.report.hex_extraction_succeeded);
        assert!((hex.total_volume() - 8.0).abs() < 1e-9);
        for c in 0..hex.num_cells() {
            assert!(hex.cell_volume(c) > 0.0);
        }
    }
}

#[test]
fn output_is_identical_across_thread_counts() {
    let (mut mesh, igm) = kuhn_box([3, 2, 2]);
    jitter_world(&mut mesh, 0.05, 11);
    let mut results = Vec::new();
    for threads in [1, 2, 0] {
        let c = Config {
            num_threads: threads,
            extract_piecewise_linear_faces: true,
            ..cfg(2)
        };
        results.push(run(&mesh, &igm, &c));
    }
    for r in &results[1..] {
        assert_eq!(r.hex_mesh, results[0].hex_mesh);
        assert_eq!(r.piecewise_linear_mesh, results[0].piecewise_linear_mesh);
        assert_eq!(r.report.lattice_points, results[0].report.lattice_points);
    }
}

#[test]
fn rerun_is_idempotent() {
    let (mut mesh, igm) = kuhn_box([2, 2, 1]);
    jitter_world(&mut mesh, 0.05, 3);
    let a = run(&mesh, &igm, &cfg(3));
    let b = run(&mesh, &igm, &cfg(3));
    assert_eq!(a.hex_mesh, b.hex_mesh);
    assert_eq!(a.report.hex_cells, b.report.hex_cells);
    assert_eq!(a.report.candidate_cubes, b.report.candidate_cubes);
}

#[test]
fn vertices_map_back_to_lattice_points() {
    let (mut mesh, igm) = kuhn_box([2, 2, 2]);
    jitter_world(&mut mesh, 0.08, 5);
    let scale = 3;
    let res = run(&mesh, &igm, &cfg(scale));
    let hex = res.hex_mesh.expect("hex mesh");
    let frames = frames(&mesh, &igm, scale);
    for (v, &world) in hex.vertices.iter().enumerate() {
        let owner = &frames[hex.vertex_owner[v]];
        let param = owner.to_param(world).unwrap();
        let lattice = LatticePoint::snap(param);
        assert_eq!(lattice, hex.vertex_lattice[v]);
        assert!((param - lattice.to_vector()).amax() < 1e-9);
    }
}

#[test]
fn shared_face_points_have_exactly_one_owner() {
    let (mesh, igm) = kuhn_box([2, 2, 2]);
    let scale = 2;
    let res = run(&mesh, &igm, &cfg(scale));
    let hex = res.hex_mesh.expect("hex mesh");
    // Every lattice point of the box shows up once.
    assert_eq!(hex.num_vertices(), 125);
    assert_tie_break(&hex, &frames(&mesh, &igm, scale), Config::default().inside_tolerance);
    assert_eq!(res.report.lattice_points, 125);
}

#[test]
fn face_points_outside_every_cell_are_still_owned() {
    let (mesh, igm) = tet_pair();
    let res = run(&mesh, &igm, &cfg(2));
    let hex = res.hex_mesh.expect("hex mesh");
    assert_eq!(hex.num_cells(), 1);
    // (2,0,0) lies on the shared face but in no complete cube.
    assert!(!hex.vertex_lattice.contains(&LatticePoint::new(2, 0, 0)));
    assert_eq!(assert_face_points_owned(&mesh, &igm, 2), 6);
    assert_eq!(res.report.shared_lattice_points, 6);
    assert_eq!(res.report.folded_lattice_points, 0);

    let (mut mesh, igm) = kuhn_box([2, 1, 1]);
    jitter_world(&mut mesh, 0.05, 7);
    assert!(assert_face_points_owned(&mesh, &igm, 2) > 0);
}

#[test]
fn shifted_chart_is_glued_across_the_seam() {
    let (mesh, seamless) = kuhn_box([2, 1, 1]);
    let mut igm = seamless.clone();
    remap_cells(&mut igm, 6..12, |p| p + Vector3::new(10.0, 0.0, 0.0));
    let expected = run(&mesh, &seamless, &cfg(1));
    let res = run(&mesh, &igm, &cfg(1));
    let hex = res.hex_mesh.expect("hex mesh");
    assert_eq!(hex.num_cells(), 2);
    assert_eq!(hex.num_vertices(), 12);
    assert_eq!(hex.faces.iter().filter(|f| f.cells.len() == 2).count(), 1);
    assert_eq!(Some(hex), expected.hex_mesh);
    assert_eq!(res.report.seam_faces, 2);
    assert_eq!(res.report.unglued_seam_faces, 0);
    assert_eq!(res.report.realigned_tets, 6);
}

#[test]
fn offset_parametrization_with_seam_matches_seamless() {
    let (mesh, mut seamless) = kuhn_box([3, 1, 1]);
    remap_cells(&mut seamless, 0..18, |p| p + Vector3::new(0.5, 0.0, 0.0));
    let mut igm = seamless.clone();
    remap_cells(&mut igm, 6..18, |p| p + Vector3::new(10.0, 0.0, 0.0));
    let expected = run(&mesh, &seamless, &cfg(1));
    let res = run(&mesh, &igm, &cfg(1));
    let hex = res.hex_mesh.expect("hex mesh");
    assert_eq!(hex.num_cells(), 2);
    assert_eq!(hex.num_vertices(), 12);
    assert_eq!(Some(hex), expected.hex_mesh);
    assert_eq!(res.report.unglued_seam_faces, 0);
}

#[test]
fn rotated_chart_is_glued_across_the_seam() {
    let (mesh, seamless) = kuhn_box([2, 2, 1]);
    let mut igm = seamless.clone();
    // Quarter turn about z, then a lattice shift, on the cubes with x = 1.
    remap_cells(&mut igm, (6..12).chain(18..24), |p| {
        Vector3::new(-p.y + 4.0, p.x - 7.0, p.z)
    });
    let expected = run(&mesh, &seamless, &cfg(2));
    let res = run(&mesh, &igm, &cfg(2));
    assert_eq!(res.hex_mesh, expected.hex_mesh);
    assert_eq!(res.report.hex_cells, 32);
    assert_eq!(res.report.unglued_seam_faces, 0);
    assert_eq!(res.report.realigned_tets, 12);
    assert!(res.report.seam_faces > 0);
}

#[test]
fn non_grid_seam_is_reported_and_left_open() {
    let (mesh, mut igm) = kuhn_box([2, 1, 1]);
    remap_cells(&mut igm, 6..12, |p| p + Vector3::new(0.3, 0.0, 0.0));
    let res = run(&mesh, &igm, &cfg(1));
    assert_eq!(res.report.seam_faces, 2);
    assert_eq!(res.report.unglued_seam_faces, 2);
    assert_eq!(res.report.realigned_tets, 0);
    // The shifted cube no longer matches the lattice.
    assert_eq!(res.report.hex_cells, 1);
}

#[test]
fn mirrored_cells_reach_the_report() {
    let origin = LatticePoint::new(0, 0, 0);
    let claims = origin
        .cube_corners()
        .iter()
        .map(|&p| LatticeClaim {
            point: p,
            world: p.to_vector().component_mul(&Vector3::new(-1.0, 1.0, 1.0)),
            on_boundary: true,
        })
        .collect();
    let contrib = TetContribution {
        tet: 0,
        claims,
        candidates: vec![CellCandidate {
            cube: origin,
            tet: 0,
            kind: CubeKind::Interior,
            coverage: 1.0,
            corners_inside: u8::MAX,
            face_pieces: Vec::new(),
            edge_pieces: Vec::new(),
        }],
        visited_cubes: 1,
    };
    let (hex, stats) = assemble(&merge([contrib]), 1e-6);
    assert!(hex.is_some());
    let mut report = Report::default();
    record_assembly(&mut report, &stats);
    assert_eq!(report.mirrored_cells, 1);
    assert_eq!(report.overlapping_cells, 0);
}

#[test]
fn inverted_tet_is_excluded() {
    let (mesh, mut igm) = kuhn_box([1, 1, 1]);
    invert_cell(&mut igm, 0);
    let res = run(&mesh, &igm, &cfg(2));
    let hex = res.hex_mesh.expect("other tets still produce cells");
    // Tet 0 covers x >= y >= z; the four cubes it touches lose coverage.
    assert_eq!(hex.num_cells(), 4);
    assert_eq!(res.report.degenerate_tets, 1);
    assert_eq!(res.report.degenerate_tet_ids, vec![0]);
    assert_eq!(res.report.discarded_partial_cubes, 4);
    assert_eq!(res.report.non_manifold_faces, 0);
    for origin in &hex.cell_lattice {
        let [a, b, c] = origin.0;
        assert!(!(a >= b && b >= c), "cube {origin:?} overlaps the inverted tet");
    }
    for &owner in &hex.vertex_owner {
        assert_ne!(owner, 0);
    }
}

#[test]
fn fully_inverted_input_has_no_mesh() {
    let (mesh, mut igm) = kuhn_box([1, 1, 1]);
    for t in 0..mesh.num_cells() {
        invert_cell(&mut igm, t);
    }
    let c = Config {
        extract_piecewise_linear_faces: true,
        ..cfg(2)
    };
    let res = run(&mesh, &igm, &c);
    assert!(res.hex_mesh.is_none());
    assert!(res.piecewise_linear_mesh.is_none());
    assert_eq!(res.report.degenerate_tets, mesh.num_cells());
    assert!(!res.report.hex_extraction_succeeded);
    assert_eq!(res.report.pwl_extraction_succeeded, Some(false));
    assert!(res.report.failure.is_some());
}

#[test]
fn cell_count_matches_parametric_volume() {
    let (mesh, igm) = kuhn_box([2, 1, 1]);
    let scale = 3;
    let res = run(&mesh, &igm, &cfg(scale));
    let hex = res.hex_mesh.expect("hex mesh");
    let param_volume: f64 = (0..mesh.num_cells())
        .map(|t| {
            let p = igm.corners[t].map(|x| x * scale as f64);
            crate::tet::signed_volume(&p)
        })
        .sum();
    assert!((hex.num_cells() as f64 - param_volume).abs() / param_volume < 1e-6);
    let world_volume: f64 = (0..mesh.num_cells())
        .map(|t| crate::tet::signed_volume(&mesh.corners(t)))
        .sum();
    assert!((hex.total_volume() - world_volume).abs() / world_volume < 1e-6);
}

#[test]
fn corner_tet_scales_cubically() {
    let (mesh, igm) = corner_tet();
    for k in 1..=4_i64 {
        let res = run(&mesh, &igm, &cfg(k));
        let n = 4 * k as usize;
        let expected = n * (n - 1) * (n - 2) / 6;
        assert_eq!(res.report.hex_cells, expected, "k = {k}");
    }
}

#[test]
fn malformed_input_fails_before_extraction() {
    let (mut mesh, igm) = kuhn_box([1, 1, 1]);
    mesh.cells[3][2] = 99;
    let err = extract(&mesh, &igm, &cfg(1)).unwrap_err();
    assert!(matches!(err, ExtractError::VertexOutOfRange { cell: 3, vertex: 99, .. }));

    let (mesh, mut igm) = kuhn_box([1, 1, 1]);
    igm.corners.pop();
    let err = extract(&mesh, &igm, &cfg(1)).unwrap_err();
    assert!(matches!(err, ExtractError::ParametrizationMismatch { .. }));

    let (mesh, igm) = kuhn_box([1, 1, 1]);
    let err = extract(&mesh, &igm, &cfg(0)).unwrap_err();
    assert!(matches!(err, ExtractError::InvalidConfig { .. }));
}

#[test]
fn low_quality_tets_still_contribute() {
    let (mesh, igm) = kuhn_box([1, 1, 1]);
    let c = Config {
        low_quality_threshold: 1.0,
        ..cfg(1)
    };
    let res = run(&mesh, &igm, &c);
    assert_eq!(res.report.low_quality_tets, 6);
    assert_eq!(res.report.degenerate_tets, 0);
    assert_eq!(res.report.hex_cells, 1);
}

#[test]
fn report_records_stages() {
    let (mesh, igm) = kuhn_box([1, 1, 1]);
    let res = run(&mesh, &igm, &cfg(2));
    for stage in ["validate", "align", "classify", "merge", "assemble"] {
        assert!(res.report.timings.contains_key(stage), "{stage}");
    }
    assert!(!res.report.timings.contains_key("pwl"));
    assert_eq!(res.report.pwl_extraction_succeeded, None);
    assert!(res.piecewise_linear_mesh.is_none());
    assert_eq!(res.report.num_tets, 6);
    assert_eq!(res.report.igm_scaling_factor, 2);
    assert_eq!(res.report.num_threads, 2);
    assert!(res.report.candidate_cubes >= res.report.hex_cells);
}

#[test]
fn pwl_surface_is_closed() {
    let (mesh, igm) = kuhn_box([2, 2, 2]);
    let c = Config {
        extract_piecewise_linear_faces: true,
        extract_piecewise_linear_edges: true,
        ..cfg(1)
    };
    let res = run(&mesh, &igm, &c);
    let pwl = res.piecewise_linear_mesh.expect("pwl mesh");
    // Each boundary square is split by a Kuhn diagonal.
    assert_eq!(pwl.faces.len(), 48);
    assert_eq!(pwl.points.len(), 26);
    assert_eq!(pwl.edges.len(), 72);
    let mut used = vec![0u8; 2 * pwl.edges.len()];
    for face in &pwl.faces {
        for &he in face {
            used[he] += 1;
        }
    }
    assert!(used.iter().all(|&n| n == 1));
    assert_eq!(res.report.pwl_faces, 48);
    assert_eq!(res.report.pwl_extraction_succeeded, Some(true));
    assert!(res.report.timings.contains_key("pwl"));
}

#[test]
fn pwl_surface_is_closed_with_clipped_pieces() {
    let (mut mesh, igm) = kuhn_box([1, 1, 1]);
    jitter_world(&mut mesh, 0.05, 1);
    let c = Config {
        extract_piecewise_linear_faces: true,
        ..cfg(3)
    };
    let res = run(&mesh, &igm, &c);
    let pwl = res.piecewise_linear_mesh.expect("pwl mesh");
    let euler = pwl.points.len() as i64 - pwl.edges.len() as i64 + pwl.faces.len() as i64;
    assert_eq!(euler, 2);
    let mut used = vec![0u8; 2 * pwl.edges.len()];
    for face in &pwl.faces {
        for &he in face {
            used[he] += 1;
        }
    }
    assert!(used.iter().all(|&n| n == 1));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_every_lattice_point_has_one_owner(seed in 0u64..1000, scale in 1i64..=2) {
        let (mut mesh, igm) = kuhn_box([2, 1, 1]);
        jitter_world(&mut mesh, 0.05, seed);
        let res = run(&mesh, &igm, &cfg(scale));
        let hex = res.hex_mesh.expect("hex mesh");
        let k = scale as usize;
        prop_assert_eq!(hex.num_cells(), 2 * k * k * k);
        prop_assert_eq!(hex.num_vertices(), (2 * k + 1) * (k + 1) * (k + 1));
        assert_tie_break(&hex, &frames(&mesh, &igm, scale), Config::default().inside_tolerance);
    }

    #[test]
    fn prop_frame_round_trip(
        seed in 0u64..1000,
        x in 0.0f64..2.0,
        y in 0.0f64..2.0,
        z in 0.0f64..2.0,
    ) {
        let (mut mesh, igm) = kuhn_box([1, 1, 1]);
        jitter_world(&mut mesh, 0.1, seed);
        let p = Vector3::new(x, y, z);
        let frames = frames(&mesh, &igm, 2);
        let inside: Vec<usize> = frames
            .iter()
            .filter(|f| f.contains(p, 1e-9))
            .map(|f| f.index)
            .collect();
        // The six Kuhn tets cover the cube.
        prop_assert!(!inside.is_empty());
        for f in &frames {
            let back = f.to_param(f.to_world(p)).unwrap();
            prop_assert!((back - p).amax() < 1e-9);
            let by_planes = f
                .planes(Vector3::zeros())
                .iter()
                .all(|h| h.satisfies(p, 1e-9));
            let l = f.barycentric(p);
            // Away from the faces both tests agree.
            if l.iter().all(|v| v.abs() > 1e-6) {
                prop_assert_eq!(by_planes, f.contains(p, 1e-9));
            }
        }
    }
}
