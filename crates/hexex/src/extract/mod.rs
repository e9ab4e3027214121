//! Extraction pipeline.
//!
//! Stages (timed under these names in the report):
//! - `validate`: preconditions on config and input; the only fatal failures.
//! - `align`: scale the parametrization and move every tet into one chart
//!   per connected component, so seams glue.
//! - `classify`: per tet, in parallel: Jacobian check, locate, claim, clip.
//! - `merge`: single-threaded fold in tet order into the lattice table.
//! - `assemble`: cells, faces, edges, topology checks.
//! - `pwl`: optional piecewise-linear boundary tracing.

use nalgebra::Vector3;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{info, warn};

use crate::assemble::{assemble, merge, AssemblyStats};
use crate::chart::{align_charts, TRANSITION_TOLERANCE};
use crate::clip::{contribute, ClassifyOpts, TetContribution};
use crate::config::Config;
use crate::error::ExtractError;
use crate::mesh::{check_input, HexMesh, Parametrization, PiecewiseLinearMesh, TetMesh};
use crate::pwl::extract_piecewise_linear;
use crate::report::{Report, ReportCollector, StageCounters};
use crate::tet::{check_jacobian, TetFrame, TetQuality};

/// Everything one extraction produces.
#[derive(Clone, Debug, Default)]
pub struct ExtractionResult {
    /// `None` if no lattice cube became a cell.
    pub hex_mesh: Option<HexMesh>,
    /// `None` unless requested and the hex mesh exists.
    pub piecewise_linear_mesh: Option<PiecewiseLinearMesh>,
    pub report: Report,
}

enum TetOutcome {
    Degenerate,
    Contributed(TetContribution),
}

fn process_tet(
    t: usize,
    mesh: &TetMesh,
    param: [Vector3<f64>; 4],
    cfg: &Config,
    opts: &ClassifyOpts,
    counters: &StageCounters,
) -> TetOutcome {
    let world = mesh.corners(t);
    let check = check_jacobian(&world, &param, cfg);
    if check.quality == TetQuality::Degenerate {
        StageCounters::add(&counters.degenerate, 1);
        return TetOutcome::Degenerate;
    }
    let Some(frame) = TetFrame::new(t, world, param) else {
        StageCounters::add(&counters.degenerate, 1);
        return TetOutcome::Degenerate;
    };
    if check.quality == TetQuality::LowQuality {
        StageCounters::add(&counters.low_quality, 1);
    }
    let contrib = contribute(&frame, opts);
    StageCounters::add(&counters.candidate_cubes, contrib.visited_cubes);
    StageCounters::add(&counters.clipped_cubes, contrib.clipped_cubes());
    TetOutcome::Contributed(contrib)
}

/// Copy the assembler's counters into the report.
fn record_assembly(r: &mut Report, stats: &AssemblyStats) {
    r.discarded_partial_cubes = stats.cells.discarded_partial_cubes;
    r.overlapping_cells = stats.cells.overlapping_cells;
    r.mirrored_cells = stats.cells.mirrored_cells;
    r.non_manifold_faces = stats.topology.non_manifold_faces;
    r.inconsistent_edges = stats.topology.inconsistent_edges;
}

/// Extract the hex mesh (and optionally its piecewise-linear boundary).
///
/// Fails only on precondition violations, before any parallel work. Local
/// problems (degenerate tets, topology anomalies) end up in the report.
pub fn extract(
    mesh: &TetMesh,
    igm: &Parametrization,
    cfg: &Config,
) -> Result<ExtractionResult, ExtractError> {
    let mut rc = ReportCollector::new();
    rc.time("validate", || -> Result<(), ExtractError> {
        cfg.validate()?;
        check_input(mesh, igm)
    })?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(cfg.effective_threads())
        .build()
        .map_err(|e| ExtractError::ThreadPool {
            reason: e.to_string(),
        })?;

    let n = mesh.num_cells();
    {
        let r = rc.report_mut();
        r.num_tets = n;
        r.igm_scaling_factor = cfg.igm_scaling_factor;
        r.num_threads = pool.current_num_threads();
    }
    info!(
        tets = n,
        scale = cfg.igm_scaling_factor,
        threads = pool.current_num_threads(),
        "extracting hex mesh"
    );

    let scale = cfg.igm_scaling_factor as f64;
    let (params, alignment) = rc.time("align", || {
        let scaled: Vec<[Vector3<f64>; 4]> =
            igm.corners.iter().map(|c| c.map(|p| p * scale)).collect();
        let alignment = align_charts(mesh, &scaled, TRANSITION_TOLERANCE * scale);
        let aligned: Vec<[Vector3<f64>; 4]> = scaled
            .iter()
            .enumerate()
            .map(|(t, c)| alignment.apply(t, c))
            .collect();
        (aligned, alignment)
    });
    {
        let r = rc.report_mut();
        r.seam_faces = alignment.seam_faces;
        r.unglued_seam_faces = alignment.unglued_faces;
        r.realigned_tets = alignment.realigned_tets();
    }
    if alignment.unglued_faces > 0 {
        warn!(
            unglued = alignment.unglued_faces,
            seams = alignment.seam_faces,
            "seam faces without a grid transition stay unglued"
        );
    }

    let opts = ClassifyOpts {
        inside_tolerance: cfg.inside_tolerance,
        face_pieces: cfg.extract_piecewise_linear_faces,
        edge_pieces: cfg.extract_piecewise_linear_edges,
    };
    let counters = StageCounters::default();
    let outcomes: Vec<TetOutcome> = rc.time("classify", || {
        pool.install(|| {
            (0..n)
                .into_par_iter()
                .map(|t| process_tet(t, mesh, params[t], cfg, &opts, &counters))
                .collect()
        })
    });
    counters.drain_into(rc.report_mut());

    let mut degenerate_ids = Vec::new();
    let mut contributions = Vec::with_capacity(outcomes.len());
    for (t, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            TetOutcome::Degenerate => degenerate_ids.push(t),
            TetOutcome::Contributed(c) => contributions.push(c),
        }
    }
    if !degenerate_ids.is_empty() {
        warn!(
            count = degenerate_ids.len(),
            first = degenerate_ids[0],
            "degenerate tetrahedra excluded"
        );
    }
    rc.report_mut().degenerate_tet_ids = degenerate_ids;

    let merged = rc.time("merge", || merge(contributions));
    {
        let r = rc.report_mut();
        r.lattice_points = merged.lattice.len();
        r.shared_lattice_points = merged.shared_points();
        r.folded_lattice_points = merged.folded_points();
    }
    if rc.report().folded_lattice_points > 0 {
        warn!(
            points = rc.report().folded_lattice_points,
            "lattice points claimed inside more than one tet"
        );
    }

    let (hex_mesh, stats) = rc.time("assemble", || assemble(&merged, cfg.coverage_tolerance));
    {
        let r = rc.report_mut();
        record_assembly(r, &stats);
        if let Some(hex) = &hex_mesh {
            r.hex_vertices = hex.num_vertices();
            r.hex_cells = hex.num_cells();
            r.hex_extraction_succeeded = true;
        } else {
            r.failure = Some(format!(
                "no lattice cube is fully covered by valid tetrahedra ({} of {} degenerate)",
                r.degenerate_tets, n
            ));
        }
    }
    match &hex_mesh {
        Some(hex) => {
            let anomalies = rc.report().topology_anomalies();
            if anomalies > 0 {
                warn!(
                    anomalies,
                    marked_cells = hex.anomalous_cells.len(),
                    "topology anomalies in hex mesh"
                );
            }
            info!(
                vertices = hex.num_vertices(),
                cells = hex.num_cells(),
                discarded = stats.cells.discarded_partial_cubes,
                "hex mesh assembled"
            );
        }
        None => warn!("hex extraction produced no cells"),
    }

    let mut piecewise_linear_mesh = None;
    if cfg.wants_piecewise_linear() {
        let pwl = hex_mesh.as_ref().map(|hex| {
            rc.time("pwl", || {
                extract_piecewise_linear(
                    hex,
                    &merged.pieces,
                    cfg.extract_piecewise_linear_faces,
                    cfg.extract_piecewise_linear_edges,
                )
            })
        });
        let r = rc.report_mut();
        r.pwl_extraction_succeeded = Some(pwl.is_some());
        if let Some(p) = &pwl {
            r.pwl_points = p.points.len();
            r.pwl_edges = p.edges.len();
            r.pwl_faces = p.faces.len();
            info!(
                points = p.points.len(),
                edges = p.edges.len(),
                faces = p.faces.len(),
                "piecewise-linear mesh traced"
            );
        }
        piecewise_linear_mesh = pwl;
    }

    Ok(ExtractionResult {
        hex_mesh,
        piecewise_linear_mesh,
        report: rc.finish(),
    })
}

#[cfg(test)]
mod tests;
