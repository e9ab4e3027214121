//! Report Collector: stage timings and mesh statistics of one extraction.
//!
//! The collector is owned by the pipeline thread. Parallel stages bump a
//! separate set of atomic `StageCounters`, drained into the report at stage
//! boundaries; `finish` freezes the result.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

/// Frozen result of one extraction run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Report {
    /// Stage name -> wall-clock seconds.
    pub timings: BTreeMap<String, f64>,
    pub num_tets: usize,
    pub degenerate_tets: usize,
    pub low_quality_tets: usize,
    /// Cubes enumerated by the locator.
    pub candidate_cubes: usize,
    /// Cubes that needed clipping against a tet.
    pub clipped_cubes: usize,
    /// Shared tet faces whose two sides use different charts.
    pub seam_faces: usize,
    /// Seam faces with no grid-preserving transition; never glued.
    pub unglued_seam_faces: usize,
    /// Tets whose parameters were moved into a neighbor's chart.
    pub realigned_tets: usize,
    /// Distinct lattice points claimed by some tet.
    pub lattice_points: usize,
    /// Lattice points claimed by more than one tet.
    pub shared_lattice_points: usize,
    /// Points claimed by several tets, at least one of them in its interior.
    pub folded_lattice_points: usize,
    pub hex_vertices: usize,
    pub hex_cells: usize,
    pub discarded_partial_cubes: usize,
    pub overlapping_cells: usize,
    /// Cells whose world orientation disagrees with the lattice.
    pub mirrored_cells: usize,
    pub non_manifold_faces: usize,
    pub inconsistent_edges: usize,
    pub pwl_points: usize,
    pub pwl_edges: usize,
    pub pwl_faces: usize,
    /// Ids of degenerate tets, sorted.
    pub degenerate_tet_ids: Vec<usize>,
    pub hex_extraction_succeeded: bool,
    /// `None` when no piecewise-linear output was requested.
    pub pwl_extraction_succeeded: Option<bool>,
    pub failure: Option<String>,
    pub igm_scaling_factor: i64,
    /// Worker threads actually used.
    pub num_threads: usize,
}

impl Report {
    /// Total number of topology anomalies.
    pub fn topology_anomalies(&self) -> usize {
        self.non_manifold_faces + self.inconsistent_edges + self.overlapping_cells
    }

    pub fn total_seconds(&self) -> f64 {
        self.timings.values().sum()
    }
}

/// Counters shared by the workers of the per-tet stages.
#[derive(Debug, Default)]
pub struct StageCounters {
    pub degenerate: AtomicUsize,
    pub low_quality: AtomicUsize,
    pub candidate_cubes: AtomicUsize,
    pub clipped_cubes: AtomicUsize,
}

impl StageCounters {
    #[inline]
    pub fn add(counter: &AtomicUsize, n: usize) {
        if n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Move the counts into `report` and reset.
    pub fn drain_into(&self, report: &mut Report) {
        report.degenerate_tets += self.degenerate.swap(0, Ordering::Relaxed);
        report.low_quality_tets += self.low_quality.swap(0, Ordering::Relaxed);
        report.candidate_cubes += self.candidate_cubes.swap(0, Ordering::Relaxed);
        report.clipped_cubes += self.clipped_cubes.swap(0, Ordering::Relaxed);
    }
}

/// Accumulates a [`Report`] while the pipeline runs.
#[derive(Debug, Default)]
pub struct ReportCollector {
    report: Report,
}

impl ReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` and record its wall-clock duration under `stage`.
    ///
    /// Repeated stages accumulate.
    pub fn time<R>(&mut self, stage: &str, f: impl FnOnce() -> R) -> R {
        let t0 = Instant::now();
        let out = f();
        let secs = t0.elapsed().as_secs_f64();
        debug!(stage, secs, "stage finished");
        *self.report.timings.entry(stage.to_string()).or_insert(0.0) += secs;
        out
    }

    /// Mutable access for counters produced outside the parallel stages.
    pub fn report_mut(&mut self) -> &mut Report {
        &mut self.report
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Freeze the report.
    pub fn finish(mut self) -> Report {
        self.report.degenerate_tet_ids.sort_unstable();
        self.report
    }
}
