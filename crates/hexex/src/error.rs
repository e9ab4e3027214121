//! Precondition failures that abort an extraction before any parallel work.
//!
//! Everything that can go wrong inside a single tetrahedron (degenerate or
//! inverted parametrization, clipping slivers) or in the assembled topology is
//! recorded in the [`Report`](crate::report::Report) instead.

use std::fmt;

/// Errors surfaced by [`extract`](crate::extract::extract).
#[derive(Clone, Debug, PartialEq)]
pub enum ExtractError {
    /// A configuration value is outside its documented range.
    InvalidConfig { reason: String },
    /// The parametrization does not provide one corner set per cell.
    ParametrizationMismatch { cells: usize, parametrized: usize },
    /// A cell references a vertex index outside `0..num_vertices`.
    VertexOutOfRange {
        cell: usize,
        vertex: usize,
        num_vertices: usize,
    },
    /// A cell lists the same vertex twice.
    RepeatedVertex { cell: usize, vertex: usize },
    /// A world or parameter coordinate is NaN or infinite.
    NonFiniteCoordinate { what: &'static str, index: usize },
    /// The worker pool could not be created.
    ThreadPool { reason: String },
}

impl ExtractError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid configuration: {reason}"),
            Self::ParametrizationMismatch {
                cells,
                parametrized,
            } => write!(
                f,
                "parametrization covers {parametrized} cells but the mesh has {cells}"
            ),
            Self::VertexOutOfRange {
                cell,
                vertex,
                num_vertices,
            } => write!(
                f,
                "cell {cell} references vertex {vertex} but the mesh has {num_vertices} vertices"
            ),
            Self::RepeatedVertex { cell, vertex } => {
                write!(f, "cell {cell} references vertex {vertex} more than once")
            }
            Self::NonFiniteCoordinate { what, index } => {
                write!(f, "non-finite {what} coordinate at index {index}")
            }
            Self::ThreadPool { reason } => write!(f, "failed to build worker pool: {reason}"),
        }
    }
}

impl std::error::Error for ExtractError {}
