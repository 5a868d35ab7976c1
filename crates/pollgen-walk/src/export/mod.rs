//! Rendering walk statistics and graph structure for external tools.

pub mod dot;
pub mod histogram;

use std::fmt;
use std::path::PathBuf;

pub use dot::export_dot;
pub use histogram::{
    edge_chart, export_histograms, node_chart, Histogram, HistogramChart, HistogramPlotter,
    HistogramSeries, JsonPlotter,
};

/// Whether a coverage gap is a node or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Node,
    Edge,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Node => write!(f, "node"),
            ItemKind::Edge => write!(f, "edge"),
        }
    }
}

/// Failure inside a plotting back-end.
#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode chart: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("plot back-end failed: {0}")]
    Backend(String),
}

/// Errors from histogram export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Some node or edge has no recorded depth yet; run more walks and retry.
    #[error("{kind} '{name}' was never exercised")]
    NeverExercised { kind: ItemKind, name: String },

    #[error("plotting failed: {0}")]
    Plot(#[from] PlotError),
}
