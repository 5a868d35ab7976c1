use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pollgen_graph::WalkGraph;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ExportError, ItemKind, PlotError};

/// Bin count used for every chart.
pub const DEFAULT_BINS: usize = 10;

pub const NODE_CHART_TITLE: &str = "Node execution per depth";
pub const EDGE_CHART_TITLE: &str = "Edge traversal per depth";

/// One category of a histogram: a node or edge and the depths it was seen at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSeries {
    pub name: String,
    pub depths: Vec<u64>,
}

/// Everything a plotting back-end needs to draw one grouped histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bins: usize,
    pub series: Vec<HistogramSeries>,
}

/// Bucketed counts for a chart. `counts[i][b]` is the number of depths of
/// series `i` falling into bin `b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `bins + 1` ascending bin boundaries.
    pub bin_edges: Vec<f64>,
    pub counts: Vec<Vec<u64>>,
}

impl HistogramChart {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: "Graph Depth".to_string(),
            y_label: "Count".to_string(),
            bins: DEFAULT_BINS,
            series: Vec::new(),
        }
    }

    pub fn push_series(&mut self, name: impl Into<String>, depths: &[u64]) {
        self.series.push(HistogramSeries {
            name: name.into(),
            depths: depths.to_vec(),
        });
    }

    pub fn names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }

    /// Split the shared depth range into equal-width bins and count each
    /// series. The last bin is closed on the right; a single-valued range is
    /// widened by 0.5 on each side.
    pub fn bucketize(&self) -> Histogram {
        let bins = self.bins.max(1);
        let mut all = self.series.iter().flat_map(|s| s.depths.iter().copied());
        let (lo, hi) = match all.next() {
            None => (0.0, 1.0),
            Some(first) => {
                let (min, max) = all.fold((first, first), |(min, max), d| (min.min(d), max.max(d)));
                if min == max {
                    (min as f64 - 0.5, max as f64 + 0.5)
                } else {
                    (min as f64, max as f64)
                }
            }
        };

        let width = (hi - lo) / bins as f64;
        let bin_edges = (0..=bins).map(|i| lo + width * i as f64).collect();
        let counts = self
            .series
            .iter()
            .map(|series| {
                let mut row = vec![0u64; bins];
                for &depth in &series.depths {
                    let index = (((depth as f64 - lo) / width) as usize).min(bins - 1);
                    row[index] += 1;
                }
                row
            })
            .collect();

        Histogram { bin_edges, counts }
    }
}

/// A plotting back-end: draws a chart to a file.
pub trait HistogramPlotter {
    /// File extension (without the dot) of the files this plotter writes.
    fn extension(&self) -> &str;

    fn plot(&mut self, chart: &HistogramChart, path: &Path) -> Result<(), PlotError>;
}

/// Writes the chart and its bucketed counts as pretty JSON, for consumers
/// that render charts elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPlotter;

#[derive(Serialize)]
struct JsonChart<'a> {
    chart: &'a HistogramChart,
    histogram: Histogram,
}

impl HistogramPlotter for JsonPlotter {
    fn extension(&self) -> &str {
        "json"
    }

    fn plot(&mut self, chart: &HistogramChart, path: &Path) -> Result<(), PlotError> {
        let io_err = |source| PlotError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        let doc = JsonChart {
            chart,
            histogram: chart.bucketize(),
        };
        serde_json::to_writer_pretty(&mut writer, &doc)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }
}

/// Execution depths of every node, one series per node in registration order.
pub fn node_chart(graph: &WalkGraph) -> HistogramChart {
    let mut chart = HistogramChart::new(NODE_CHART_TITLE);
    for node in graph.nodes() {
        chart.push_series(node.name(), node.execution_depths());
    }
    chart
}

/// Traversal depths of every edge, one `source->target` series per edge.
pub fn edge_chart(graph: &WalkGraph) -> HistogramChart {
    let mut chart = HistogramChart::new(EDGE_CHART_TITLE);
    for edge in graph.edges() {
        chart.push_series(graph.edge_label(edge), edge.traversal_depths());
    }
    chart
}

/// Fail on the first node or edge with no recorded depth.
fn ensure_covered(graph: &WalkGraph) -> Result<(), ExportError> {
    if let Some(node) = graph.nodes().iter().find(|n| n.execution_depths().is_empty()) {
        return Err(ExportError::NeverExercised {
            kind: ItemKind::Node,
            name: node.name().to_string(),
        });
    }
    if let Some(edge) = graph.edges().iter().find(|e| e.traversal_depths().is_empty()) {
        return Err(ExportError::NeverExercised {
            kind: ItemKind::Edge,
            name: graph.edge_label(edge),
        });
    }
    Ok(())
}

/// Plot node and edge depth histograms into `directory`.
///
/// Every node must have executed and every edge must have been traversed at
/// least once, otherwise nothing is plotted. Writes `nodes.<ext>` then
/// `edges.<ext>` and returns both paths.
pub fn export_histograms<P>(
    graph: &WalkGraph,
    directory: impl AsRef<Path>,
    plotter: &mut P,
) -> Result<Vec<PathBuf>, ExportError>
where
    P: HistogramPlotter + ?Sized,
{
    ensure_covered(graph)?;

    let directory = directory.as_ref();
    let nodes_path = directory.join(format!("nodes.{}", plotter.extension()));
    plotter.plot(&node_chart(graph), &nodes_path)?;

    let edges_path = directory.join(format!("edges.{}", plotter.extension()));
    plotter.plot(&edge_chart(graph), &edges_path)?;

    info!(
        nodes = graph.len(),
        edges = graph.edge_count(),
        directory = %directory.display(),
        "exported depth histograms"
    );
    Ok(vec![nodes_path, edges_path])
}
