//! Walk statistics.
//!
//! Depth histories live on the graph's nodes and edges and accumulate across
//! walks. This module reads them back as coverage reports and per-item depth
//! summaries for analysis before (or instead of) plotting.

use pollgen_graph::WalkGraph;
use serde::{Deserialize, Serialize};

/// Which nodes and edges have been exercised at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub nodes_total: usize,
    pub nodes_exercised: usize,
    pub edges_total: usize,
    pub edges_exercised: usize,
    /// Names of nodes that never executed, in registration order.
    pub unexercised_nodes: Vec<String>,
    /// `source->target` labels of edges never taken, in registration order.
    pub untraversed_edges: Vec<String>,
}

impl CoverageReport {
    pub fn from_graph(graph: &WalkGraph) -> Self {
        let unexercised_nodes: Vec<String> = graph
            .nodes()
            .iter()
            .filter(|node| node.execution_depths().is_empty())
            .map(|node| node.name().to_string())
            .collect();
        let untraversed_edges: Vec<String> = graph
            .edges()
            .iter()
            .filter(|edge| edge.traversal_depths().is_empty())
            .map(|edge| graph.edge_label(edge))
            .collect();

        Self {
            nodes_total: graph.len(),
            nodes_exercised: graph.len() - unexercised_nodes.len(),
            edges_total: graph.edge_count(),
            edges_exercised: graph.edge_count() - untraversed_edges.len(),
            unexercised_nodes,
            untraversed_edges,
        }
    }

    /// Every node executed and every edge traversed at least once.
    pub fn is_complete(&self) -> bool {
        self.unexercised_nodes.is_empty() && self.untraversed_edges.is_empty()
    }

    /// Fraction of nodes and edges exercised (0.0-1.0). An empty graph counts
    /// as fully covered.
    pub fn percent(&self) -> f64 {
        let total = self.nodes_total + self.edges_total;
        if total == 0 {
            1.0
        } else {
            (self.nodes_exercised + self.edges_exercised) as f64 / total as f64
        }
    }
}

/// Count and spread of the depths one node or edge was exercised at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthSummary {
    pub name: String,
    pub count: usize,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub mean: Option<f64>,
}

impl DepthSummary {
    pub fn from_depths(name: impl Into<String>, depths: &[u64]) -> Self {
        let mean = if depths.is_empty() {
            None
        } else {
            Some(depths.iter().sum::<u64>() as f64 / depths.len() as f64)
        };
        Self {
            name: name.into(),
            count: depths.len(),
            min: depths.iter().copied().min(),
            max: depths.iter().copied().max(),
            mean,
        }
    }
}

/// Point-in-time view of all depth statistics in a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub nodes: Vec<DepthSummary>,
    pub edges: Vec<DepthSummary>,
    pub coverage: CoverageReport,
}

impl StatsSnapshot {
    pub fn from_graph(graph: &WalkGraph) -> Self {
        Self {
            nodes: graph
                .nodes()
                .iter()
                .map(|node| DepthSummary::from_depths(node.name(), node.execution_depths()))
                .collect(),
            edges: graph
                .edges()
                .iter()
                .map(|edge| {
                    DepthSummary::from_depths(graph.edge_label(edge), edge.traversal_depths())
                })
                .collect(),
            coverage: CoverageReport::from_graph(graph),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
