use pollgen_graph::WalkGraph;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::engine::{Termination, WalkEngine, WalkError, WalkResult};
use super::rng::walk_rng;
use crate::stats::CoverageReport;

/// Configuration for a batch of walks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// Number of walks for [`run_walks`].
    pub walks: u32,
    /// Overrides the graph's max depth for the duration of one batch. The
    /// graph's own bound is put back when the batch returns.
    pub max_depth: Option<u64>,
    /// Walk budget for [`run_until_covered`].
    pub coverage_walk_limit: u32,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            walks: 100,
            max_depth: None,
            coverage_walk_limit: 10_000,
        }
    }
}

impl WalkConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Tally of how walks ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationCounts {
    pub not_selected: u64,
    pub aborted: u64,
    pub stopped: u64,
    pub terminal_node: u64,
    pub max_depth: u64,
}

impl TerminationCounts {
    pub fn record(&mut self, termination: Termination) {
        let slot = match termination {
            Termination::NotSelected(_) => &mut self.not_selected,
            Termination::Aborted(_) => &mut self.aborted,
            Termination::Stopped(_) => &mut self.stopped,
            Termination::TerminalNode(_) => &mut self.terminal_node,
            Termination::MaxDepth(_) => &mut self.max_depth,
        };
        *slot += 1;
    }
}

/// Aggregate result of a batch of walks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub walks: u64,
    /// Node executions across all walks.
    pub nodes_executed: u64,
    /// Edge traversals across all walks.
    pub edges_traversed: u64,
    /// Depth of the deepest walk.
    pub deepest_walk: u64,
    pub terminations: TerminationCounts,
}

impl RunSummary {
    fn absorb(&mut self, result: &WalkResult) {
        self.walks += 1;
        self.nodes_executed += result.depth;
        self.edges_traversed += result.traversed_edges().len() as u64;
        self.deepest_walk = self.deepest_walk.max(result.depth);
        self.terminations.record(result.termination);
    }
}

/// Run `config.walks` seeded walks and aggregate the results.
pub fn run_walks(graph: &mut WalkGraph, config: &WalkConfig) -> Result<RunSummary, WalkError> {
    with_depth_override(graph, config, |graph| walk_batch(graph, config))
}

fn walk_batch(graph: &mut WalkGraph, config: &WalkConfig) -> Result<RunSummary, WalkError> {
    let mut engine = WalkEngine::new(graph, walk_rng(config.seed));
    let mut summary = RunSummary::default();
    for _ in 0..config.walks {
        let result = engine.walk()?;
        summary.absorb(&result);
    }

    info!(
        walks = summary.walks,
        nodes_executed = summary.nodes_executed,
        deepest_walk = summary.deepest_walk,
        "walk batch complete"
    );
    Ok(summary)
}

/// Keep walking until every node and edge has been exercised.
///
/// Coverage is checked before each walk, so a graph that is already covered
/// returns immediately. Fails with [`WalkError::CoverageNotReached`] once
/// `config.coverage_walk_limit` walks have run without full coverage.
pub fn run_until_covered(
    graph: &mut WalkGraph,
    config: &WalkConfig,
) -> Result<RunSummary, WalkError> {
    if graph.is_empty() {
        return Err(WalkError::EmptyGraph);
    }
    with_depth_override(graph, config, |graph| walk_until_covered(graph, config))
}

fn walk_until_covered(graph: &mut WalkGraph, config: &WalkConfig) -> Result<RunSummary, WalkError> {
    let mut engine = WalkEngine::new(graph, walk_rng(config.seed));
    let mut summary = RunSummary::default();
    loop {
        let report = CoverageReport::from_graph(engine.graph());
        if report.is_complete() {
            info!(walks = summary.walks, "coverage complete");
            return Ok(summary);
        }
        if summary.walks >= u64::from(config.coverage_walk_limit) {
            return Err(WalkError::CoverageNotReached {
                walks: summary.walks,
                report,
            });
        }
        let result = engine.walk()?;
        summary.absorb(&result);
    }
}

/// Run `batch` under `config.max_depth`, then restore the graph's bound
/// whether or not the batch succeeded.
fn with_depth_override<T>(
    graph: &mut WalkGraph,
    config: &WalkConfig,
    batch: impl FnOnce(&mut WalkGraph) -> Result<T, WalkError>,
) -> Result<T, WalkError> {
    let Some(max_depth) = config.max_depth else {
        return batch(graph);
    };
    let previous = graph.max_depth();
    graph.set_max_depth(max_depth)?;
    let result = batch(graph);
    graph.set_max_depth(previous)?;
    result
}
