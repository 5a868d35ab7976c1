use pollgen_graph::{GraphError, NodeId, NodeOutcome, WalkGraph};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::selector::{choose_next, SelectError};
use super::trace::{WalkStepKind, WalkTrace};
use crate::stats::CoverageReport;

/// Errors from walking a graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WalkError {
    #[error("cannot walk a graph with no nodes")]
    EmptyGraph,

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(
        "coverage incomplete after {walks} walks: {} node(s) and {} edge(s) never exercised",
        .report.unexercised_nodes.len(),
        .report.untraversed_edges.len()
    )]
    CoverageNotReached { walks: u64, report: CoverageReport },
}

/// Why a walk stopped. Every variant carries the node the walk ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Termination {
    /// The node lost its execution draw and never ran.
    NotSelected(NodeId),
    /// The node's action asked for the walk to end.
    Aborted(NodeId),
    /// The node ran but lost its continuation draw.
    Stopped(NodeId),
    /// The node ran and has no outgoing edges.
    TerminalNode(NodeId),
    /// The walk executed `max_depth` nodes.
    MaxDepth(NodeId),
}

impl Termination {
    pub fn node(self) -> NodeId {
        match self {
            Termination::NotSelected(id)
            | Termination::Aborted(id)
            | Termination::Stopped(id)
            | Termination::TerminalNode(id)
            | Termination::MaxDepth(id) => id,
        }
    }
}

/// Result of a single walk.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkResult {
    pub trace: WalkTrace,
    /// Number of nodes executed.
    pub depth: u64,
    pub termination: Termination,
}

impl WalkResult {
    pub fn executed_nodes(&self) -> Vec<NodeId> {
        self.trace.executed_nodes()
    }

    pub fn traversed_edges(&self) -> Vec<(NodeId, NodeId)> {
        self.trace.traversed_edges()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WalkState {
    SelectingStart,
    Gating,
    Executing,
    ContinuationCheck,
    Advancing,
    Terminated(Termination),
}

/// The walk engine: drives probabilistic walks over a [`WalkGraph`].
///
/// Holds the graph by exclusive borrow for its whole lifetime, so topology
/// cannot change between or during walks; only depth histories grow. All
/// randomness comes from the injected generator, so a seeded generator makes
/// every walk reproducible.
pub struct WalkEngine<'g, R: Rng> {
    graph: &'g mut WalkGraph,
    rng: R,
    walks_completed: u64,
}

impl<'g, R: Rng> WalkEngine<'g, R> {
    pub fn new(graph: &'g mut WalkGraph, rng: R) -> Self {
        Self {
            graph,
            rng,
            walks_completed: 0,
        }
    }

    pub fn graph(&self) -> &WalkGraph {
        &*self.graph
    }

    pub fn walks_completed(&self) -> u64 {
        self.walks_completed
    }

    pub fn into_rng(self) -> R {
        self.rng
    }

    /// Run one walk from start to termination.
    ///
    /// - Start at the configured start node, else a uniformly random node
    /// - Gate: `draw >= chance` ends the walk before the node runs
    /// - Execute: record depths, run the action; `Abort` ends the walk
    /// - Continue: `draw > continue_chance` ends the walk
    /// - Advance: stop on terminal nodes or at `max_depth`, else pick an edge
    pub fn walk(&mut self) -> Result<WalkResult, WalkError> {
        if self.graph.is_empty() {
            return Err(WalkError::EmptyGraph);
        }

        let max_depth = self.graph.max_depth();
        let mut walk_trace = WalkTrace::new();
        let mut depth: u64 = 0;
        let mut previous: Option<NodeId> = None;
        let mut current: NodeId = 0;
        let mut state = WalkState::SelectingStart;

        loop {
            state = match state {
                WalkState::SelectingStart => {
                    current = match self.graph.start() {
                        Some(start) => start,
                        None => self.rng.gen_range(0..self.graph.len()) as NodeId,
                    };
                    WalkState::Gating
                }

                WalkState::Gating => {
                    let chance = self
                        .graph
                        .node(current)
                        .ok_or(GraphError::UnknownNode(current))?
                        .chance();
                    let executed = self.rng.gen::<f64>() < chance;
                    walk_trace.record(WalkStepKind::Gated {
                        node: current,
                        executed,
                    });
                    if !executed {
                        WalkState::Terminated(Termination::NotSelected(current))
                    } else {
                        if let Some(prev) = previous {
                            if let Some(edge_id) = self.graph.edge_between(prev, current) {
                                if let Some(edge) = self.graph.edge_mut(edge_id) {
                                    edge.record_traversal(depth + 1);
                                }
                                walk_trace.record(WalkStepKind::EdgeTaken {
                                    from: prev,
                                    to: current,
                                    depth: depth + 1,
                                });
                            }
                        }
                        depth += 1;
                        if let Some(node) = self.graph.node_mut(current) {
                            node.record_execution(depth);
                        }
                        WalkState::Executing
                    }
                }

                WalkState::Executing => {
                    let node = self
                        .graph
                        .node_mut(current)
                        .ok_or(GraphError::UnknownNode(current))?;
                    let outcome = node.run();
                    trace!(node = node.name(), depth, ?outcome, "executed node");
                    walk_trace.record(WalkStepKind::Executed {
                        node: current,
                        depth,
                        outcome,
                    });
                    match outcome {
                        NodeOutcome::Abort => WalkState::Terminated(Termination::Aborted(current)),
                        NodeOutcome::Continue => WalkState::ContinuationCheck,
                    }
                }

                WalkState::ContinuationCheck => {
                    let continue_chance = self
                        .graph
                        .node(current)
                        .ok_or(GraphError::UnknownNode(current))?
                        .continue_chance();
                    if self.rng.gen::<f64>() > continue_chance {
                        WalkState::Terminated(Termination::Stopped(current))
                    } else {
                        WalkState::Advancing
                    }
                }

                WalkState::Advancing => {
                    if self.graph.is_terminal(current) {
                        WalkState::Terminated(Termination::TerminalNode(current))
                    } else if depth >= max_depth {
                        WalkState::Terminated(Termination::MaxDepth(current))
                    } else {
                        match choose_next(&*self.graph, current, &mut self.rng) {
                            Ok(next) => {
                                previous = Some(current);
                                current = next;
                                WalkState::Gating
                            }
                            Err(SelectError::NoOutgoingEdges(node)) => {
                                WalkState::Terminated(Termination::TerminalNode(node))
                            }
                        }
                    }
                }

                WalkState::Terminated(termination) => {
                    walk_trace.record(WalkStepKind::Terminated(termination));
                    self.walks_completed += 1;
                    debug!(
                        walk = self.walks_completed,
                        depth,
                        ?termination,
                        "walk terminated"
                    );
                    return Ok(WalkResult {
                        trace: walk_trace,
                        depth,
                        termination,
                    });
                }
            };
        }
    }

    /// Run `count` independent walks back to back.
    pub fn walk_many(&mut self, count: usize) -> Result<Vec<WalkResult>, WalkError> {
        (0..count).map(|_| self.walk()).collect()
    }
}
