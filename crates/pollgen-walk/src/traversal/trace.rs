use pollgen_graph::{NodeId, NodeOutcome};

use super::engine::Termination;

/// A single step of a walk, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkStep {
    /// Step number (monotonic within the walk).
    pub step_number: u64,
    pub kind: WalkStepKind,
}

/// The kind of walk step taken.
#[derive(Debug, Clone, PartialEq)]
pub enum WalkStepKind {
    /// The node was reached and drew for execution; `executed` is false
    /// when it lost the draw.
    Gated { node: NodeId, executed: bool },
    /// An edge was taken into a node that then executed.
    EdgeTaken {
        from: NodeId,
        to: NodeId,
        depth: u64,
    },
    /// The node's action ran at `depth`.
    Executed {
        node: NodeId,
        depth: u64,
        outcome: NodeOutcome,
    },
    /// The walk ended.
    Terminated(Termination),
}

/// Ordered record of one walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkTrace {
    steps: Vec<WalkStep>,
    next_step: u64,
}

impl WalkTrace {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            next_step: 0,
        }
    }

    pub fn record(&mut self, kind: WalkStepKind) {
        self.steps.push(WalkStep {
            step_number: self.next_step,
            kind,
        });
        self.next_step += 1;
    }

    pub fn steps(&self) -> &[WalkStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Nodes whose actions ran, in execution order.
    pub fn executed_nodes(&self) -> Vec<NodeId> {
        self.steps
            .iter()
            .filter_map(|step| match step.kind {
                WalkStepKind::Executed { node, .. } => Some(node),
                _ => None,
            })
            .collect()
    }

    /// Edges whose targets executed, in traversal order.
    pub fn traversed_edges(&self) -> Vec<(NodeId, NodeId)> {
        self.steps
            .iter()
            .filter_map(|step| match step.kind {
                WalkStepKind::EdgeTaken { from, to, .. } => Some((from, to)),
                _ => None,
            })
            .collect()
    }
}
