/// What a node action tells the walk engine after it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    /// Keep going: continuation check, then advance along an edge.
    Continue,
    /// End the walk right here, skipping the continuation check.
    Abort,
}

impl NodeOutcome {
    /// Legacy integer return value that means "abort the walk".
    pub const ABORT_CODE: i64 = -1;

    /// Map an integer status code onto an outcome. Only `-1` aborts.
    pub fn from_code(code: i64) -> Self {
        if code == Self::ABORT_CODE {
            NodeOutcome::Abort
        } else {
            NodeOutcome::Continue
        }
    }

    pub fn is_abort(self) -> bool {
        self == NodeOutcome::Abort
    }
}

/// An executable step of the interaction graph.
///
/// Actions are opaque to the engine. They usually append interaction records
/// (writes, reads, comments) to a document builder the caller holds, but the
/// engine never looks at those side effects.
pub trait NodeAction {
    fn run(&mut self) -> NodeOutcome;
}

impl<F> NodeAction for F
where
    F: FnMut() -> NodeOutcome,
{
    fn run(&mut self) -> NodeOutcome {
        self()
    }
}

/// Action that does nothing and always continues.
/// Handy for modelling graph shape without a target program.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAction;

impl NodeAction for NoopAction {
    fn run(&mut self) -> NodeOutcome {
        NodeOutcome::Continue
    }
}
