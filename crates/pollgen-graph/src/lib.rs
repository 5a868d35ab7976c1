pub mod action;
pub mod error;
pub mod graph;

pub use action::{NodeAction, NodeOutcome, NoopAction};
pub use error::GraphError;
pub use graph::{Edge, EdgeId, Node, NodeId, NodeOptions, WalkGraph, DEFAULT_MAX_DEPTH};
