use crate::graph::NodeId;

/// Structural errors raised while registering nodes and edges.
///
/// Every variant is raised synchronously by the registering call and leaves the
/// graph exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown node id {0}")]
    UnknownNode(NodeId),

    #[error("edge '{from}' -> '{to}' already exists")]
    DuplicateEdge { from: String, to: String },
}
