pub mod export;
pub mod stats;
pub mod traversal;

pub use pollgen_graph as graph;
