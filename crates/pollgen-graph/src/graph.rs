use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{NodeAction, NodeOutcome};
use crate::error::GraphError;

pub type NodeId = u32;
pub type EdgeId = u32;

/// Effectively unbounded walk depth.
pub const DEFAULT_MAX_DEPTH: u64 = 0xFFFFF;

/// Per-node probabilities supplied at registration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOptions {
    /// Probability the node executes when a walk reaches it.
    pub chance: f64,
    /// Probability the walk carries on after the node executes.
    pub continue_chance: f64,
}

impl NodeOptions {
    pub fn chance(mut self, chance: f64) -> Self {
        self.chance = chance;
        self
    }

    pub fn continue_chance(mut self, continue_chance: f64) -> Self {
        self.continue_chance = continue_chance;
        self
    }
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            chance: 1.0,
            continue_chance: 1.0,
        }
    }
}

/// A registered step: name, probabilities, action, and the depths it ran at.
pub struct Node {
    name: String,
    chance: f64,
    continue_chance: f64,
    action: Box<dyn NodeAction>,
    execution_depths: Vec<u64>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chance(&self) -> f64 {
        self.chance
    }

    pub fn continue_chance(&self) -> f64 {
        self.continue_chance
    }

    /// Depths at which this node executed, across all walks, in order.
    pub fn execution_depths(&self) -> &[u64] {
        &self.execution_depths
    }

    /// Invoke the node's action.
    pub fn run(&mut self) -> NodeOutcome {
        self.action.run()
    }

    pub fn record_execution(&mut self, depth: u64) {
        self.execution_depths.push(depth);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("chance", &self.chance)
            .field("continue_chance", &self.continue_chance)
            .field("execution_depths", &self.execution_depths)
            .finish_non_exhaustive()
    }
}

/// A directed, weighted edge between two registered nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    source: NodeId,
    target: NodeId,
    weight: f64,
    traversal_depths: Vec<u64>,
}

impl Edge {
    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Depths at which this edge was taken, across all walks, in order.
    pub fn traversal_depths(&self) -> &[u64] {
        &self.traversal_depths
    }

    pub fn record_traversal(&mut self, depth: u64) {
        self.traversal_depths.push(depth);
    }
}

/// The interaction graph: nodes, weighted edges, optional start node and
/// the per-walk depth bound.
///
/// Topology is built once up front. Walks only ever append to the depth
/// histories, so the same graph can be walked many times and its statistics
/// accumulate until [`WalkGraph::reset_history`] is called.
pub struct WalkGraph {
    nodes: Vec<Node>,
    names: HashMap<String, NodeId>,
    edges: Vec<Edge>,
    /// source -> (target -> edge)
    adjacency: Vec<BTreeMap<NodeId, EdgeId>>,
    start: Option<NodeId>,
    max_depth: u64,
}

impl WalkGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            names: HashMap::new(),
            edges: Vec::new(),
            adjacency: Vec::new(),
            start: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Register a node that always executes and always continues.
    pub fn add_node<A>(&mut self, name: &str, action: A) -> Result<NodeId, GraphError>
    where
        A: NodeAction + 'static,
    {
        self.add_node_with(name, action, NodeOptions::default())
    }

    /// Register a node with explicit execution and continuation probabilities.
    pub fn add_node_with<A>(
        &mut self,
        name: &str,
        action: A,
        options: NodeOptions,
    ) -> Result<NodeId, GraphError>
    where
        A: NodeAction + 'static,
    {
        if name.is_empty() {
            return Err(GraphError::InvalidArgument(
                "node name must not be empty".to_string(),
            ));
        }
        check_probability("chance", options.chance)?;
        check_probability("continue_chance", options.continue_chance)?;
        if self.names.contains_key(name) {
            return Err(GraphError::InvalidArgument(format!(
                "node '{name}' is already registered"
            )));
        }

        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            name: name.to_string(),
            chance: options.chance,
            continue_chance: options.continue_chance,
            action: Box::new(action),
            execution_depths: Vec::new(),
        });
        self.names.insert(name.to_string(), id);
        self.adjacency.push(BTreeMap::new());

        debug!(
            node = name,
            id,
            chance = options.chance,
            continue_chance = options.continue_chance,
            "registered node"
        );
        Ok(id)
    }

    /// Register an edge with weight 1.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<EdgeId, GraphError> {
        self.add_weighted_edge(from, to, 1.0)
    }

    pub fn add_weighted_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        weight: f64,
    ) -> Result<EdgeId, GraphError> {
        self.check_node(from)?;
        self.check_node(to)?;
        if !(weight.is_finite() && weight > 0.0) {
            return Err(GraphError::InvalidArgument(format!(
                "edge weight must be a positive number, got {weight}"
            )));
        }
        if self.adjacency[from as usize].contains_key(&to) {
            return Err(GraphError::DuplicateEdge {
                from: self.nodes[from as usize].name.clone(),
                to: self.nodes[to as usize].name.clone(),
            });
        }

        let id = self.edges.len() as EdgeId;
        self.edges.push(Edge {
            source: from,
            target: to,
            weight,
            traversal_depths: Vec::new(),
        });
        self.adjacency[from as usize].insert(to, id);

        debug!(
            from = %self.nodes[from as usize].name,
            to = %self.nodes[to as usize].name,
            weight,
            "registered edge"
        );
        Ok(id)
    }

    pub fn set_start(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.check_node(id)?;
        self.start = Some(id);
        Ok(())
    }

    pub fn clear_start(&mut self) {
        self.start = None;
    }

    pub fn start(&self) -> Option<NodeId> {
        self.start
    }

    /// Bound the number of nodes a single walk may execute.
    pub fn set_max_depth(&mut self, max_depth: u64) -> Result<(), GraphError> {
        if max_depth == 0 {
            return Err(GraphError::InvalidArgument(
                "max_depth must be at least 1".to_string(),
            ));
        }
        self.max_depth = max_depth;
        Ok(())
    }

    pub fn max_depth(&self) -> u64 {
        self.max_depth
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Mutable access for the walk engine. Only the action and the depth
    /// history are reachable through a `Node`, never its topology.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id as usize)
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id as usize)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id as usize)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.adjacency
            .get(from as usize)
            .and_then(|targets| targets.get(&to).copied())
    }

    /// Outgoing edges of `from`, ordered by target id.
    pub fn outgoing(&self, from: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.adjacency
            .get(from as usize)
            .into_iter()
            .flat_map(|targets| targets.values())
            .map(move |&edge_id| &self.edges[edge_id as usize])
    }

    /// A node with no outgoing edges.
    pub fn is_terminal(&self, id: NodeId) -> bool {
        self.adjacency
            .get(id as usize)
            .map_or(true, |targets| targets.is_empty())
    }

    /// Display label for an edge, `source->target`.
    pub fn edge_label(&self, edge: &Edge) -> String {
        format!(
            "{}->{}",
            self.nodes[edge.source as usize].name, self.nodes[edge.target as usize].name
        )
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Forget all recorded depths; topology, start and max depth are kept.
    pub fn reset_history(&mut self) {
        for node in &mut self.nodes {
            node.execution_depths.clear();
        }
        for edge in &mut self.edges {
            edge.traversal_depths.clear();
        }
        debug!(nodes = self.nodes.len(), edges = self.edges.len(), "reset depth history");
    }

    fn check_node(&self, id: NodeId) -> Result<(), GraphError> {
        if (id as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }
}

impl Default for WalkGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WalkGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkGraph")
            .field("nodes", &self.nodes)
            .field("edges", &self.edges)
            .field("start", &self.start)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

fn check_probability(field: &str, value: f64) -> Result<(), GraphError> {
    // NaN fails the lower bound comparison.
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(GraphError::InvalidArgument(format!(
            "{field} must be in (0.0, 1.0], got {value}"
        )))
    }
}
