use pollgen_graph::{NodeId, WalkGraph};
use rand::Rng;

/// Why no next node could be chosen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    /// Normal end of a walk; the engine turns this into a termination.
    #[error("node {0} has no outgoing edges")]
    NoOutgoingEdges(NodeId),
}

struct Candidate<'g> {
    name: &'g str,
    target: NodeId,
    weight: f64,
}

/// Outgoing candidates of `source`, ordered by target name so a seeded
/// generator always walks them in the same order.
fn candidates(graph: &WalkGraph, source: NodeId) -> Vec<Candidate<'_>> {
    let mut candidates: Vec<Candidate<'_>> = graph
        .outgoing(source)
        .filter_map(|edge| {
            graph.node(edge.target()).map(|node| Candidate {
                name: node.name(),
                target: edge.target(),
                weight: edge.weight(),
            })
        })
        .collect();
    candidates.sort_by(|a, b| a.name.cmp(b.name));
    candidates
}

/// Divisor applied to every weight before summing. Weights are finite, but
/// their sum can overflow to infinity; scaling by the largest weight keeps
/// the total at most the candidate count.
fn weight_scale(candidates: &[Candidate<'_>]) -> f64 {
    let total: f64 = candidates.iter().map(|c| c.weight).sum();
    if total.is_finite() {
        1.0
    } else {
        candidates.iter().map(|c| c.weight).fold(0.0, f64::max)
    }
}

/// Pick the next node with probability proportional to edge weight.
pub fn choose_next<R: Rng>(
    graph: &WalkGraph,
    source: NodeId,
    rng: &mut R,
) -> Result<NodeId, SelectError> {
    let candidates = candidates(graph, source);
    let Some(last) = candidates.last() else {
        return Err(SelectError::NoOutgoingEdges(source));
    };

    let scale = weight_scale(&candidates);
    let total: f64 = candidates.iter().map(|c| c.weight / scale).sum();
    let mut roll: f64 = rng.gen::<f64>() * total;
    for candidate in &candidates {
        roll -= candidate.weight / scale;
        if roll <= 0.0 {
            return Ok(candidate.target);
        }
    }

    // Rounding can leave a sliver of remainder after the last weight.
    Ok(last.target)
}

/// Selection probability of each outgoing target, in selection order.
pub fn edge_probabilities(graph: &WalkGraph, source: NodeId) -> Vec<(NodeId, f64)> {
    let candidates = candidates(graph, source);
    let scale = weight_scale(&candidates);
    let total: f64 = candidates.iter().map(|c| c.weight / scale).sum();
    candidates
        .iter()
        .map(|c| (c.target, c.weight / scale / total))
        .collect()
}
