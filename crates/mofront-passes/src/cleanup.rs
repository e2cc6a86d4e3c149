//! Dead-node elimination after the replacement passes.

use mofront_core::graph::node::{NodeId, NodeKind};
use mofront_core::graph::{Graph, GraphError};

use crate::transform::TransformStats;

/// Remove nodes that do not feed any `Result` node.
///
/// A graph without `Result` nodes is left unchanged, since every node
/// would otherwise count as dead.
pub fn eliminate_dead_nodes(graph: &mut Graph) -> Result<TransformStats, GraphError> {
    let outputs: Vec<NodeId> = graph
        .op_nodes(&NodeKind::Result)
        .into_iter()
        .map(|n| n.id.clone())
        .collect();
    if outputs.is_empty() {
        return Ok(TransformStats::default());
    }

    let live = graph.reachable_to(&outputs);
    let mut dead: Vec<NodeId> = graph
        .nodes()
        .filter(|n| !live.contains(&n.id))
        .map(|n| n.id.clone())
        .collect();
    dead.sort_unstable();

    let mut stats = TransformStats::default();
    for id in &dead {
        let edges = graph.incoming_edges(id).len() + graph.outgoing_edges(id).len();
        let node = graph.remove_node(id)?;
        log::debug!("Cleanup: removing dead node {}", node);
        stats.nodes_removed += 1;
        stats.edges_removed += edges;
    }

    if !dead.is_empty() {
        log::info!("Cleanup: removed {} dead node(s)", dead.len());
    }
    Ok(stats)
}
