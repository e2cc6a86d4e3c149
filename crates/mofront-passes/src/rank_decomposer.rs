//! Decomposition of `Rank` into IR shape operations.
//!
//! The IR has no `Rank` op. The rank of a tensor is the length of its shape,
//! so a `Rank` node is rewritten as
//!
//! ```text
//! x -> ShapeOf -> ShapeOf -> Squeeze(axis = 0) -> consumers
//! ```
//!
//! The inner `ShapeOf` yields the 1-D shape of `x`, the outer one its
//! 1-element length, and `Squeeze` turns that into a scalar. The final
//! `Squeeze` inherits the original node's name.

use mofront_core::graph::node::{Node, NodeId, NodeKind};
use mofront_core::graph::{Graph, GraphError};
use mofront_core::types::{ElementType, Tensor};

use crate::error::TransformError;
use crate::ops::{create_op_with_second_input, create_shape_of};
use crate::transform::{
    replace_matching_ops, FrontReplacementOp, FrontReplacementPattern, TransformStats,
};

/// Replaces every `Rank` node with `ShapeOf -> ShapeOf -> Squeeze`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RankDecomposer;

impl FrontReplacementOp for RankDecomposer {
    fn op(&self) -> NodeKind {
        NodeKind::Rank
    }

    fn check(&self, graph: &Graph, node: &Node) -> Result<(), TransformError> {
        checked_output_type(graph, node).map(|_| ())
    }

    fn replace_op(
        &self,
        graph: &mut Graph,
        node_id: &NodeId,
    ) -> Result<TransformStats, TransformError> {
        let node = graph
            .get_node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
        let output_type = checked_output_type(graph, node)?;
        let name = node.soft_name().to_string();
        let consumers = graph.out_edges(node_id, 0).len();

        let shape_of = create_shape_of(graph, &format!("{name}/shape_of"), output_type)?;
        let rank_1d = create_shape_of(graph, &format!("{name}/rank_of"), output_type)?;
        graph.connect((shape_of.clone(), 0), (rank_1d.clone(), 0))?;
        let rank_0d = create_op_with_second_input(
            graph,
            NodeKind::Squeeze,
            Tensor::int64_scalar(0),
            &format!("{name}/0d_rank_of"),
            Some((rank_1d, 0)),
        )?;

        graph.set_source(&(node_id.clone(), 0), (rank_0d.clone(), 0))?;
        graph.set_destination(&(node_id.clone(), 0), (shape_of, 0))?;
        graph.remove_node(node_id)?;
        graph.rename_nodes(&[(rank_0d.clone(), name.clone())])?;

        log::debug!(
            "RankDecomposer: replaced Rank '{}' ({}) with ShapeOf->ShapeOf->Squeeze '{}'",
            name,
            output_type,
            rank_0d,
        );

        // ShapeOf, ShapeOf, Const axis, Squeeze; three internal edges plus
        // the moved input and consumer edges
        Ok(TransformStats {
            matches: 1,
            nodes_added: 4,
            nodes_removed: 1,
            edges_added: 4 + consumers,
            edges_removed: 1 + consumers,
        })
    }
}

/// The Rank's output type, once the node is known to be decomposable.
fn checked_output_type(graph: &Graph, node: &Node) -> Result<ElementType, TransformError> {
    let output_type = node
        .output_type
        .ok_or_else(|| TransformError::MissingAttribute {
            node: node.soft_name().to_string(),
            kind: node.kind.clone(),
            attribute: "output_type",
        })?;
    if !output_type.is_index_type() {
        return Err(TransformError::UnsupportedOutputType {
            node: node.soft_name().to_string(),
            kind: node.kind.clone(),
            output_type,
        });
    }
    if graph.in_edge(&node.id, 0).is_none() {
        return Err(TransformError::Disconnected {
            node: node.soft_name().to_string(),
            port: 0,
        });
    }
    Ok(output_type)
}

impl FrontReplacementPattern for RankDecomposer {
    fn name(&self) -> &str {
        "RankDecomposer"
    }

    fn find_and_replace_pattern(&self, graph: &mut Graph) -> Result<TransformStats, TransformError> {
        let stats = replace_matching_ops(self, graph)?;
        if stats.matches > 0 {
            log::info!("RankDecomposer: decomposed {} Rank node(s)", stats.matches);
        }
        Ok(stats)
    }
}
