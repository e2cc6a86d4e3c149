//! Helpers that insert IR operations into a graph.
//!
//! Node IDs are derived from the requested name and made unique within the
//! graph; the name itself is stored unchanged.

use mofront_core::graph::edge::PortRef;
use mofront_core::graph::node::{Node, NodeId, NodeKind};
use mofront_core::graph::{Graph, GraphError};
use mofront_core::types::{ElementType, Tensor};

/// Insert a node built from `kind` and `name`.
pub fn create_op(graph: &mut Graph, kind: NodeKind, name: &str) -> Result<NodeId, GraphError> {
    let id = graph.unique_id(name);
    graph.add_node(Node::new(id, kind).with_name(name))
}

/// Insert a `ShapeOf` producing `output_type`.
pub fn create_shape_of(
    graph: &mut Graph,
    name: &str,
    output_type: ElementType,
) -> Result<NodeId, GraphError> {
    let id = graph.unique_id(name);
    let node = Node::new(id, NodeKind::ShapeOf)
        .with_name(name)
        .with_output_type(Some(output_type));
    graph.add_node(node)
}

/// Insert a `Const` holding `value`.
pub fn create_const(graph: &mut Graph, name: &str, value: Tensor) -> Result<NodeId, GraphError> {
    let id = graph.unique_id(name);
    let node = Node::new(id, NodeKind::Const)
        .with_name(name)
        .with_output_type(Some(value.element_type))
        .with_value(value);
    graph.add_node(node)
}

/// Insert an op whose second input is a constant.
///
/// The constant is named `{name}/axis` and feeds input port 1. When
/// `first_input` is given it is connected to input port 0.
pub fn create_op_with_second_input(
    graph: &mut Graph,
    kind: NodeKind,
    second_input: Tensor,
    name: &str,
    first_input: Option<PortRef>,
) -> Result<NodeId, GraphError> {
    let op = create_op(graph, kind, name)?;
    let constant = create_const(graph, &format!("{name}/axis"), second_input)?;
    graph.connect((constant, 0), (op.clone(), 1))?;
    if let Some(source) = first_input {
        graph.connect(source, (op.clone(), 0))?;
    }
    Ok(op)
}
