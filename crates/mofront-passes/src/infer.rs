//! Static shape and value evaluation.
//!
//! Propagates shapes from `Parameter` nodes and values from `Const` nodes
//! through the shape-manipulation ops in topological order. Shape
//! subgraphs fold to constants this way, which is how a rewrite of such a
//! subgraph can be checked against the original.

use std::collections::HashMap;

use thiserror::Error;

use mofront_core::graph::edge::PortRef;
use mofront_core::graph::node::{Node, NodeId, NodeKind};
use mofront_core::graph::{Graph, GraphError};
use mofront_core::types::{ElementType, Tensor, TensorError};

/// Errors raised during evaluation.
#[derive(Debug, Error, PartialEq)]
pub enum InferError {
    #[error("Parameter '{0}' has no static shape")]
    MissingShape(NodeId),

    #[error("input port {port} of '{node}' is not connected")]
    MissingInput { node: NodeId, port: usize },

    #[error("'{node}' needs a constant value on input port {port}")]
    MissingValue { node: NodeId, port: usize },

    #[error("axis {axis} is out of range for rank {rank} at '{node}'")]
    AxisOutOfRange { node: NodeId, axis: i64, rank: usize },

    #[error("cannot squeeze axis {axis} of size {dim} at '{node}'")]
    NonUnitAxis { node: NodeId, axis: usize, dim: usize },

    #[error("no evaluation rule for {kind} node '{node}'")]
    Unsupported { node: NodeId, kind: NodeKind },

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
}

/// What is known about one output port.
#[derive(Debug, Clone, PartialEq)]
pub struct Inferred {
    pub shape: Vec<usize>,
    /// The value, when it can be computed without runtime data.
    pub value: Option<Tensor>,
}

impl Inferred {
    fn shape_only(shape: Vec<usize>) -> Self {
        Self { shape, value: None }
    }

    fn constant(value: Tensor) -> Self {
        Self {
            shape: value.shape.clone(),
            value: Some(value),
        }
    }
}

/// Evaluate every output port of the graph.
///
/// `Result` nodes record their input under their own port 0, so the
/// model outputs can be looked up by `(result_id, 0)`.
pub fn infer_values(graph: &Graph) -> Result<HashMap<PortRef, Inferred>, InferError> {
    let mut known: HashMap<PortRef, Inferred> = HashMap::new();

    for id in graph.topological_sort()? {
        let Some(node) = graph.get_node(&id) else {
            continue;
        };
        let inferred = infer_node(graph, node, &known)?;
        known.insert((id, 0), inferred);
    }

    Ok(known)
}

fn infer_node(
    graph: &Graph,
    node: &Node,
    known: &HashMap<PortRef, Inferred>,
) -> Result<Inferred, InferError> {
    match &node.kind {
        NodeKind::Parameter => node
            .shape
            .clone()
            .map(Inferred::shape_only)
            .ok_or_else(|| InferError::MissingShape(node.id.clone())),
        NodeKind::Const => node
            .value
            .clone()
            .map(Inferred::constant)
            .ok_or_else(|| InferError::MissingValue {
                node: node.id.clone(),
                port: 0,
            }),
        NodeKind::Result => input(graph, known, node, 0).cloned(),
        NodeKind::ShapeOf => {
            let data = input(graph, known, node, 0)?;
            let output_type = node.output_type.unwrap_or(ElementType::I64);
            Ok(Inferred::constant(Tensor::from_shape(&data.shape, output_type)))
        }
        NodeKind::Rank => {
            let data = input(graph, known, node, 0)?;
            let output_type = node.output_type.unwrap_or(ElementType::I64);
            let rank = Tensor::from_shape(&[data.shape.len()], output_type).reshaped(Vec::new())?;
            Ok(Inferred::constant(rank))
        }
        NodeKind::Squeeze => infer_squeeze(graph, node, known),
        NodeKind::Other(_) => Err(InferError::Unsupported {
            node: node.id.clone(),
            kind: node.kind.clone(),
        }),
    }
}

fn infer_squeeze(
    graph: &Graph,
    node: &Node,
    known: &HashMap<PortRef, Inferred>,
) -> Result<Inferred, InferError> {
    let data = input(graph, known, node, 0)?;
    let rank = data.shape.len();

    let axes: Vec<usize> = if graph.in_edge(&node.id, 1).is_some() {
        let axes = input(graph, known, node, 1)?
            .value
            .as_ref()
            .and_then(|v| v.as_int_slice())
            .ok_or_else(|| InferError::MissingValue {
                node: node.id.clone(),
                port: 1,
            })?;
        axes.iter()
            .map(|&axis| normalize_axis(&node.id, axis, rank))
            .collect::<Result<_, _>>()?
    } else {
        (0..rank).filter(|&i| data.shape[i] == 1).collect()
    };

    for &axis in &axes {
        if data.shape[axis] != 1 {
            return Err(InferError::NonUnitAxis {
                node: node.id.clone(),
                axis,
                dim: data.shape[axis],
            });
        }
    }

    let shape: Vec<usize> = data
        .shape
        .iter()
        .enumerate()
        .filter(|(i, _)| !axes.contains(i))
        .map(|(_, &d)| d)
        .collect();
    let value = match &data.value {
        Some(v) => Some(v.reshaped(shape.clone())?),
        None => None,
    };
    Ok(Inferred { shape, value })
}

fn normalize_axis(node: &NodeId, axis: i64, rank: usize) -> Result<usize, InferError> {
    let signed_rank = rank as i64;
    let normalized = if axis < 0 { axis + signed_rank } else { axis };
    if normalized < 0 || normalized >= signed_rank {
        return Err(InferError::AxisOutOfRange {
            node: node.clone(),
            axis,
            rank,
        });
    }
    Ok(normalized as usize)
}

fn input<'a>(
    graph: &Graph,
    known: &'a HashMap<PortRef, Inferred>,
    node: &Node,
    port: usize,
) -> Result<&'a Inferred, InferError> {
    graph
        .producer(&node.id, port)
        .and_then(|source| known.get(source))
        .ok_or_else(|| InferError::MissingInput {
            node: node.id.clone(),
            port,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mofront_core::builder::{parameter, regular_op, result, valued_const, GraphBuilder};

    fn output_of(g: &Graph) -> Inferred {
        infer_values(g).unwrap()[&("output".to_string(), 0)].clone()
    }

    #[test]
    fn rank_of_parameter() {
        let mut b = GraphBuilder::new();
        b.node(parameter("input", Some(vec![1, 3, 224, 224])))
            .node(regular_op("rank", NodeKind::Rank).with_output_type(Some(ElementType::I32)))
            .node(result("output"));
        b.connect("input", "rank").unwrap();
        b.connect("rank", "output").unwrap();
        let out = output_of(&b.build().unwrap());

        assert!(out.shape.is_empty());
        let value = out.value.unwrap();
        assert_eq!(value.element_type, ElementType::I32);
        assert_eq!(value.as_int_slice(), Some(&[4][..]));
    }

    #[test]
    fn shape_of_shape_then_squeeze() {
        let mut b = GraphBuilder::new();
        b.node(parameter("input", Some(vec![2, 5])))
            .node(regular_op("shape", NodeKind::ShapeOf))
            .node(regular_op("len", NodeKind::ShapeOf))
            .node(valued_const("zero", Tensor::int64_scalar(0)))
            .node(regular_op("squeeze", NodeKind::Squeeze))
            .node(result("output"));
        b.connect("input", "shape").unwrap();
        b.connect("shape", "len").unwrap();
        b.connect("len", "0:squeeze").unwrap();
        b.connect("zero", "1:squeeze").unwrap();
        b.connect("squeeze", "output").unwrap();
        let out = output_of(&b.build().unwrap());

        assert!(out.shape.is_empty());
        assert_eq!(out.value.unwrap().as_int_slice(), Some(&[2][..]));
    }

    #[test]
    fn squeeze_without_axes_drops_unit_dims() {
        let mut b = GraphBuilder::new();
        b.node(parameter("input", Some(vec![1, 4, 1])))
            .node(regular_op("squeeze", NodeKind::Squeeze))
            .node(result("output"));
        b.connect("input", "squeeze").unwrap();
        b.connect("squeeze", "output").unwrap();
        let out = output_of(&b.build().unwrap());
        assert_eq!(out.shape, vec![4]);
        assert!(out.value.is_none());
    }

    #[test]
    fn squeeze_negative_axis() {
        let mut b = GraphBuilder::new();
        b.node(parameter("input", Some(vec![3, 1])))
            .node(valued_const("axis", Tensor::int64_array(&[-1])))
            .node(regular_op("squeeze", NodeKind::Squeeze))
            .node(result("output"));
        b.connect("input", "0:squeeze").unwrap();
        b.connect("axis", "1:squeeze").unwrap();
        b.connect("squeeze", "output").unwrap();
        assert_eq!(output_of(&b.build().unwrap()).shape, vec![3]);
    }

    #[test]
    fn squeeze_non_unit_axis_fails() {
        let mut b = GraphBuilder::new();
        b.node(parameter("input", Some(vec![3, 2])))
            .node(valued_const("axis", Tensor::int64_scalar(0)))
            .node(regular_op("squeeze", NodeKind::Squeeze))
            .node(result("output"));
        b.connect("input", "0:squeeze").unwrap();
        b.connect("axis", "1:squeeze").unwrap();
        b.connect("squeeze", "output").unwrap();
        assert_eq!(
            infer_values(&b.build().unwrap()).unwrap_err(),
            InferError::NonUnitAxis {
                node: "squeeze".into(),
                axis: 0,
                dim: 3
            }
        );
    }

    #[test]
    fn squeeze_axis_out_of_range() {
        let mut b = GraphBuilder::new();
        b.node(parameter("input", Some(vec![1])))
            .node(valued_const("axis", Tensor::int64_scalar(2)))
            .node(regular_op("squeeze", NodeKind::Squeeze))
            .node(result("output"));
        b.connect("input", "0:squeeze").unwrap();
        b.connect("axis", "1:squeeze").unwrap();
        b.connect("squeeze", "output").unwrap();
        assert!(matches!(
            infer_values(&b.build().unwrap()),
            Err(InferError::AxisOutOfRange { axis: 2, rank: 1, .. })
        ));
    }

    #[test]
    fn parameter_without_shape_fails() {
        let mut b = GraphBuilder::new();
        b.node(parameter("input", None)).node(result("output"));
        b.connect("input", "output").unwrap();
        assert_eq!(
            infer_values(&b.build().unwrap()).unwrap_err(),
            InferError::MissingShape("input".into())
        );
    }

    #[test]
    fn unknown_kind_fails() {
        let mut b = GraphBuilder::new();
        b.node(parameter("input", Some(vec![2])))
            .node(regular_op("relu", NodeKind::Other("ReLU".into())))
            .node(result("output"));
        b.connect("input", "relu").unwrap();
        b.connect("relu", "output").unwrap();
        assert!(matches!(
            infer_values(&b.build().unwrap()),
            Err(InferError::Unsupported { .. })
        ));
    }
}
