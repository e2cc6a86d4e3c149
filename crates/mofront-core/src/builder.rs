//! Declarative graph construction.
//!
//! `GraphBuilder` keeps a catalog of nodes and a list of connections written
//! as short port specs. The same catalog can be shared between a graph under
//! test and its expected form: `build_with_edges_only` materializes only the
//! nodes that take part in a connection.
//!
//! # Example
//!
//! ```rust
//! use mofront_core::builder::{parameter, regular_op, result, GraphBuilder};
//! use mofront_core::graph::node::NodeKind;
//!
//! let mut builder = GraphBuilder::new();
//! builder
//!     .node(parameter("input", None))
//!     .node(regular_op("rank", NodeKind::Rank))
//!     .node(result("output"))
//!     .node(regular_op("unused", NodeKind::ShapeOf));
//!
//! builder.connect("input", "rank").unwrap();
//! builder.connect("rank", "0:output").unwrap();
//!
//! let graph = builder.build_with_edges_only().unwrap();
//! assert_eq!(graph.node_count(), 3);
//! assert_eq!(graph.edge_count(), 2);
//! ```

use std::collections::{HashMap, HashSet};

use crate::graph::edge::{Edge, PortRef};
use crate::graph::node::{Node, NodeId, NodeKind};
use crate::graph::{Graph, GraphError};
use crate::types::Tensor;

/// A builder for constructing model graphs from a node catalog.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    catalog: Vec<Node>,
    index: HashMap<NodeId, usize>,
    connections: Vec<(PortRef, PortRef)>,
}

impl GraphBuilder {
    /// Create a new empty graph builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node in the catalog, replacing any entry with the same ID.
    pub fn node(&mut self, node: Node) -> &mut Self {
        match self.index.get(&node.id) {
            Some(&slot) => self.catalog[slot] = node,
            None => {
                self.index.insert(node.id.clone(), self.catalog.len());
                self.catalog.push(node);
            }
        }
        self
    }

    /// Register several nodes.
    pub fn nodes(&mut self, nodes: impl IntoIterator<Item = Node>) -> &mut Self {
        for node in nodes {
            self.node(node);
        }
        self
    }

    /// Record a connection.
    ///
    /// `src` is `"node"` or `"node:out_port"`; `dst` is `"node"` or
    /// `"in_port:node"`. Omitted ports default to 0.
    pub fn connect(&mut self, src: &str, dst: &str) -> Result<&mut Self, GraphError> {
        let source = parse_source_spec(src)?;
        let target = parse_target_spec(dst)?;
        self.connections.push((source, target));
        Ok(self)
    }

    /// Build a graph containing every catalog node.
    pub fn build(&self) -> Result<Graph, GraphError> {
        self.build_filtered(|_| true)
    }

    /// Build a graph containing only nodes referenced by some connection.
    pub fn build_with_edges_only(&self) -> Result<Graph, GraphError> {
        let used: HashSet<&str> = self
            .connections
            .iter()
            .flat_map(|(s, t)| [s.0.as_str(), t.0.as_str()])
            .collect();
        self.build_filtered(|id| used.contains(id))
    }

    fn build_filtered(&self, keep: impl Fn(&str) -> bool) -> Result<Graph, GraphError> {
        let mut graph = Graph::new();
        for node in self.catalog.iter().filter(|n| keep(n.id.as_str())) {
            graph.add_node(node.clone())?;
        }
        for (source, target) in &self.connections {
            for id in [&source.0, &target.0] {
                if !graph.contains_node(id) {
                    return Err(GraphError::NodeNotFound(id.clone()));
                }
            }
            graph.add_edge(Edge::new(source.clone(), target.clone()))?;
        }
        Ok(graph)
    }
}

/// Parse `"node"` or `"node:port"` into an output port reference.
pub fn parse_source_spec(spec: &str) -> Result<PortRef, GraphError> {
    match spec.rsplit_once(':') {
        None => non_empty(spec).map(|id| (id, 0)),
        Some((id, port)) => {
            let port = parse_port(spec, port)?;
            non_empty(id)
                .map(|id| (id, port))
                .map_err(|_| GraphError::InvalidPortSpec(spec.to_string()))
        }
    }
}

/// Parse `"node"` or `"port:node"` into an input port reference.
pub fn parse_target_spec(spec: &str) -> Result<PortRef, GraphError> {
    match spec.split_once(':') {
        None => non_empty(spec).map(|id| (id, 0)),
        Some((port, id)) => {
            let port = parse_port(spec, port)?;
            non_empty(id)
                .map(|id| (id, port))
                .map_err(|_| GraphError::InvalidPortSpec(spec.to_string()))
        }
    }
}

fn parse_port(spec: &str, port: &str) -> Result<usize, GraphError> {
    port.parse::<usize>()
        .map_err(|_| GraphError::InvalidPortSpec(spec.to_string()))
}

fn non_empty(id: &str) -> Result<NodeId, GraphError> {
    if id.is_empty() {
        Err(GraphError::InvalidPortSpec(id.to_string()))
    } else {
        Ok(id.to_string())
    }
}

// === Catalog helpers ===

/// An operation node with no attributes.
pub fn regular_op(id: &str, kind: NodeKind) -> Node {
    Node::new(id, kind)
}

/// A `Const` node holding `value`, typed by the value's element type.
pub fn valued_const(id: &str, value: Tensor) -> Node {
    let element_type = value.element_type;
    Node::new(id, NodeKind::Const)
        .with_output_type(Some(element_type))
        .with_value(value)
}

/// A `Result` node.
pub fn result(id: &str) -> Node {
    Node::new(id, NodeKind::Result)
}

/// A `Parameter` node, optionally with a static shape.
pub fn parameter(id: &str, shape: Option<Vec<usize>>) -> Node {
    let node = Node::new(id, NodeKind::Parameter);
    match shape {
        Some(shape) => node.with_shape(shape),
        None => node,
    }
}
