//! Core data structures for the mofront model optimizer.
//!
//! A model is an attributed operation graph: nodes carry an operation kind
//! and attributes, edges connect an output port of one node to an input
//! port of another. The front phase of the optimizer rewrites this graph in
//! place.

pub mod builder;
pub mod compare;
pub mod graph;
pub mod hash;
pub mod types;

pub use builder::GraphBuilder;
pub use compare::{compare_graphs, CompareOptions, GraphMismatch};
pub use graph::edge::{Edge, EdgeId, PortRef};
pub use graph::node::{Node, NodeId, NodeKind};
pub use graph::{Graph, GraphError};
pub use types::{ElementType, Tensor, TensorData};
