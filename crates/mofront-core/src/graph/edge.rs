//! Edge types: port-indexed data dependencies between nodes.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::node::NodeId;

/// Unique edge identifier.
pub type EdgeId = Uuid;

/// A reference to a specific port on a node: (node_id, port_index).
pub type PortRef = (NodeId, usize);

/// A data edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Producer node and its output port.
    pub source: PortRef,
    /// Consumer node and its input port.
    pub target: PortRef,
}

impl Edge {
    /// Create a new edge with a random UUID.
    pub fn new(source: PortRef, target: PortRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            target,
        }
    }

    /// Create an edge with a specific ID.
    pub fn with_id(id: EdgeId, source: PortRef, target: PortRef) -> Self {
        Self { id, source, target }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Edge({} port {} -> {} port {})",
            self.source.0, self.source.1, self.target.0, self.target.1,
        )
    }
}
