//! Node types and the Node struct.
//!
//! A node is a single operation in a model graph.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ElementType, Tensor};

/// Graph-unique node identifier.
pub type NodeId = String;

/// The operation a node performs.
///
/// `Rank` is a framework-level operation with no IR counterpart; the front
/// phase must replace it. `Other` carries kinds the front phase does not
/// interpret and passes through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Parameter,
    Result,
    Const,
    Rank,
    ShapeOf,
    Squeeze,
    Other(String),
}

impl NodeKind {
    /// Whether this kind exists in the target IR operation set.
    pub fn is_ir_op(&self) -> bool {
        !matches!(self, NodeKind::Rank | NodeKind::Other(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Parameter => write!(f, "Parameter"),
            NodeKind::Result => write!(f, "Result"),
            NodeKind::Const => write!(f, "Const"),
            NodeKind::Rank => write!(f, "Rank"),
            NodeKind::ShapeOf => write!(f, "ShapeOf"),
            NodeKind::Squeeze => write!(f, "Squeeze"),
            NodeKind::Other(name) => write!(f, "{name}"),
        }
    }
}

/// An operation node with its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Human-readable name, carried into the produced IR.
    #[serde(default)]
    pub name: Option<String>,
    /// Element type of the node's output, when the op lets it be chosen.
    #[serde(default)]
    pub output_type: Option<ElementType>,
    /// Constant payload for `Const` nodes.
    #[serde(default)]
    pub value: Option<Tensor>,
    /// Static shape of a `Parameter`.
    #[serde(default)]
    pub shape: Option<Vec<usize>>,
    /// Remaining op-specific attributes.
    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

impl Node {
    /// Create a node with no attributes.
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            output_type: None,
            value: None,
            shape: None,
            attrs: BTreeMap::new(),
        }
    }

    /// Set the human-readable name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set or clear the output element type.
    pub fn with_output_type(mut self, output_type: Option<ElementType>) -> Self {
        self.output_type = output_type;
        self
    }

    /// Attach a constant value.
    pub fn with_value(mut self, value: Tensor) -> Self {
        self.value = Some(value);
        self
    }

    /// Attach a static shape.
    pub fn with_shape(mut self, shape: Vec<usize>) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Set a free-form attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// The node's name, falling back to its id.
    pub fn soft_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.soft_name())
    }
}
