//! Front-phase errors.

use mofront_core::graph::node::NodeKind;
use mofront_core::graph::GraphError;
use mofront_core::types::ElementType;
use thiserror::Error;

/// Errors that can occur while running front-phase passes.
#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("{kind} node '{node}' is missing required attribute `{attribute}`")]
    MissingAttribute {
        node: String,
        kind: NodeKind,
        attribute: &'static str,
    },

    #[error("{kind} node '{node}' has output type {output_type}, expected i32 or i64")]
    UnsupportedOutputType {
        node: String,
        kind: NodeKind,
        output_type: ElementType,
    },

    #[error("input port {port} of node '{node}' is not connected")]
    Disconnected { node: String, port: usize },

    #[error("input graph is malformed: {}", join_errors(.errors))]
    InvalidGraph { errors: Vec<GraphError> },

    #[error("unknown transform: {0}")]
    UnknownTransform(String),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

fn join_errors(errors: &[GraphError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
