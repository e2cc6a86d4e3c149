//! Structural comparison of two graphs.
//!
//! Both graphs are walked backwards from a common output node in lock-step.
//! Producers are paired by input port, so two graphs compare equal when the
//! subgraphs feeding that output have the same shape and the same operation
//! attributes, regardless of node IDs or names.

use std::collections::{HashMap, VecDeque};

use thiserror::Error;

use crate::graph::node::{Node, NodeId, NodeKind};
use crate::graph::Graph;

/// Options controlling which node properties are compared.
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Compare `output_type`, `shape`, and free-form attributes.
    pub check_op_attrs: bool,
    /// Free-form attributes never compared.
    pub ignored_attrs: Vec<String>,
}

impl CompareOptions {
    /// Compare operation attributes as well as structure.
    pub fn with_op_attrs() -> Self {
        Self {
            check_op_attrs: true,
            ignored_attrs: Vec::new(),
        }
    }

    /// Skip a free-form attribute.
    pub fn ignore(mut self, attr: impl Into<String>) -> Self {
        self.ignored_attrs.push(attr.into());
        self
    }
}

/// Every difference found between two graphs.
#[derive(Debug, Error)]
#[error("graphs differ:\n  {}", .differences.join("\n  "))]
pub struct GraphMismatch {
    pub differences: Vec<String>,
}

/// Compare `graph` against `graph_ref`, starting from `last_node` in both.
///
/// `name` and `id` never take part in the comparison. `Const` values are
/// always compared.
pub fn compare_graphs(
    graph: &Graph,
    graph_ref: &Graph,
    last_node: &str,
    options: &CompareOptions,
) -> Result<(), GraphMismatch> {
    let mut differences = Vec::new();

    for (label, g) in [("graph", graph), ("reference graph", graph_ref)] {
        if !g.contains_node(last_node) {
            differences.push(format!("{label} has no node '{last_node}'"));
        }
    }
    if !differences.is_empty() {
        return Err(GraphMismatch { differences });
    }

    let mut forward: HashMap<NodeId, NodeId> = HashMap::new();
    let mut backward: HashMap<NodeId, NodeId> = HashMap::new();
    let mut queue: VecDeque<(NodeId, NodeId)> = VecDeque::new();

    forward.insert(last_node.to_string(), last_node.to_string());
    backward.insert(last_node.to_string(), last_node.to_string());
    queue.push_back((last_node.to_string(), last_node.to_string()));

    while let Some((id, ref_id)) = queue.pop_front() {
        let (Some(node), Some(ref_node)) = (graph.get_node(&id), graph_ref.get_node(&ref_id))
        else {
            continue;
        };
        compare_nodes(node, ref_node, options, &mut differences);

        let consumers = graph.outgoing_edges(&id).len();
        let ref_consumers = graph_ref.outgoing_edges(&ref_id).len();
        if consumers != ref_consumers {
            differences.push(format!(
                "'{id}' has {consumers} consumer(s), reference '{ref_id}' has {ref_consumers}"
            ));
        }

        let ports = graph.connected_in_ports(&id);
        let ref_ports = graph_ref.connected_in_ports(&ref_id);
        if ports != ref_ports {
            differences.push(format!(
                "'{id}' has connected inputs {ports:?}, reference '{ref_id}' has {ref_ports:?}"
            ));
            continue;
        }

        for port in ports {
            let (Some(src), Some(ref_src)) =
                (graph.producer(&id, port), graph_ref.producer(&ref_id, port))
            else {
                continue;
            };
            if src.1 != ref_src.1 {
                differences.push(format!(
                    "input {port} of '{id}' comes from output {} of '{}', reference uses output {} of '{}'",
                    src.1, src.0, ref_src.1, ref_src.0
                ));
            }

            match (forward.get(&src.0), backward.get(&ref_src.0)) {
                (None, None) => {
                    forward.insert(src.0.clone(), ref_src.0.clone());
                    backward.insert(ref_src.0.clone(), src.0.clone());
                    queue.push_back((src.0.clone(), ref_src.0.clone()));
                }
                (Some(paired), _) if paired != &ref_src.0 => {
                    differences.push(format!(
                        "'{}' is matched to both '{paired}' and '{}' in the reference",
                        src.0, ref_src.0
                    ));
                }
                (_, Some(paired)) if paired != &src.0 => {
                    differences.push(format!(
                        "reference '{}' is matched to both '{paired}' and '{}'",
                        ref_src.0, src.0
                    ));
                }
                _ => {}
            }
        }
    }

    if differences.is_empty() {
        Ok(())
    } else {
        Err(GraphMismatch { differences })
    }
}

fn compare_nodes(node: &Node, ref_node: &Node, options: &CompareOptions, out: &mut Vec<String>) {
    let (id, ref_id) = (&node.id, &ref_node.id);

    if node.kind != ref_node.kind {
        out.push(format!(
            "'{id}' is {}, reference '{ref_id}' is {}",
            node.kind, ref_node.kind
        ));
        return;
    }

    if (node.kind == NodeKind::Const || options.check_op_attrs) && node.value != ref_node.value {
        out.push(format!(
            "value of '{id}' is {}, reference '{ref_id}' has {}",
            describe(&node.value),
            describe(&ref_node.value)
        ));
    }

    if !options.check_op_attrs {
        return;
    }

    if node.output_type != ref_node.output_type {
        out.push(format!(
            "output_type of '{id}' is {}, reference '{ref_id}' has {}",
            describe(&node.output_type),
            describe(&ref_node.output_type)
        ));
    }

    if node.shape != ref_node.shape {
        out.push(format!(
            "shape of '{id}' is {:?}, reference '{ref_id}' has {:?}",
            node.shape, ref_node.shape
        ));
    }

    let keys = node.attrs.keys().chain(ref_node.attrs.keys());
    let mut reported: Vec<&String> = Vec::new();
    for key in keys {
        if options.ignored_attrs.contains(key) || reported.contains(&key) {
            continue;
        }
        let (a, b) = (node.attrs.get(key), ref_node.attrs.get(key));
        if a != b {
            out.push(format!(
                "attribute '{key}' of '{id}' is {}, reference '{ref_id}' has {}",
                describe(&a),
                describe(&b)
            ));
            reported.push(key);
        }
    }
}

fn describe<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "unset".to_string(),
    }
}
