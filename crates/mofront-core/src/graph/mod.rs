//! Core graph data structures: nodes, edges, and the graph container.
//!
//! A model graph is a directed acyclic graph of operations. Each edge binds
//! one output port of a producer to one input port of a consumer; an output
//! port may feed many consumers, an input port has at most one producer.

pub mod edge;
pub mod node;

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::edge::{Edge, EdgeId, PortRef};
use self::node::{Node, NodeId, NodeKind};

/// Errors that can occur during graph construction, mutation, or validation.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("dangling edge: source node {src} or target node {dst} not in graph")]
    DanglingEdge { src: NodeId, dst: NodeId },

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("duplicate edge id: {0}")]
    DuplicateEdge(EdgeId),

    #[error("input port {port} of node {node} already has a producer")]
    InputPortOccupied { node: NodeId, port: usize },

    #[error("cycle detected involving node {0}")]
    CycleDetected(NodeId),

    #[error("invalid port spec '{0}'")]
    InvalidPortSpec(String),
}

/// The graph container.
///
/// Stores nodes and edges with lookup by ID and per-node adjacency indexes.
/// Only nodes and edges are serialized; the indexes are rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphRepr")]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,

    /// Index: node -> outgoing edges (edges where this node is the source)
    #[serde(skip)]
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    /// Index: node -> incoming edges (edges where this node is the target)
    #[serde(skip)]
    incoming: HashMap<NodeId, Vec<EdgeId>>,
}

/// Serialized form of a [`Graph`].
#[derive(Deserialize)]
struct GraphRepr {
    #[serde(default)]
    nodes: HashMap<NodeId, Node>,
    #[serde(default)]
    edges: HashMap<EdgeId, Edge>,
}

impl TryFrom<GraphRepr> for Graph {
    type Error = GraphError;

    /// Re-inserts every node and edge, so a loaded graph satisfies the same
    /// invariants as one built in memory.
    fn try_from(repr: GraphRepr) -> Result<Self, GraphError> {
        let mut graph = Graph::new();
        let mut nodes: Vec<Node> = repr.nodes.into_values().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        for node in nodes {
            graph.add_node(node)?;
        }
        let mut edges: Vec<Edge> = repr.edges.into_values().collect();
        edges.sort_by(|a, b| a.target.cmp(&b.target).then(a.source.cmp(&b.source)));
        for edge in edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node into the graph.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let id = node.id.clone();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.outgoing.entry(id.clone()).or_default();
        self.incoming.entry(id.clone()).or_default();
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    /// Insert an edge into the graph.
    ///
    /// Both endpoints must exist and the target input port must be free.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let id = edge.id;
        if self.edges.contains_key(&id) {
            return Err(GraphError::DuplicateEdge(id));
        }
        let (source_node, _) = &edge.source;
        let (target_node, target_port) = &edge.target;
        if !self.nodes.contains_key(source_node) || !self.nodes.contains_key(target_node) {
            return Err(GraphError::DanglingEdge {
                src: source_node.clone(),
                dst: target_node.clone(),
            });
        }
        if self.in_edge(target_node, *target_port).is_some() {
            return Err(GraphError::InputPortOccupied {
                node: target_node.clone(),
                port: *target_port,
            });
        }
        self.outgoing
            .entry(source_node.clone())
            .or_default()
            .push(id);
        self.incoming
            .entry(target_node.clone())
            .or_default()
            .push(id);
        self.edges.insert(id, edge);
        Ok(id)
    }

    /// Connect an output port to an input port with a fresh edge.
    pub fn connect(&mut self, source: PortRef, target: PortRef) -> Result<EdgeId, GraphError> {
        self.add_edge(Edge::new(source, target))
    }

    /// Look up a node by ID.
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node by ID (mutable).
    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Whether a node with this ID exists.
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Look up an edge by ID.
    pub fn get_edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Get all outgoing edges from a node.
    pub fn outgoing_edges(&self, node_id: &str) -> &[EdgeId] {
        self.outgoing
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get all incoming edges to a node.
    pub fn incoming_edges(&self, node_id: &str) -> &[EdgeId] {
        self.incoming
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The edge feeding a given input port, if connected.
    pub fn in_edge(&self, node_id: &str, port: usize) -> Option<&Edge> {
        self.incoming_edges(node_id)
            .iter()
            .filter_map(|eid| self.edges.get(eid))
            .find(|e| e.target.1 == port)
    }

    /// All edges leaving a given output port.
    pub fn out_edges(&self, node_id: &str, port: usize) -> Vec<&Edge> {
        self.outgoing_edges(node_id)
            .iter()
            .filter_map(|eid| self.edges.get(eid))
            .filter(|e| e.source.1 == port)
            .collect()
    }

    /// Sorted indices of the connected input ports of a node.
    pub fn connected_in_ports(&self, node_id: &str) -> Vec<usize> {
        let mut ports: Vec<usize> = self
            .incoming_edges(node_id)
            .iter()
            .filter_map(|eid| self.edges.get(eid))
            .map(|e| e.target.1)
            .collect();
        ports.sort_unstable();
        ports
    }

    /// The producer of a given input port.
    pub fn producer(&self, node_id: &str, port: usize) -> Option<&PortRef> {
        self.in_edge(node_id, port).map(|e| &e.source)
    }

    /// All nodes of a given kind, ordered by ID.
    pub fn op_nodes(&self, kind: &NodeKind) -> Vec<&Node> {
        let mut found: Vec<&Node> = self.nodes.values().filter(|n| &n.kind == kind).collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    /// A node ID derived from `prefix` that is not yet used in the graph.
    pub fn unique_id(&self, prefix: &str) -> NodeId {
        if !self.nodes.contains_key(prefix) {
            return prefix.to_string();
        }
        let mut counter = 1usize;
        loop {
            let candidate = format!("{prefix}_{counter}");
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Return the total number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Return the total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterate over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate over all edges.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Remove an edge from the graph.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        let edge = self.edges.remove(&id).ok_or(GraphError::EdgeNotFound(id))?;
        if let Some(list) = self.outgoing.get_mut(&edge.source.0) {
            list.retain(|&eid| eid != id);
        }
        if let Some(list) = self.incoming.get_mut(&edge.target.0) {
            list.retain(|&eid| eid != id);
        }
        Ok(edge)
    }

    /// Remove a node and all its connected edges from the graph.
    pub fn remove_node(&mut self, id: &str) -> Result<Node, GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::NodeNotFound(id.to_string()));
        }

        let mut attached: Vec<EdgeId> = self.outgoing.remove(id).unwrap_or_default();
        attached.extend(self.incoming.remove(id).unwrap_or_default());
        for eid in attached {
            if let Some(edge) = self.edges.remove(&eid) {
                if let Some(list) = self.incoming.get_mut(&edge.target.0) {
                    list.retain(|&e| e != eid);
                }
                if let Some(list) = self.outgoing.get_mut(&edge.source.0) {
                    list.retain(|&e| e != eid);
                }
            }
        }

        self.nodes
            .remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    /// Move every consumer of output port `old` onto output port `new`.
    ///
    /// Returns the number of consumers moved.
    pub fn set_source(&mut self, old: &PortRef, new: PortRef) -> Result<usize, GraphError> {
        if !self.nodes.contains_key(&new.0) {
            return Err(GraphError::NodeNotFound(new.0));
        }
        let moved: Vec<(EdgeId, PortRef)> = self
            .out_edges(&old.0, old.1)
            .into_iter()
            .map(|e| (e.id, e.target.clone()))
            .collect();
        for (eid, target) in &moved {
            self.remove_edge(*eid)?;
            self.connect(new.clone(), target.clone())?;
        }
        Ok(moved.len())
    }

    /// Move the producer of input port `old` onto input port `new`.
    ///
    /// Returns `false` when `old` had no producer.
    pub fn set_destination(&mut self, old: &PortRef, new: PortRef) -> Result<bool, GraphError> {
        if !self.nodes.contains_key(&new.0) {
            return Err(GraphError::NodeNotFound(new.0));
        }
        let Some((eid, source)) = self
            .in_edge(&old.0, old.1)
            .map(|e| (e.id, e.source.clone()))
        else {
            return Ok(false);
        };
        self.remove_edge(eid)?;
        self.connect(source, new)?;
        Ok(true)
    }

    /// Assign human-readable names to nodes.
    ///
    /// All IDs are checked before any name changes.
    pub fn rename_nodes(&mut self, renames: &[(NodeId, String)]) -> Result<(), GraphError> {
        for (id, _) in renames {
            if !self.nodes.contains_key(id) {
                return Err(GraphError::NodeNotFound(id.clone()));
            }
        }
        for (id, name) in renames {
            if let Some(node) = self.nodes.get_mut(id) {
                node.name = Some(name.clone());
            }
        }
        Ok(())
    }

    /// All nodes from which at least one of `targets` is reachable,
    /// including the targets themselves.
    pub fn reachable_to(&self, targets: &[NodeId]) -> HashSet<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = targets
            .iter()
            .filter(|id| self.nodes.contains_key(id.as_str()))
            .cloned()
            .collect();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            for eid in self.incoming_edges(&id) {
                if let Some(edge) = self.edges.get(eid) {
                    if !seen.contains(&edge.source.0) {
                        queue.push_back(edge.source.0.clone());
                    }
                }
            }
        }
        seen
    }

    /// Compute a topological ordering of the nodes.
    ///
    /// For every edge (u, v), u appears before v. Ties are broken by node ID
    /// so the order is deterministic.
    pub fn topological_sort(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut in_degree: HashMap<&str, usize> =
            self.nodes.keys().map(|id| (id.as_str(), 0)).collect();
        for edge in self.edges.values() {
            *in_degree.entry(edge.target.0.as_str()).or_default() += 1;
        }

        let mut queue: Vec<&str> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(id, _)| *id)
            .collect();
        // Reverse order so `pop` yields the smallest ID first
        queue.sort_unstable_by(|a, b| b.cmp(a));

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(node_id) = queue.pop() {
            result.push(node_id.to_string());
            for edge_id in self.outgoing_edges(node_id) {
                if let Some(edge) = self.edges.get(edge_id) {
                    if let Some(deg) = in_degree.get_mut(edge.target.0.as_str()) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push(edge.target.0.as_str());
                        }
                    }
                }
            }
            queue.sort_unstable_by(|a, b| b.cmp(a));
        }

        if result.len() != self.nodes.len() {
            let mut stuck: Vec<&str> = in_degree
                .iter()
                .filter(|(_, &deg)| deg > 0)
                .map(|(id, _)| *id)
                .collect();
            stuck.sort_unstable();
            let cycle_node = stuck.first().map(|s| s.to_string()).unwrap_or_default();
            return Err(GraphError::CycleDetected(cycle_node));
        }

        Ok(result)
    }

    /// Validate graph well-formedness.
    ///
    /// Checks:
    /// - No dangling edges (source and target nodes exist)
    /// - Each input port has at most one producer
    pub fn validate(&self) -> Result<(), Vec<GraphError>> {
        let mut errors = Vec::new();

        for edge in self.edges.values() {
            if !self.nodes.contains_key(&edge.source.0) || !self.nodes.contains_key(&edge.target.0)
            {
                errors.push(GraphError::DanglingEdge {
                    src: edge.source.0.clone(),
                    dst: edge.target.0.clone(),
                });
            }
        }

        let mut bound: HashSet<&PortRef> = HashSet::new();
        let mut edges: Vec<&Edge> = self.edges.values().collect();
        edges.sort_by(|a, b| a.target.cmp(&b.target));
        for edge in edges {
            if !bound.insert(&edge.target) {
                errors.push(GraphError::InputPortOccupied {
                    node: edge.target.0.clone(),
                    port: edge.target.1,
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Graph {
        let mut g = Graph::new();
        g.add_node(Node::new("input", NodeKind::Parameter)).unwrap();
        g.add_node(Node::new("rank", NodeKind::Rank)).unwrap();
        g.add_node(Node::new("output", NodeKind::Result)).unwrap();
        g.connect(("input".into(), 0), ("rank".into(), 0)).unwrap();
        g.connect(("rank".into(), 0), ("output".into(), 0)).unwrap();
        g
    }

    #[test]
    fn empty_graph() {
        let g = Graph::new();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn add_nodes_and_edges() {
        let g = chain();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.outgoing_edges("input").len(), 1);
        assert_eq!(g.incoming_edges("output").len(), 1);
        assert_eq!(g.producer("rank", 0), Some(&("input".to_string(), 0)));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn dangling_edge_rejected() {
        let mut g = Graph::new();
        g.add_node(Node::new("a", NodeKind::Parameter)).unwrap();
        let err = g.connect(("a".into(), 0), ("missing".into(), 0)).unwrap_err();
        assert!(matches!(err, GraphError::DanglingEdge { .. }));
    }

    #[test]
    fn duplicate_node_rejected() {
        let mut g = Graph::new();
        g.add_node(Node::new("a", NodeKind::Parameter)).unwrap();
        assert_eq!(
            g.add_node(Node::new("a", NodeKind::Const)),
            Err(GraphError::DuplicateNode("a".into()))
        );
    }

    #[test]
    fn occupied_input_port_rejected() {
        let mut g = chain();
        g.add_node(Node::new("other", NodeKind::Parameter)).unwrap();
        let err = g
            .connect(("other".into(), 0), ("rank".into(), 0))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::InputPortOccupied {
                node: "rank".into(),
                port: 0
            }
        );
    }

    #[test]
    fn output_port_fans_out() {
        let mut g = chain();
        g.add_node(Node::new("output2", NodeKind::Result)).unwrap();
        g.connect(("rank".into(), 0), ("output2".into(), 0)).unwrap();
        assert_eq!(g.out_edges("rank", 0).len(), 2);
    }

    #[test]
    fn remove_node_drops_edges() {
        let mut g = chain();
        let removed = g.remove_node("rank").unwrap();
        assert_eq!(removed.kind, NodeKind::Rank);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 0);
        assert!(g.outgoing_edges("input").is_empty());
        assert!(g.incoming_edges("output").is_empty());
    }

    #[test]
    fn remove_missing_node_errors() {
        let mut g = Graph::new();
        assert_eq!(
            g.remove_node("ghost").unwrap_err(),
            GraphError::NodeNotFound("ghost".into())
        );
    }

    #[test]
    fn remove_edge_basic() {
        let mut g = chain();
        let eid = g.incoming_edges("output")[0];
        g.remove_edge(eid).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert!(g.in_edge("output", 0).is_none());
        assert!(g.remove_edge(eid).is_err());
    }

    #[test]
    fn set_source_moves_all_consumers() {
        let mut g = chain();
        g.add_node(Node::new("output2", NodeKind::Result)).unwrap();
        g.connect(("rank".into(), 0), ("output2".into(), 0)).unwrap();
        g.add_node(Node::new("squeeze", NodeKind::Squeeze)).unwrap();

        let moved = g
            .set_source(&("rank".into(), 0), ("squeeze".into(), 0))
            .unwrap();
        assert_eq!(moved, 2);
        assert!(g.out_edges("rank", 0).is_empty());
        assert_eq!(g.producer("output", 0), Some(&("squeeze".to_string(), 0)));
        assert_eq!(g.producer("output2", 0), Some(&("squeeze".to_string(), 0)));
    }

    #[test]
    fn set_destination_moves_producer() {
        let mut g = chain();
        g.add_node(Node::new("shape", NodeKind::ShapeOf)).unwrap();
        let moved = g
            .set_destination(&("rank".into(), 0), ("shape".into(), 0))
            .unwrap();
        assert!(moved);
        assert!(g.in_edge("rank", 0).is_none());
        assert_eq!(g.producer("shape", 0), Some(&("input".to_string(), 0)));

        let moved = g
            .set_destination(&("rank".into(), 0), ("shape".into(), 1))
            .unwrap();
        assert!(!moved);
    }

    #[test]
    fn set_source_requires_existing_node() {
        let mut g = chain();
        let err = g
            .set_source(&("rank".into(), 0), ("ghost".into(), 0))
            .unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound("ghost".into()));
        assert_eq!(g.out_edges("rank", 0).len(), 1);
    }

    #[test]
    fn unique_id_avoids_collisions() {
        let g = chain();
        assert_eq!(g.unique_id("shape"), "shape");
        assert_eq!(g.unique_id("rank"), "rank_1");
    }

    #[test]
    fn rename_nodes_checks_all_ids_first() {
        let mut g = chain();
        let err = g
            .rename_nodes(&[
                ("rank".into(), "renamed".into()),
                ("ghost".into(), "x".into()),
            ])
            .unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound("ghost".into()));
        assert_eq!(g.get_node("rank").unwrap().name, None);

        g.rename_nodes(&[("rank".into(), "renamed".into())]).unwrap();
        assert_eq!(g.get_node("rank").unwrap().soft_name(), "renamed");
    }

    #[test]
    fn op_nodes_filters_and_sorts() {
        let mut g = chain();
        g.add_node(Node::new("a_result", NodeKind::Result)).unwrap();
        let results: Vec<&str> = g
            .op_nodes(&NodeKind::Result)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(results, vec!["a_result", "output"]);
    }

    #[test]
    fn reachable_to_walks_backwards() {
        let mut g = chain();
        g.add_node(Node::new("orphan", NodeKind::Const)).unwrap();
        let live = g.reachable_to(&["output".to_string()]);
        assert_eq!(live.len(), 3);
        assert!(!live.contains("orphan"));
    }

    #[test]
    fn topological_sort_simple() {
        let g = chain();
        let order = g.topological_sort().unwrap();
        assert_eq!(order, vec!["input", "rank", "output"]);
    }

    #[test]
    fn topological_sort_detects_cycle() {
        let mut g = Graph::new();
        g.add_node(Node::new("a", NodeKind::Squeeze)).unwrap();
        g.add_node(Node::new("b", NodeKind::Squeeze)).unwrap();
        g.connect(("a".into(), 0), ("b".into(), 0)).unwrap();
        g.connect(("b".into(), 0), ("a".into(), 0)).unwrap();
        assert_eq!(
            g.topological_sort().unwrap_err(),
            GraphError::CycleDetected("a".into())
        );
    }

    #[test]
    fn serde_round_trip_preserves_structure() {
        let g = chain();
        let json = serde_json::to_string(&g).unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.node_count(), 3);
        assert_eq!(back.producer("output", 0), Some(&("rank".to_string(), 0)));
    }

    #[test]
    fn deserialize_rebuilds_adjacency() {
        let mut json = serde_json::to_value(chain()).unwrap();
        assert!(json.get("incoming").is_none());
        // Stale index maps from an older writer are ignored
        json["incoming"] = serde_json::json!({});
        json["outgoing"] = serde_json::json!({});

        let back: Graph = serde_json::from_value(json).unwrap();
        assert_eq!(back.incoming_edges("rank").len(), 1);
        assert_eq!(back.outgoing_edges("rank").len(), 1);
        assert!(back.in_edge("rank", 0).is_some());
        assert_eq!(back.topological_sort().unwrap(), vec!["input", "rank", "output"]);
    }

    #[test]
    fn deserialize_rejects_occupied_port() {
        let mut g = chain();
        g.add_node(Node::new("other", NodeKind::Parameter)).unwrap();
        let mut json = serde_json::to_value(&g).unwrap();
        let extra = Edge::new(("other".into(), 0), ("rank".into(), 0));
        json["edges"][extra.id.to_string()] = serde_json::to_value(&extra).unwrap();

        let err = serde_json::from_value::<Graph>(json).unwrap_err();
        assert!(err.to_string().contains("already has a producer"));
    }

    #[test]
    fn deserialize_rejects_dangling_edge() {
        let mut json = serde_json::to_value(chain()).unwrap();
        json["nodes"].as_object_mut().unwrap().remove("input");
        assert!(serde_json::from_value::<Graph>(json).is_err());
    }
}
