//! Replacement traits and the pass registry.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use mofront_core::graph::node::{Node, NodeId, NodeKind};
use mofront_core::graph::Graph;

use crate::error::TransformError;
use crate::rank_decomposer::RankDecomposer;

/// Statistics from applying a replacement pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformStats {
    /// Number of pattern matches replaced.
    pub matches: usize,
    pub nodes_added: usize,
    pub nodes_removed: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
}

impl TransformStats {
    /// Accumulate another pass's statistics into this one.
    pub fn merge(&mut self, other: &TransformStats) {
        self.matches += other.matches;
        self.nodes_added += other.nodes_added;
        self.nodes_removed += other.nodes_removed;
        self.edges_added += other.edges_added;
        self.edges_removed += other.edges_removed;
    }
}

/// A whole-graph front-phase pass.
///
/// Object-safe so passes can be stored in `Box<dyn FrontReplacementPattern>`.
pub trait FrontReplacementPattern: fmt::Debug + Send + Sync {
    /// Name used in logs, reports, and configuration.
    fn name(&self) -> &str;

    /// Whether the pass runs by default.
    fn enabled(&self) -> bool {
        true
    }

    /// Find every occurrence of the pattern and rewrite it in place.
    fn find_and_replace_pattern(&self, graph: &mut Graph) -> Result<TransformStats, TransformError>;
}

/// A pass that replaces every node of a single kind.
pub trait FrontReplacementOp {
    /// The node kind this pass replaces.
    fn op(&self) -> NodeKind;

    /// Check that a matched node can be replaced. Runs for every match
    /// before any match is rewritten.
    fn check(&self, _graph: &Graph, _node: &Node) -> Result<(), TransformError> {
        Ok(())
    }

    /// Replace a single matched node.
    fn replace_op(&self, graph: &mut Graph, node_id: &NodeId)
        -> Result<TransformStats, TransformError>;
}

/// Drive a `FrontReplacementOp` over all nodes of its kind.
///
/// Every match is checked before the first rewrite, so a failing check
/// leaves the graph untouched.
pub fn replace_matching_ops<R: FrontReplacementOp + ?Sized>(
    replacer: &R,
    graph: &mut Graph,
) -> Result<TransformStats, TransformError> {
    let kind = replacer.op();
    let matched: Vec<NodeId> = graph
        .op_nodes(&kind)
        .into_iter()
        .map(|n| n.id.clone())
        .collect();

    for id in &matched {
        if let Some(node) = graph.get_node(id) {
            replacer.check(graph, node)?;
        }
    }

    let mut total = TransformStats::default();
    for id in &matched {
        let stats = replacer.replace_op(graph, id)?;
        total.merge(&stats);
    }
    Ok(total)
}

/// Ordered collection of front-phase passes.
#[derive(Debug, Default)]
pub struct TransformRegistry {
    patterns: Vec<Box<dyn FrontReplacementPattern>>,
    disabled: HashSet<String>,
}

impl TransformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard front-phase passes, in execution order.
    pub fn front_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RankDecomposer));
        registry
    }

    /// Register a pass after the existing ones.
    pub fn register(&mut self, pattern: Box<dyn FrontReplacementPattern>) {
        self.patterns.push(pattern);
    }

    /// Disable a registered pass by name.
    pub fn disable(&mut self, name: &str) -> Result<(), TransformError> {
        if !self.patterns.iter().any(|p| p.name() == name) {
            return Err(TransformError::UnknownTransform(name.to_string()));
        }
        self.disabled.insert(name.to_string());
        Ok(())
    }

    /// Whether a pass will run in `apply_all`.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.name() == name && p.enabled() && !self.disabled.contains(name))
    }

    /// Names of all registered passes, in order.
    pub fn names(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.name()).collect()
    }

    /// Run every enabled pass in order, stopping at the first failure.
    pub fn apply_all(
        &self,
        graph: &mut Graph,
    ) -> Result<Vec<(String, TransformStats)>, TransformError> {
        let mut results = Vec::new();
        for pattern in &self.patterns {
            let name = pattern.name();
            if !self.is_enabled(name) {
                log::debug!("Skipping disabled pass {name}");
                continue;
            }
            let stats = pattern.find_and_replace_pattern(graph)?;
            results.push((name.to_string(), stats));
        }
        Ok(results)
    }
}
