//! `mofront inspect`: print statistics about a graph file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mofront_core::graph::Graph;
use mofront_core::hash::{graph_hash, hash_hex};
use mofront_ir::{IrFile, IrFlags};

use super::{load_graph, GraphFormat};

/// Summary of a graph's contents.
#[derive(Debug)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    /// Node count per kind, ordered by kind name.
    pub kinds: BTreeMap<String, usize>,
    /// Nodes whose kind the IR does not define.
    pub pending: Vec<String>,
    pub valid: bool,
}

pub fn summarize(graph: &Graph) -> GraphSummary {
    let mut kinds = BTreeMap::new();
    let mut pending = Vec::new();
    for node in graph.nodes() {
        *kinds.entry(node.kind.to_string()).or_insert(0) += 1;
        if !node.kind.is_ir_op() {
            pending.push(node.id.clone());
        }
    }
    pending.sort();
    GraphSummary {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        kinds,
        pending,
        valid: graph.validate().is_ok() && graph.topological_sort().is_ok(),
    }
}

/// Inspect a graph file.
pub fn run(input: &Path) -> Result<()> {
    let graph = match GraphFormat::of(input) {
        GraphFormat::Json => {
            println!("Format:  JSON");
            load_graph(input)?
        }
        GraphFormat::Ir => {
            let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
            let ir = IrFile::from_bytes(&bytes)
                .with_context(|| format!("parsing {}", input.display()))?;
            println!("Format:  MOIR {}", ir.version);
            println!(
                "Flags:   constants={} static_shapes={}",
                ir.flags.has(IrFlags::HAS_CONSTANTS),
                ir.flags.has(IrFlags::HAS_STATIC_SHAPES)
            );
            ir.graph
        }
    };

    let summary = summarize(&graph);
    println!("Hash:    {}", hash_hex(&graph_hash(&graph)?));
    println!("Nodes:   {}", summary.nodes);
    println!("Edges:   {}", summary.edges);
    println!("Valid:   {}", summary.valid);
    println!();
    println!("--- Node kinds ---");
    for (kind, count) in &summary.kinds {
        println!("  {kind:<12} {count}");
    }
    if !summary.pending.is_empty() {
        println!();
        println!("--- Awaiting front phase ({}) ---", summary.pending.len());
        for id in &summary.pending {
            println!("  {id}");
        }
    }
    Ok(())
}
