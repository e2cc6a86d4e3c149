//! Front-phase pipeline orchestrator.

use std::time::Instant;

use mofront_core::graph::Graph;

use crate::cleanup::eliminate_dead_nodes;
use crate::error::TransformError;
use crate::report::{FrontPhaseReport, PassReport};
use crate::transform::TransformRegistry;

/// Configuration for the front-phase pipeline.
#[derive(Debug)]
pub struct PipelineConfig {
    /// Passes to run, in order.
    pub transforms: TransformRegistry,
    /// Whether to remove nodes that no longer feed an output.
    pub cleanup: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transforms: TransformRegistry::front_defaults(),
            cleanup: true,
        }
    }
}

/// Output of a successful front-phase run.
#[derive(Debug)]
pub struct PipelineOutput {
    /// The rewritten graph.
    pub graph: Graph,
    /// Pipeline report with statistics.
    pub report: FrontPhaseReport,
}

/// Run the front phase:
/// validate -> passes -> cleanup -> acyclicity check -> report.
pub fn run_front_phase(
    mut graph: Graph,
    config: PipelineConfig,
) -> Result<PipelineOutput, TransformError> {
    let start = Instant::now();
    let initial_node_count = graph.node_count();

    // Stage 1: Input validation
    graph
        .validate()
        .map_err(|errors| TransformError::InvalidGraph { errors })?;
    log::debug!(
        "Front phase: input graph has {} node(s), {} edge(s)",
        graph.node_count(),
        graph.edge_count()
    );

    // Stage 2: Replacement passes
    let passes: Vec<PassReport> = config
        .transforms
        .apply_all(&mut graph)?
        .into_iter()
        .map(|(name, stats)| PassReport { name, stats })
        .collect();

    // Stage 3: Dead-node cleanup
    let cleanup = if config.cleanup {
        Some(eliminate_dead_nodes(&mut graph)?)
    } else {
        None
    };

    // Stage 4: Passes must not introduce cycles
    graph.topological_sort()?;

    let report = FrontPhaseReport {
        duration_ms: start.elapsed().as_millis() as u64,
        initial_node_count,
        final_node_count: graph.node_count(),
        passes,
        cleanup,
    };
    log::info!(
        "Front phase: {} pass(es), {} replacement(s), {} -> {} node(s)",
        report.passes.len(),
        report.total_matches(),
        report.initial_node_count,
        report.final_node_count,
    );

    Ok(PipelineOutput { graph, report })
}
