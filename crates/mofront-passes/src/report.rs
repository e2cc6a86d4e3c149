//! Front-phase report aggregating all pipeline stages.

use std::fmt;

use serde::Serialize;

use crate::transform::TransformStats;

/// Statistics for one executed pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub name: String,
    pub stats: TransformStats,
}

/// Summary report of a front-phase run.
#[derive(Debug, Clone, Serialize)]
pub struct FrontPhaseReport {
    /// Total pipeline duration in milliseconds.
    pub duration_ms: u64,
    /// Node count of the input graph.
    pub initial_node_count: usize,
    /// Node count after all passes and cleanup.
    pub final_node_count: usize,
    /// Executed passes, in order.
    pub passes: Vec<PassReport>,
    /// Nodes removed by dead-node cleanup, if it ran.
    pub cleanup: Option<TransformStats>,
}

impl FrontPhaseReport {
    /// Total number of pattern matches replaced across all passes.
    pub fn total_matches(&self) -> usize {
        self.passes.iter().map(|p| p.stats.matches).sum()
    }
}

impl fmt::Display for FrontPhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Front Phase Report ===")?;
        writeln!(f, "Duration: {} ms", self.duration_ms)?;
        writeln!(
            f,
            "Nodes: {} -> {}",
            self.initial_node_count, self.final_node_count
        )?;

        writeln!(f)?;
        writeln!(f, "--- Passes ({}) ---", self.passes.len())?;
        for pass in &self.passes {
            let s = &pass.stats;
            writeln!(
                f,
                "  {}: {} match(es), +{} nodes, -{} nodes, +{} edges, -{} edges",
                pass.name, s.matches, s.nodes_added, s.nodes_removed, s.edges_added, s.edges_removed,
            )?;
        }

        if let Some(cleanup) = &self.cleanup {
            writeln!(f)?;
            writeln!(f, "--- Cleanup ---")?;
            writeln!(f, "  {} dead node(s) removed", cleanup.nodes_removed)?;
        }

        Ok(())
    }
}
