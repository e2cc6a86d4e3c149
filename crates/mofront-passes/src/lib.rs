//! Front-phase passes for the mofront model optimizer.
//!
//! The front phase runs right after a framework model has been loaded into
//! a graph. Its passes replace framework-level operations that the IR does
//! not define with equivalent IR subgraphs, then drop nodes that no longer
//! feed any output.

pub mod cleanup;
pub mod error;
pub mod infer;
pub mod ops;
pub mod pipeline;
pub mod rank_decomposer;
pub mod report;
pub mod transform;

pub use cleanup::eliminate_dead_nodes;
pub use error::TransformError;
pub use infer::{infer_values, InferError, Inferred};
pub use pipeline::{run_front_phase, PipelineConfig, PipelineOutput};
pub use rank_decomposer::RankDecomposer;
pub use report::{FrontPhaseReport, PassReport};
pub use transform::{
    replace_matching_ops, FrontReplacementOp, FrontReplacementPattern, TransformRegistry,
    TransformStats,
};
