//! `mofront transform`: load a graph, run the front phase, write the result.

use std::path::Path;

use anyhow::{Context, Result};
use mofront_passes::{run_front_phase, FrontPhaseReport, PipelineConfig, TransformRegistry};

use super::{load_graph, save_graph};
use crate::config::MofrontConfig;

/// Command-line overrides layered on top of `mofront.toml`.
#[derive(Debug, Default)]
pub struct TransformOptions {
    pub disabled: Vec<String>,
    pub no_cleanup: bool,
}

/// Build the pipeline configuration from the config file and flags.
pub fn pipeline_config(config: &MofrontConfig, options: &TransformOptions) -> Result<PipelineConfig> {
    let mut transforms = TransformRegistry::front_defaults();
    for name in config.transforms.disabled.iter().chain(&options.disabled) {
        transforms
            .disable(name)
            .with_context(|| format!("disabling pass '{name}'"))?;
    }
    Ok(PipelineConfig {
        transforms,
        cleanup: config.cleanup() && !options.no_cleanup,
    })
}

/// Run the front phase on `input` and write the rewritten graph to `output`.
pub fn run(
    input: &Path,
    output: &Path,
    config: &MofrontConfig,
    options: &TransformOptions,
) -> Result<FrontPhaseReport> {
    let graph = load_graph(input)?;
    log::info!(
        "Loaded {} ({} nodes, {} edges)",
        input.display(),
        graph.node_count(),
        graph.edge_count()
    );

    let pipeline = pipeline_config(config, options)?;
    let result = run_front_phase(graph, pipeline)
        .with_context(|| format!("front phase failed on {}", input.display()))?;

    save_graph(output, result.graph)?;
    println!("{}", result.report);
    println!("Wrote {}", output.display());
    Ok(result.report)
}
