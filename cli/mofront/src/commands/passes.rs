//! `mofront passes`: list the front-phase passes.

use anyhow::Result;
use mofront_passes::TransformRegistry;

use crate::config::MofrontConfig;

/// Print every registered pass in execution order with its enabled state.
pub fn run(config: &MofrontConfig) -> Result<()> {
    let mut registry = TransformRegistry::front_defaults();
    for name in &config.transforms.disabled {
        registry.disable(name)?;
    }

    println!("Front-phase passes:");
    for line in listing(&registry) {
        println!("  {line}");
    }
    Ok(())
}

fn listing(registry: &TransformRegistry) -> Vec<String> {
    registry
        .names()
        .into_iter()
        .map(|name| {
            let state = if registry.is_enabled(name) {
                "enabled"
            } else {
                "disabled"
            };
            format!("{name:<24} {state}")
        })
        .collect()
}
