//! CLI command implementations.

pub mod inspect;
pub mod passes;
pub mod transform;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mofront_core::graph::Graph;
use mofront_ir::IrFile;

/// On-disk encoding of a graph file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    /// Plain JSON (`.json`).
    Json,
    /// Checksummed MOIR container (anything else).
    Ir,
}

impl GraphFormat {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => GraphFormat::Json,
            _ => GraphFormat::Ir,
        }
    }
}

/// Read a graph in the format implied by `path`.
pub fn load_graph(path: &Path) -> Result<Graph> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let graph = match GraphFormat::of(path) {
        GraphFormat::Json => serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", path.display()))?,
        GraphFormat::Ir => {
            IrFile::from_bytes(&bytes)
                .with_context(|| format!("parsing {}", path.display()))?
                .graph
        }
    };
    Ok(graph)
}

/// Write a graph in the format implied by `path`.
pub fn save_graph(path: &Path, graph: Graph) -> Result<()> {
    let bytes = match GraphFormat::of(path) {
        GraphFormat::Json => serde_json::to_vec_pretty(&graph)?,
        GraphFormat::Ir => IrFile::new(graph).to_bytes()?,
    };
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_by_extension() {
        assert_eq!(GraphFormat::of(Path::new("model.json")), GraphFormat::Json);
        assert_eq!(GraphFormat::of(Path::new("MODEL.JSON")), GraphFormat::Json);
        assert_eq!(GraphFormat::of(Path::new("model.moir")), GraphFormat::Ir);
        assert_eq!(GraphFormat::of(Path::new("model")), GraphFormat::Ir);
    }

    #[test]
    fn save_and_load_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["g.json", "g.moir"] {
            let path = dir.path().join(name);
            save_graph(&path, test_support::rank_graph()).unwrap();
            let loaded = load_graph(&path).unwrap();
            assert_eq!(loaded.node_count(), 3, "{name}");
            assert_eq!(loaded.edge_count(), 2, "{name}");
        }
    }

    #[test]
    fn json_read_as_ir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("g.json");
        save_graph(&json, test_support::rank_graph()).unwrap();
        let renamed = dir.path().join("g.moir");
        fs::rename(&json, &renamed).unwrap();
        assert!(load_graph(&renamed).is_err());
    }
}
