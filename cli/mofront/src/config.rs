//! `mofront.toml` configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name searched for when no `--config` is given.
pub const CONFIG_FILE: &str = "mofront.toml";

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MofrontConfig {
    #[serde(default)]
    pub transforms: TransformsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[transforms]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformsConfig {
    /// Pass names to skip.
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Dead-node cleanup after the passes (default: on).
    #[serde(default)]
    pub cleanup: Option<bool>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter, e.g. "debug". `RUST_LOG` takes precedence.
    #[serde(default)]
    pub level: Option<String>,
}

impl MofrontConfig {
    /// Load an explicitly named config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Search upward from `start_dir` for a `mofront.toml`, returning the
    /// parsed file and where it was found.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, candidate)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Use `explicit` when given, else search from `start_dir`, else defaults.
    pub fn resolve(explicit: Option<&Path>, start_dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::find_and_load(start_dir)?
                .map(|(config, _)| config)
                .unwrap_or_default()),
        }
    }

    pub fn cleanup(&self) -> bool {
        self.transforms.cleanup.unwrap_or(true)
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config: MofrontConfig = toml::from_str(
            r#"
[transforms]
disabled = ["RankDecomposer"]
cleanup = false

[logging]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.transforms.disabled, vec!["RankDecomposer"]);
        assert!(!config.cleanup());
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: MofrontConfig = toml::from_str("").unwrap();
        assert!(config.transforms.disabled.is_empty());
        assert!(config.cleanup());
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn reject_invalid_toml() {
        assert!(toml::from_str::<MofrontConfig>("[transforms\ncleanup = yes").is_err());
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();
        let nested = dir.path().join("models").join("v1");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = MofrontConfig::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(config.log_level(), "warn");
        assert_eq!(path, dir.path().join(CONFIG_FILE));
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = MofrontConfig::resolve(Some(&missing), dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("missing.toml"));
    }
}
