//! Configuration loading from TOML files

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use evidence_store::digest::DEFAULT_CHUNK_SIZE;
use evidence_store::manifest::DEFAULT_ID_PREFIX;
use evidence_store::{HashOptions, SourceCatalog, SourceMetadata};

/// Global configuration for evidence
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub hashing: HashingConfig,
    pub manifest: ManifestConfig,
    /// Extra or overriding entries for the source catalog.
    pub sources: BTreeMap<String, SourceMetadata>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    pub chunk_size: usize,
    pub workers: usize,
}

impl Default for HashingConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: cpus.min(8),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub output_dir: PathBuf,
    pub id_prefix: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("manifests"),
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./evidence.toml (current directory)
    /// 2. ~/.config/evidence/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("evidence.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "evidence") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.hashing.chunk_size == 0 {
            anyhow::bail!("{}: hashing.chunk_size must be > 0", path.display());
        }

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Built-in catalog with `[sources.*]` entries layered on top.
    pub fn catalog(&self) -> SourceCatalog {
        SourceCatalog::builtin().merged(&self.sources)
    }

    /// Hash options, with the CLI worker count taking precedence.
    pub fn hash_options(&self, workers: Option<usize>) -> HashOptions {
        HashOptions {
            chunk_size: self.hashing.chunk_size,
            workers: workers.unwrap_or(self.hashing.workers).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.hashing.chunk_size, 8192);
        assert!(config.hashing.workers >= 1);
        assert_eq!(config.manifest.output_dir, PathBuf::from("manifests"));
        assert_eq!(config.manifest.id_prefix, "IM");
        assert_eq!(config.catalog().len(), 6);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[hashing]
chunk_size = 65536
workers = 2

[manifest]
output_dir = "/srv/evidence/manifests"

[sources.nordpool]
url = "https://data.nordpoolgroup.com/"
license = "Nord Pool terms"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.hashing.chunk_size, 65536);
        assert_eq!(config.hashing.workers, 2);
        assert_eq!(
            config.manifest.output_dir,
            PathBuf::from("/srv/evidence/manifests")
        );
        // Unset keys keep their defaults
        assert_eq!(config.manifest.id_prefix, "IM");

        let catalog = config.catalog();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.resolve("nordpool").unwrap().license, "Nord Pool terms");
    }

    #[test]
    fn cli_workers_override() {
        let config = Config::default();
        assert_eq!(config.hash_options(Some(3)).workers, 3);
        assert_eq!(config.hash_options(Some(0)).workers, 1);
        assert_eq!(
            config.hash_options(None).workers,
            config.hashing.workers.max(1)
        );
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.toml");
        std::fs::write(&path, "[hashing]\nchunk_size = 0\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn bad_toml_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.toml");
        std::fs::write(&path, "[hashing\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("evidence.toml"));
    }
}
