//! Configuration schema (layercat.toml)

use crate::entity::Aggregation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a report's model reference is turned into view ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionPolicy {
    /// Keep every matching view, in view order (duplicates allowed)
    AllMatches,

    /// Keep only the first matching view
    FirstMatch,

    /// Multi-match reports keep no views
    Strict,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self::AllMatches
    }
}

/// Locations of input and output documents, relative to the project root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Dependency manifest (required)
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Semantic manifest (optional)
    #[serde(default = "default_semantic_manifest")]
    pub semantic_manifest: PathBuf,

    /// Catalog export destination
    #[serde(default = "default_export")]
    pub export: PathBuf,
}

fn default_manifest() -> PathBuf {
    PathBuf::from("target/manifest.json")
}

fn default_semantic_manifest() -> PathBuf {
    PathBuf::from("target/semantic_manifest.json")
}

fn default_export() -> PathBuf {
    PathBuf::from("target/metadata_catalog.json")
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            semantic_manifest: default_semantic_manifest(),
            export: default_export(),
        }
    }
}

/// Reference resolution settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub policy: ResolutionPolicy,
}

/// Defaults applied by the query compiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefaults {
    /// Dimensions selected when no group_by is requested
    #[serde(default = "default_dimensions")]
    pub default_dimensions: usize,

    /// Field the date-range filter applies to
    #[serde(default = "default_date_field")]
    pub date_field: String,

    /// Aggregation for measures that declare none
    #[serde(default = "default_aggregation")]
    pub default_aggregation: Aggregation,
}

fn default_dimensions() -> usize {
    3
}

fn default_date_field() -> String {
    "year_month".to_string()
}

fn default_aggregation() -> Aggregation {
    Aggregation::Sum
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            default_dimensions: default_dimensions(),
            date_field: default_date_field(),
            default_aggregation: default_aggregation(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub artifacts: ArtifactPaths,

    #[serde(default)]
    pub resolution: ResolutionConfig,

    #[serde(default)]
    pub query: QueryDefaults,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifacts: ArtifactPaths::default(),
            resolution: ResolutionConfig::default(),
            query: QueryDefaults::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config =
            toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Override the project root
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// Absolute path of the dependency manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.manifest)
    }

    /// Absolute path of the semantic manifest
    pub fn semantic_manifest_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.semantic_manifest)
    }

    /// Absolute path of the catalog export
    pub fn export_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.export)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
