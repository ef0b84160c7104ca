//! dbt artifact loading
//!
//! Reads manifest.json (required) and semantic_manifest.json (optional).
//! Sections are kept as raw JSON records; typed parsing happens per record
//! in [`crate::parser`] so one malformed record never fails the document.

use layercat_core::{checksum, CatalogError, Config};
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// dbt manifest.json structure (subset of sections we care about)
///
/// Sections keep document order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Metadata about the manifest
    #[serde(default)]
    pub metadata: ManifestMetadata,

    /// Model, test, seed and snapshot nodes
    #[serde(default)]
    pub nodes: IndexMap<String, Value>,

    /// Source definitions
    #[serde(default)]
    pub sources: IndexMap<String, Value>,

    /// Exposure definitions
    #[serde(default)]
    pub exposures: IndexMap<String, Value>,
}

impl Manifest {
    /// Load manifest from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse manifest from JSON string
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(json).map_err(|e| ManifestError::ParseError(e.to_string()))
    }

    /// Model nodes only (filters out tests, seeds, etc.)
    pub fn models(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.get("resource_type").and_then(Value::as_str) == Some("model"))
    }
}

/// Manifest metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub dbt_schema_version: Option<String>,
    #[serde(default)]
    pub dbt_version: Option<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub invocation_id: Option<String>,
}

/// One raw semantic model record
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticModelEntry {
    /// Key in the keyed-object shape; `None` for the array shape
    pub key: Option<String>,
    pub record: Value,
}

/// semantic_manifest.json structure
///
/// `semantic_models` is accepted both as an array (as dbt writes it) and as
/// an object keyed by id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SemanticManifest {
    pub semantic_models: Vec<SemanticModelEntry>,
}

impl SemanticManifest {
    /// Load semantic manifest from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse semantic manifest from JSON string
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ManifestError::ParseError(e.to_string()))?;
        Self::from_value(value)
    }

    /// Build from an already-parsed document
    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        let semantic_models = match value {
            Value::Object(mut root) => match root.remove("semantic_models") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .into_iter()
                    .map(|record| SemanticModelEntry { key: None, record })
                    .collect(),
                Some(Value::Object(map)) => map
                    .into_iter()
                    .map(|(key, record)| SemanticModelEntry {
                        key: Some(key),
                        record,
                    })
                    .collect(),
                Some(other) => {
                    return Err(ManifestError::ParseError(format!(
                        "semantic_models must be an array or object, found {}",
                        json_type(&other)
                    )))
                }
            },
            other => {
                return Err(ManifestError::ParseError(format!(
                    "semantic manifest root must be an object, found {}",
                    json_type(&other)
                )))
            }
        };

        Ok(Self { semantic_models })
    }

    pub fn is_empty(&self) -> bool {
        self.semantic_models.is_empty()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Both input documents for one project
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectArtifacts {
    pub project_root: PathBuf,
    pub manifest: Manifest,
    pub semantic_manifest: SemanticManifest,
    /// SHA-256 of the manifest bytes
    pub manifest_checksum: String,
}

impl ProjectArtifacts {
    /// Load both documents from the paths in `config`
    ///
    /// A missing manifest is fatal; a missing semantic manifest yields an
    /// empty semantic model collection.
    pub fn load(config: &Config) -> Result<Self, CatalogError> {
        let manifest_path = config.manifest_path();
        if !manifest_path.exists() {
            return Err(CatalogError::ArtifactMissing {
                path: manifest_path.display().to_string(),
            });
        }

        let manifest_json = std::fs::read_to_string(&manifest_path)
            .map_err(|e| ManifestError::IoError(manifest_path.display().to_string(), e.to_string()))?;

        let semantic_path = config.semantic_manifest_path();
        let semantic_json = if semantic_path.exists() {
            Some(std::fs::read_to_string(&semantic_path).map_err(|e| {
                ManifestError::IoError(semantic_path.display().to_string(), e.to_string())
            })?)
        } else {
            tracing::warn!(
                path = %semantic_path.display(),
                "semantic manifest not found, no reports will be loaded"
            );
            None
        };

        Self::from_json(&config.project_root, &manifest_json, semantic_json.as_deref())
    }

    /// Build from in-memory documents
    pub fn from_json(
        project_root: impl Into<PathBuf>,
        manifest_json: &str,
        semantic_json: Option<&str>,
    ) -> Result<Self, CatalogError> {
        let manifest = Manifest::from_str(manifest_json)?;
        let semantic_manifest = match semantic_json {
            Some(json) => SemanticManifest::from_str(json)?,
            None => SemanticManifest::default(),
        };

        Ok(Self {
            project_root: project_root.into(),
            manifest,
            semantic_manifest,
            manifest_checksum: checksum(manifest_json.as_bytes()),
        })
    }
}

/// Manifest parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse manifest JSON: {0}")]
    ParseError(String),
}

impl From<ManifestError> for CatalogError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::IoError(path, message) => CatalogError::Io { path, message },
            ManifestError::ParseError(message) => CatalogError::Json {
                path: "manifest".to_string(),
                message,
            },
        }
    }
}
