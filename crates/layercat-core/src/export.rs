//! Catalog export schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use crate::entity::{Dashboard, DashboardId, Report, ReportId, Table, TableId, View, ViewId};
use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Export schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ExportVersion {
    /// Current export schema version
    pub const CURRENT: ExportVersion = ExportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ExportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Provenance of an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Schema version
    pub version: ExportVersion,

    /// Timestamp (ISO 8601)
    pub generated_at: String,

    /// Project the artifacts were read from
    pub project_path: String,

    /// Upstream tool version recorded in the manifest
    #[serde(default)]
    pub dbt_version: Option<String>,

    /// SHA-256 of the primary manifest bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_checksum: Option<String>,
}

impl ExportMetadata {
    /// Metadata stamped with the current time
    pub fn now(project_path: impl Into<String>, dbt_version: Option<String>) -> Self {
        Self {
            version: ExportVersion::CURRENT,
            generated_at: chrono::Utc::now().to_rfc3339(),
            project_path: project_path.into(),
            dbt_version,
            manifest_checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.manifest_checksum = Some(checksum.into());
        self
    }
}

/// Catalog export (metadata_catalog.json v1)
///
/// Four id-keyed collections, each entity serialized with all its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogExport {
    pub metadata: ExportMetadata,

    #[serde(default)]
    pub tables: BTreeMap<TableId, Table>,

    #[serde(default)]
    pub views: BTreeMap<ViewId, View>,

    #[serde(default)]
    pub reports: BTreeMap<ReportId, Report>,

    #[serde(default)]
    pub dashboards: BTreeMap<DashboardId, Dashboard>,
}

impl CatalogExport {
    /// Serialize to JSON string
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse an export from a JSON string
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Save to file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let io_err = |e: std::io::Error| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let json = self.to_json().map_err(|e| CatalogError::Json {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        std::fs::write(path, json).map_err(io_err)
    }

    /// Load an export from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::from_json(&contents).map_err(|e| CatalogError::Json {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Total number of entities across the four collections
    pub fn entity_count(&self) -> usize {
        self.tables.len() + self.views.len() + self.reports.len() + self.dashboards.len()
    }
}

/// Hex SHA-256 of a document
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Meta;

    fn sample_table() -> Table {
        Table {
            id: "source.bls.raw.ces".to_string(),
            name: "ces".to_string(),
            schema: "raw".to_string(),
            database: "bls".to_string(),
            source_name: "raw".to_string(),
            description: "Current Employment Statistics".to_string(),
            meta: Meta::new(),
        }
    }

    #[test]
    fn export_serialization() {
        let mut export = CatalogExport {
            metadata: ExportMetadata::now("/projects/bls", Some("1.7.0".to_string())),
            tables: BTreeMap::new(),
            views: BTreeMap::new(),
            reports: BTreeMap::new(),
            dashboards: BTreeMap::new(),
        };
        let table = sample_table();
        export.tables.insert(table.id.clone(), table);

        let json = export.to_json().unwrap();
        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"generated_at\""));
        assert!(json.contains("\"dbt_version\": \"1.7.0\""));
        assert!(json.contains("source.bls.raw.ces"));
        assert_eq!(export.entity_count(), 1);
    }

    #[test]
    fn export_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target/nested/metadata_catalog.json");

        let mut export = CatalogExport {
            metadata: ExportMetadata::now("/projects/bls", None).with_checksum(checksum(b"{}")),
            tables: BTreeMap::new(),
            views: BTreeMap::new(),
            reports: BTreeMap::new(),
            dashboards: BTreeMap::new(),
        };
        let table = sample_table();
        export.tables.insert(table.id.clone(), table);

        export.save_to_file(&path).unwrap();
        let loaded = CatalogExport::from_file(&path).unwrap();
        assert_eq!(loaded, export);
    }

    #[test]
    fn checksum_is_sha256_hex() {
        assert_eq!(
            checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn missing_export_is_io_error() {
        let err = CatalogExport::from_file(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert_eq!(err.code(), "Io");
    }
}
