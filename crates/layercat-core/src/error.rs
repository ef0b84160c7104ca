//! Catalog error taxonomy

use crate::diagnostic::ValidationIssue;
use crate::entity::EntityKind;

/// Errors surfaced by catalog construction, queries and authoring
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A required input document is absent
    #[error("Required artifact not found at {path}")]
    ArtifactMissing { path: String },

    /// One malformed record was excluded from its collection
    #[error("Skipped {kind} record '{id}': {reason}")]
    ParseSkipped {
        kind: EntityKind,
        id: String,
        reason: String,
    },

    /// A record lacks an identifying field; the whole pass for its kind aborts
    #[error("{kind} record '{id}' is missing identifying field '{field}'")]
    MissingIdentifier {
        kind: EntityKind,
        id: String,
        field: String,
    },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("Report '{report_id}' has no resolvable view to query")]
    NoTargetView { report_id: String },

    /// Neither fields nor measures could be selected for a query
    #[error("Report '{report_id}' has no dimensions or measures to select")]
    EmptySelection { report_id: String },

    #[error("{kind} with name '{name}' already exists")]
    Conflict { kind: String, name: String },

    #[error("Validation failed with {} error(s)", .0.len())]
    ValidationFailed(Vec<ValidationIssue>),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid JSON in {path}: {message}")]
    Json { path: String, message: String },
}

impl CatalogError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn conflict(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Conflict {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Stable name of the error class
    pub fn code(&self) -> &'static str {
        match self {
            Self::ArtifactMissing { .. } => "ArtifactMissing",
            Self::ParseSkipped { .. } => "ParseSkipped",
            Self::MissingIdentifier { .. } => "MissingIdentifier",
            Self::NotFound { .. } => "NotFound",
            Self::NoTargetView { .. } => "NoTargetView",
            Self::EmptySelection { .. } => "EmptySelection",
            Self::Conflict { .. } => "Conflict",
            Self::ValidationFailed(_) => "ValidationFailed",
            Self::Io { .. } => "Io",
            Self::Json { .. } => "Json",
        }
    }
}

/// Result alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
