//! Validation codes and issue reporting
//!
//! IMPORTANT: Validation codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Validation code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    // Semantic model structure
    /// The entity list is empty
    MissingEntities,

    /// Entities exist but none is primary
    MissingPrimaryEntity,

    /// Two entities share a name
    DuplicateEntityNames,

    /// Two dimensions share a name
    DuplicateDimensionNames,

    /// Two measures share a name
    DuplicateMeasureNames,

    /// A time dimension has no type_params
    MissingTimeGranularity,

    // Manifest structure
    /// The manifest has no semantic_models collection
    MissingSemanticModels,

    /// Two semantic models share a name
    DuplicateModelNames,
}

impl ValidationCode {
    /// Get the validation code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingEntities => "MISSING_ENTITIES",
            Self::MissingPrimaryEntity => "MISSING_PRIMARY_ENTITY",
            Self::DuplicateEntityNames => "DUPLICATE_ENTITY_NAMES",
            Self::DuplicateDimensionNames => "DUPLICATE_DIMENSION_NAMES",
            Self::DuplicateMeasureNames => "DUPLICATE_MEASURE_NAMES",
            Self::MissingTimeGranularity => "MISSING_TIME_GRANULARITY",
            Self::MissingSemanticModels => "MISSING_SEMANTIC_MODELS",
            Self::DuplicateModelNames => "DUPLICATE_MODEL_NAMES",
        }
    }
}

impl std::fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Issue severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Should be reviewed but not blocking
    Warning,

    /// Blocking issue; the definition is rejected
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Stable validation code
    pub code: ValidationCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Path to the offending element (e.g. `semantic_models[ces].entities`)
    pub location: String,

    /// Suggested fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create an error-level issue
    pub fn error(code: ValidationCode, message: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message: message.into(),
            location: location.into(),
            suggestion: None,
        }
    }

    /// Set the suggested fix
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} at {}", self.code, self.message, self.location)
    }
}

/// Overall validation state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Build a result from collected issues, splitting by severity
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) = issues
            .into_iter()
            .partition(|issue| issue.severity == Severity::Error);

        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Codes of all errors, in report order
    pub fn error_codes(&self) -> Vec<ValidationCode> {
        self.errors.iter().map(|e| e.code).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_code_stability() {
        // Ensure codes are stable strings
        assert_eq!(ValidationCode::MissingEntities.as_str(), "MISSING_ENTITIES");
        assert_eq!(ValidationCode::MissingTimeGranularity.as_str(), "MISSING_TIME_GRANULARITY");
        assert_eq!(
            serde_json::to_string(&ValidationCode::DuplicateDimensionNames).unwrap(),
            "\"DUPLICATE_DIMENSION_NAMES\""
        );
    }

    #[test]
    fn issue_serialization() {
        let issue = ValidationIssue::error(
            ValidationCode::MissingPrimaryEntity,
            "Semantic model must have at least one primary entity",
            "semantic_models[ces].entities",
        )
        .with_suggestion("Set one entity type to 'primary'");

        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains("MISSING_PRIMARY_ENTITY"));
        assert!(json.contains("\"error\""));
        assert!(json.contains("suggestion"));
    }

    #[test]
    fn result_splits_by_severity() {
        let mut warning = ValidationIssue::error(ValidationCode::DuplicateModelNames, "dup", "semantic_models");
        warning.severity = Severity::Warning;

        let result = ValidationResult::from_issues(vec![
            warning,
            ValidationIssue::error(ValidationCode::MissingEntities, "none", "semantic_models[a].entities"),
        ]);

        assert!(!result.valid);
        assert_eq!(result.error_codes(), vec![ValidationCode::MissingEntities]);
        assert_eq!(result.warnings.len(), 1);
    }
}
