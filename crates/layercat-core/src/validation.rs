//! Structural validation of semantic definitions
//!
//! Stateless checks shared by the catalog build (upstream reports) and the
//! authoring boundary (semantic models). Every check runs; issues are
//! returned together in check order, then list order within a check.

use crate::diagnostic::{ValidationCode, ValidationIssue, ValidationResult};
use crate::entity::{Dimension, DimensionType, Entity, EntityType, Measure, Report, SemanticModel};
use std::collections::BTreeSet;

/// Anything that carries entities, dimensions and measures
pub trait SemanticDefinition {
    fn definition_name(&self) -> &str;
    fn entities(&self) -> &[Entity];
    fn dimensions(&self) -> &[Dimension];
    fn measures(&self) -> &[Measure];
}

impl SemanticDefinition for Report {
    fn definition_name(&self) -> &str {
        &self.name
    }

    fn entities(&self) -> &[Entity] {
        &self.entities
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn measures(&self) -> &[Measure] {
        &self.measures
    }
}

impl SemanticDefinition for SemanticModel {
    fn definition_name(&self) -> &str {
        &self.name
    }

    fn entities(&self) -> &[Entity] {
        &self.entities
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn measures(&self) -> &[Measure] {
        &self.measures
    }
}

/// Validator for semantic definitions and semantic manifests
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate one semantic definition
    pub fn validate<D: SemanticDefinition + ?Sized>(&self, definition: &D) -> ValidationResult {
        ValidationResult::from_issues(self.issues(definition))
    }

    /// Collect all issues for one semantic definition
    pub fn issues<D: SemanticDefinition + ?Sized>(&self, definition: &D) -> Vec<ValidationIssue> {
        let name = definition.definition_name();
        let base = format!("semantic_models[{}]", name);
        let mut issues = Vec::new();

        let entities = definition.entities();
        if entities.is_empty() {
            issues.push(
                ValidationIssue::error(
                    ValidationCode::MissingEntities,
                    "Semantic model must have at least one entity",
                    format!("{}.entities", base),
                )
                .with_suggestion("Add at least one entity with type 'primary'"),
            );
        } else if !entities.iter().any(|e| e.entity_type == EntityType::Primary) {
            issues.push(
                ValidationIssue::error(
                    ValidationCode::MissingPrimaryEntity,
                    "Semantic model must have at least one primary entity",
                    format!("{}.entities", base),
                )
                .with_suggestion("Set one entity type to 'primary'"),
            );
        }

        let checks = [
            (
                ValidationCode::DuplicateEntityNames,
                "entities",
                "Entity",
                duplicates(entities.iter().map(|e| e.name.as_str())),
            ),
            (
                ValidationCode::DuplicateDimensionNames,
                "dimensions",
                "Dimension",
                duplicates(definition.dimensions().iter().map(|d| d.name.as_str())),
            ),
            (
                ValidationCode::DuplicateMeasureNames,
                "measures",
                "Measure",
                duplicates(definition.measures().iter().map(|m| m.name.as_str())),
            ),
        ];

        for (code, collection, label, dups) in checks {
            if dups.is_empty() {
                continue;
            }
            issues.push(
                ValidationIssue::error(
                    code,
                    format!(
                        "{} names must be unique within semantic model (duplicated: {})",
                        label,
                        dups.join(", ")
                    ),
                    format!("{}.{}", base, collection),
                )
                .with_suggestion(format!("Ensure all {} names are unique", label.to_lowercase())),
            );
        }

        for dim in definition.dimensions() {
            if dim.dimension_type == DimensionType::Time && dim.type_params.is_none() {
                issues.push(
                    ValidationIssue::error(
                        ValidationCode::MissingTimeGranularity,
                        format!("Time dimension '{}' missing type_params.time_granularity", dim.name),
                        format!("{}.dimensions[{}]", base, dim.name),
                    )
                    .with_suggestion(
                        "Add type_params with time_granularity (day, week, month, quarter, year)",
                    ),
                );
            }
        }

        issues
    }

    /// Validate a raw semantic manifest document
    ///
    /// Checks the `semantic_models` collection exists and that model names
    /// are unique across it. Accepts both the array and the keyed-object shape.
    pub fn validate_manifest(&self, manifest: &serde_json::Value) -> ValidationResult {
        let mut issues = Vec::new();

        match manifest.get("semantic_models") {
            None => issues.push(
                ValidationIssue::error(
                    ValidationCode::MissingSemanticModels,
                    "Manifest must contain 'semantic_models' array",
                    "root",
                )
                .with_suggestion("Add semantic_models array to manifest"),
            ),
            Some(models) => {
                let names: Vec<&str> = match models {
                    serde_json::Value::Array(items) => items
                        .iter()
                        .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                        .collect(),
                    serde_json::Value::Object(map) => map
                        .iter()
                        .map(|(id, m)| m.get("name").and_then(|n| n.as_str()).unwrap_or(id.as_str()))
                        .collect(),
                    _ => Vec::new(),
                };

                let dups = duplicates(names.into_iter());
                if !dups.is_empty() {
                    issues.push(
                        ValidationIssue::error(
                            ValidationCode::DuplicateModelNames,
                            format!(
                                "Semantic model names must be unique across manifest (duplicated: {})",
                                dups.join(", ")
                            ),
                            "semantic_models",
                        )
                        .with_suggestion("Ensure all semantic model names are unique"),
                    );
                }
            }
        }

        ValidationResult::from_issues(issues)
    }
}

/// Names that occur more than once, in first-duplicate order
fn duplicates<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut dups: Vec<String> = Vec::new();

    for name in names {
        if !seen.insert(name) && !dups.iter().any(|d| d == name) {
            dups.push(name.to_string());
        }
    }

    dups
}
