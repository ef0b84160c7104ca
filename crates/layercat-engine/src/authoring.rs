//! Authoring store for semantic models
//!
//! An owned, name-keyed collection. Callers that share it across threads
//! wrap it in their own lock; the store itself takes `&mut self` for every
//! mutation.

use layercat_core::{
    CatalogError, Dimension, Entity, EntityKind, Measure, Result, SemanticModel,
    StructuralValidator,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct SemanticModelStore {
    models: BTreeMap<String, SemanticModel>,
    validator: StructuralValidator,
}

impl SemanticModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    fn check(&self, model: &SemanticModel) -> Result<()> {
        let result = self.validator.validate(model);
        if result.valid {
            Ok(())
        } else {
            tracing::debug!(model = %model.name, errors = result.errors.len(), "semantic model rejected");
            Err(CatalogError::ValidationFailed(result.errors))
        }
    }

    /// Apply `change` to a copy of the stored model; commit only if it still validates
    fn amend(&mut self, name: &str, change: impl FnOnce(&mut SemanticModel)) -> Result<&SemanticModel> {
        let mut candidate = self.get(name)?.clone();
        change(&mut candidate);
        self.check(&candidate)?;

        let slot = self
            .models
            .get_mut(name)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Report, name))?;
        *slot = candidate;
        Ok(&*slot)
    }

    /// Insert a new model; validation runs before the duplicate check
    pub fn create(&mut self, model: SemanticModel) -> Result<&SemanticModel> {
        self.check(&model)?;

        if self.models.contains_key(&model.name) {
            return Err(CatalogError::conflict("semantic model", model.name));
        }

        let name = model.name.clone();
        tracing::info!(model = %name, "semantic model created");
        Ok(self.models.entry(name).or_insert(model))
    }

    pub fn get(&self, name: &str) -> Result<&SemanticModel> {
        self.models
            .get(name)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Report, name))
    }

    /// All models in name order
    pub fn list(&self) -> Vec<&SemanticModel> {
        self.models.values().collect()
    }

    /// Replace the model stored under `name`, re-keying it on rename
    pub fn update(&mut self, name: &str, model: SemanticModel) -> Result<&SemanticModel> {
        if !self.models.contains_key(name) {
            return Err(CatalogError::not_found(EntityKind::Report, name));
        }

        self.check(&model)?;

        if model.name != name && self.models.contains_key(&model.name) {
            return Err(CatalogError::conflict("semantic model", model.name));
        }

        self.models.remove(name);
        let new_name = model.name.clone();
        tracing::info!(model = %name, renamed_to = %new_name, "semantic model updated");
        Ok(self.models.entry(new_name).or_insert(model))
    }

    pub fn delete(&mut self, name: &str) -> Result<SemanticModel> {
        let removed = self
            .models
            .remove(name)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Report, name))?;
        tracing::info!(model = %name, "semantic model deleted");
        Ok(removed)
    }

    pub fn add_entity(&mut self, name: &str, entity: Entity) -> Result<&Entity> {
        if self.get(name)?.entities.iter().any(|e| e.name == entity.name) {
            return Err(CatalogError::conflict("entity", entity.name));
        }
        let model = self.amend(name, |m| m.entities.push(entity))?;
        Ok(&model.entities[model.entities.len() - 1])
    }

    /// Rejects a dimension that would leave the model invalid, e.g. a time
    /// dimension without a granularity
    pub fn add_dimension(&mut self, name: &str, dimension: Dimension) -> Result<&Dimension> {
        if self.get(name)?.dimensions.iter().any(|d| d.name == dimension.name) {
            return Err(CatalogError::conflict("dimension", dimension.name));
        }
        let model = self.amend(name, |m| m.dimensions.push(dimension))?;
        Ok(&model.dimensions[model.dimensions.len() - 1])
    }

    pub fn add_measure(&mut self, name: &str, measure: Measure) -> Result<&Measure> {
        if self.get(name)?.measures.iter().any(|m| m.name == measure.name) {
            return Err(CatalogError::conflict("measure", measure.name));
        }
        let model = self.amend(name, |m| m.measures.push(measure))?;
        Ok(&model.measures[model.measures.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layercat_core::{Aggregation, EntityType, NodeRelation, TimeGranularity, ValidationCode};

    fn model(name: &str) -> SemanticModel {
        SemanticModel {
            name: name.to_string(),
            description: None,
            node_relation: NodeRelation {
                alias: "stg_ces".to_string(),
                schema_name: "analytics".to_string(),
                database: "labor".to_string(),
                relation_name: None,
            },
            entities: vec![Entity::new("series", EntityType::Primary)],
            dimensions: vec![Dimension::time("year_month", TimeGranularity::Month)],
            measures: vec![Measure::new("employment", Aggregation::Sum)],
            primary_entity: None,
            label: None,
        }
    }

    #[test]
    fn invalid_model_fails_validation_before_conflict() {
        let mut store = SemanticModelStore::new();
        store.create(model("r1")).unwrap();

        let mut invalid = model("r1");
        invalid.entities.clear();

        match store.create(invalid).unwrap_err() {
            CatalogError::ValidationFailed(issues) => {
                assert_eq!(issues[0].code, ValidationCode::MissingEntities);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn update_renames_and_detects_collisions() {
        let mut store = SemanticModelStore::new();
        store.create(model("r1")).unwrap();
        store.create(model("r2")).unwrap();

        let err = store.update("r1", model("r2")).unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { .. }));

        store.update("r1", model("r3")).unwrap();
        let names: Vec<&str> = store.list().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["r2", "r3"]);

        assert_eq!(store.update("r1", model("r1")).unwrap_err().code(), "NotFound");
    }

    #[test]
    fn update_rejects_invalid_model_and_keeps_stored_one() {
        let mut store = SemanticModelStore::new();
        store.create(model("r1")).unwrap();

        let mut invalid = model("r1");
        invalid.entities = vec![Entity::new("series", EntityType::Foreign)];
        invalid.description = Some("never stored".to_string());

        match store.update("r1", invalid).unwrap_err() {
            CatalogError::ValidationFailed(issues) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].code, ValidationCode::MissingPrimaryEntity);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }

        let stored = store.get("r1").unwrap();
        assert_eq!(stored.description, None);
        assert_eq!(stored.entities[0].entity_type, EntityType::Primary);
    }

    #[test]
    fn time_dimension_without_granularity_is_not_added() {
        let mut store = SemanticModelStore::new();
        store.create(model("r1")).unwrap();

        let mut period = Dimension::time("period", TimeGranularity::Month);
        period.type_params = None;

        match store.add_dimension("r1", period).unwrap_err() {
            CatalogError::ValidationFailed(issues) => {
                assert_eq!(issues[0].code, ValidationCode::MissingTimeGranularity);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }

        let stored = store.get("r1").unwrap();
        assert_eq!(stored.dimensions.len(), 1);
        assert!(StructuralValidator::new().validate(stored).valid);
    }

    #[test]
    fn update_in_place_keeps_key() {
        let mut store = SemanticModelStore::new();
        store.create(model("r1")).unwrap();

        let mut changed = model("r1");
        changed.description = Some("payroll employment".to_string());
        store.update("r1", changed).unwrap();

        assert_eq!(store.get("r1").unwrap().description.as_deref(), Some("payroll employment"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let mut store = SemanticModelStore::new();
        store.create(model("r1")).unwrap();

        assert_eq!(store.delete("r1").unwrap().name, "r1");
        assert!(store.is_empty());
        assert!(matches!(
            store.delete("r1").unwrap_err(),
            CatalogError::NotFound { kind: EntityKind::Report, .. }
        ));
    }

    #[test]
    fn nested_adds_reject_duplicate_names() {
        let mut store = SemanticModelStore::new();
        store.create(model("r1")).unwrap();

        store.add_entity("r1", Entity::new("industry", EntityType::Foreign)).unwrap();
        assert!(store.add_entity("r1", Entity::new("series", EntityType::Unique)).is_err());

        store.add_dimension("r1", Dimension::categorical("state")).unwrap();
        let err = store.add_dimension("r1", Dimension::categorical("state")).unwrap_err();
        assert_eq!(err.to_string(), "dimension with name 'state' already exists");

        let added = store.add_measure("r1", Measure::new("series_count", Aggregation::Count)).unwrap();
        assert_eq!(added.name, "series_count");
        assert!(store.add_measure("r1", Measure::new("employment", Aggregation::Max)).is_err());

        assert_eq!(store.add_measure("nope", Measure::new("m", Aggregation::Sum)).unwrap_err().code(), "NotFound");

        let stored = store.get("r1").unwrap();
        assert_eq!((stored.entities.len(), stored.dimensions.len(), stored.measures.len()), (2, 2, 2));
    }
}
