//! Entity parsers, one per layer
//!
//! Each parser turns one manifest section into an id-keyed collection.
//! A malformed record is skipped (logged, recorded in [`Parsed::skipped`]);
//! a record without its identifying `name` aborts the pass for that kind.

use crate::manifest::{Manifest, SemanticManifest};
use layercat_core::{
    CatalogError, Dashboard, Dimension, Entity, EntityKind, Materialization, Maturity, Measure,
    Meta, Report, Result, Table, View,
};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Prefix that marks a dependency id as a source reference
pub const SOURCE_PREFIX: &str = "source.";

/// Meta key that lists a dashboard's report ids
pub const REPORTS_META_KEY: &str = "reports";

/// A record excluded from its collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub kind: EntityKind,
    pub id: String,
    pub reason: String,
}

impl SkippedRecord {
    fn into_error(self) -> CatalogError {
        CatalogError::ParseSkipped {
            kind: self.kind,
            id: self.id,
            reason: self.reason,
        }
    }
}

/// Output of one parse pass
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    /// Kept records in document order
    pub entities: IndexMap<String, T>,
    pub skipped: Vec<SkippedRecord>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            entities: IndexMap::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> Parsed<T> {
    fn keep(&mut self, id: String, entity: T) {
        self.entities.insert(id, entity);
    }

    fn skip(&mut self, kind: EntityKind, id: &str, reason: impl Into<String>) {
        let record = SkippedRecord {
            kind,
            id: id.to_string(),
            reason: reason.into(),
        };
        tracing::warn!("{}", record.clone().into_error());
        self.skipped.push(record);
    }
}

/// `name` is the identifying field of every record kind
fn require_name(kind: EntityKind, id: &str, record: &Value) -> Result<String> {
    record
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CatalogError::MissingIdentifier {
            kind,
            id: id.to_string(),
            field: "name".to_string(),
        })
}

fn decode<T: DeserializeOwned>(record: &Value) -> std::result::Result<T, String> {
    T::deserialize(record).map_err(|e| e.to_string())
}

#[derive(Deserialize)]
struct DependsOnRecord {
    #[serde(default)]
    nodes: Option<Vec<String>>,
}

impl DependsOnRecord {
    fn into_nodes(record: Option<Self>) -> Vec<String> {
        record.and_then(|d| d.nodes).unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct SourceRecord {
    schema: String,
    database: String,
    source_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    meta: Option<Meta>,
}

/// Parse the manifest's `sources` section into Tables
pub fn parse_tables(manifest: &Manifest) -> Result<Parsed<Table>> {
    let mut parsed = Parsed::default();

    for (id, record) in &manifest.sources {
        if !record.is_object() {
            parsed.skip(EntityKind::Table, id, "record is not an object");
            continue;
        }
        let name = require_name(EntityKind::Table, id, record)?;

        match decode::<SourceRecord>(record) {
            Ok(source) => parsed.keep(
                id.clone(),
                Table {
                    id: id.clone(),
                    name,
                    schema: source.schema,
                    database: source.database,
                    source_name: source.source_name,
                    description: source.description.unwrap_or_default(),
                    meta: source.meta.unwrap_or_default(),
                },
            ),
            Err(reason) => parsed.skip(EntityKind::Table, id, reason),
        }
    }

    Ok(parsed)
}

#[derive(Deserialize)]
struct NodeConfigRecord {
    #[serde(default)]
    materialized: Option<String>,
}

#[derive(Deserialize)]
struct ModelRecord {
    schema: String,
    database: String,
    #[serde(default)]
    config: Option<NodeConfigRecord>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    depends_on: Option<DependsOnRecord>,
    #[serde(default)]
    meta: Option<Meta>,
}

/// Parse the manifest's model nodes into Views
///
/// `tables` keeps only upstream ids that look like source references.
pub fn parse_views(manifest: &Manifest) -> Result<Parsed<View>> {
    let mut parsed = Parsed::default();

    for (id, record) in manifest.models() {
        let name = require_name(EntityKind::View, id, record)?;

        match decode::<ModelRecord>(record) {
            Ok(model) => {
                let tables = DependsOnRecord::into_nodes(model.depends_on)
                    .into_iter()
                    .filter(|dep| dep.starts_with(SOURCE_PREFIX))
                    .collect();

                let materialization = model
                    .config
                    .and_then(|c| c.materialized)
                    .map(Materialization::from)
                    .unwrap_or_default();

                parsed.keep(
                    id.clone(),
                    View {
                        id: id.clone(),
                        name,
                        schema: model.schema,
                        database: model.database,
                        materialization,
                        description: model.description.unwrap_or_default(),
                        tables,
                        meta: model.meta.unwrap_or_default(),
                    },
                )
            }
            Err(reason) => parsed.skip(EntityKind::View, id, reason),
        }
    }

    Ok(parsed)
}

#[derive(Deserialize)]
struct SemanticModelRecord {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    entities: Option<Vec<Entity>>,
    #[serde(default)]
    dimensions: Option<Vec<Dimension>>,
    #[serde(default)]
    measures: Option<Vec<Measure>>,
    #[serde(default)]
    meta: Option<Meta>,
}

/// Parse the semantic manifest's models into Reports
///
/// `views` is left empty; see [`crate::resolver`].
pub fn parse_reports(semantic: &SemanticManifest) -> Result<Parsed<Report>> {
    let mut parsed = Parsed::default();

    if semantic.is_empty() {
        tracing::warn!("no semantic models found in semantic manifest");
        return Ok(parsed);
    }

    for (index, entry) in semantic.semantic_models.iter().enumerate() {
        if !entry.record.is_object() {
            let id = entry.key.clone().unwrap_or_else(|| format!("#{}", index));
            parsed.skip(EntityKind::Report, &id, "record is not an object");
            continue;
        }

        let (id, name) = match &entry.key {
            Some(key) => {
                let name = entry
                    .record
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| key.clone());
                (key.clone(), name)
            }
            None => {
                let name = require_name(EntityKind::Report, &format!("#{}", index), &entry.record)?;
                (name.clone(), name)
            }
        };

        if parsed.entities.contains_key(&id) {
            parsed.skip(EntityKind::Report, &id, "duplicate semantic model id");
            continue;
        }

        match decode::<SemanticModelRecord>(&entry.record) {
            Ok(model) => parsed.keep(
                id.clone(),
                Report {
                    id,
                    name,
                    description: model.description.unwrap_or_default(),
                    model: model.model.unwrap_or_default(),
                    entities: model.entities.unwrap_or_default(),
                    dimensions: model.dimensions.unwrap_or_default(),
                    measures: model.measures.unwrap_or_default(),
                    views: Vec::new(),
                    meta: model.meta.unwrap_or_default(),
                },
            ),
            Err(reason) => parsed.skip(EntityKind::Report, &id, reason),
        }
    }

    Ok(parsed)
}

#[derive(Deserialize)]
struct ExposureRecord {
    #[serde(default, rename = "type")]
    exposure_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    owner: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    maturity: Option<Maturity>,
    #[serde(default)]
    depends_on: Option<DependsOnRecord>,
    #[serde(default)]
    meta: Option<Meta>,
}

/// Report ids declared under `meta.reports`
fn declared_reports(meta: &Meta) -> std::result::Result<Vec<String>, String> {
    match meta.get(REPORTS_META_KEY) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("meta.{} entries must be strings", REPORTS_META_KEY))
            })
            .collect(),
        Some(_) => Err(format!("meta.{} must be a list of report ids", REPORTS_META_KEY)),
    }
}

/// Parse the manifest's `exposures` section into Dashboards
///
/// Report ids are read from meta and not checked against the Report
/// collection here.
pub fn parse_dashboards(manifest: &Manifest) -> Result<Parsed<Dashboard>> {
    let mut parsed = Parsed::default();

    for (id, record) in &manifest.exposures {
        if !record.is_object() {
            parsed.skip(EntityKind::Dashboard, id, "record is not an object");
            continue;
        }
        let name = require_name(EntityKind::Dashboard, id, record)?;

        let exposure = match decode::<ExposureRecord>(record) {
            Ok(exposure) => exposure,
            Err(reason) => {
                parsed.skip(EntityKind::Dashboard, id, reason);
                continue;
            }
        };

        let meta = exposure.meta.unwrap_or_default();
        let reports = match declared_reports(&meta) {
            Ok(reports) => reports,
            Err(reason) => {
                parsed.skip(EntityKind::Dashboard, id, reason);
                continue;
            }
        };

        // Owner fields may be null upstream; keep only string values
        let owner = exposure
            .owner
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| value.as_str().map(|v| (key, v.to_string())))
            .collect();

        parsed.keep(
            id.clone(),
            Dashboard {
                id: id.clone(),
                name,
                dashboard_type: exposure.exposure_type.unwrap_or_else(|| "dashboard".to_string()),
                description: exposure.description.unwrap_or_default(),
                url: exposure.url.unwrap_or_default(),
                owner,
                maturity: exposure.maturity.unwrap_or_default(),
                reports,
                depends_on: DependsOnRecord::into_nodes(exposure.depends_on),
                meta,
            },
        );
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use layercat_core::{Aggregation, EntityType};
    use pretty_assertions::assert_eq;

    fn manifest(json: &str) -> Manifest {
        Manifest::from_str(json).unwrap()
    }

    #[test]
    fn tables_skip_records_missing_required_fields() {
        let manifest = manifest(
            r#"{"sources": {
                "source.bls.raw.ces": {
                    "name": "ces", "schema": "raw", "database": "bls",
                    "source_name": "raw", "description": null
                },
                "source.bls.raw.broken": {"name": "broken", "schema": "raw"}
            }}"#,
        );

        let parsed = parse_tables(&manifest).unwrap();
        assert_eq!(parsed.entities.len(), 1);
        assert_eq!(parsed.entities["source.bls.raw.ces"].description, "");
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].id, "source.bls.raw.broken");
        assert!(parsed.skipped[0].reason.contains("database"));
    }

    #[test]
    fn missing_name_aborts_the_pass() {
        let manifest = manifest(
            r#"{"sources": {"source.bls.raw.ces": {"schema": "raw", "database": "bls", "source_name": "raw"}}}"#,
        );

        let err = parse_tables(&manifest).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::MissingIdentifier { kind: EntityKind::Table, ref field, .. } if field == "name"
        ));
    }

    #[test]
    fn views_keep_only_source_dependencies() {
        let manifest = manifest(
            r#"{"nodes": {
                "model.bls.stg_ces": {
                    "resource_type": "model", "name": "stg_ces",
                    "schema": "analytics", "database": "bls",
                    "depends_on": {"nodes": ["source.bls.raw.ces", "model.bls.base", "source.bls.raw.series"]}
                },
                "model.bls.fct_jobs": {
                    "resource_type": "model", "name": "fct_jobs",
                    "schema": "analytics", "database": "bls",
                    "config": {"materialized": "incremental"}
                },
                "test.bls.unique_id": {"resource_type": "test"}
            }}"#,
        );

        let parsed = parse_views(&manifest).unwrap();
        assert_eq!(parsed.entities.len(), 2);

        let stg = &parsed.entities["model.bls.stg_ces"];
        assert_eq!(stg.tables, vec!["source.bls.raw.ces", "source.bls.raw.series"]);
        assert_eq!(stg.materialization, Materialization::View);

        let fct = &parsed.entities["model.bls.fct_jobs"];
        assert_eq!(fct.materialization, Materialization::Incremental);
        assert!(fct.tables.is_empty());
    }

    #[test]
    fn reports_copy_model_reference_verbatim() {
        let semantic = SemanticManifest::from_str(
            r#"{"semantic_models": {
                "semantic_model.bls.ces": {
                    "name": "ces_employment",
                    "model": "{{ ref('stg_ces') }}",
                    "entities": [{"name": "series", "type": "primary"}],
                    "dimensions": [
                        {"name": "year_month", "type": "time", "expr": "period_date",
                         "type_params": {"time_granularity": "month"}}
                    ],
                    "measures": [{"name": "employment", "agg": "sum", "expr": "value"}],
                    "meta": {"visualization_type": "line"}
                },
                "semantic_model.bls.unnamed": {"model": "ref('x')"}
            }}"#,
        )
        .unwrap();

        let parsed = parse_reports(&semantic).unwrap();
        let report = &parsed.entities["semantic_model.bls.ces"];
        assert_eq!(report.name, "ces_employment");
        assert_eq!(report.model, "{{ ref('stg_ces') }}");
        assert_eq!(report.entities[0].entity_type, EntityType::Primary);
        assert_eq!(report.measures[0].agg, Some(Aggregation::Sum));
        assert!(report.views.is_empty());

        // Keyed shape falls back to the id for a missing name
        assert_eq!(parsed.entities["semantic_model.bls.unnamed"].name, "semantic_model.bls.unnamed");
    }

    #[test]
    fn reports_from_array_use_name_as_id() {
        let semantic = SemanticManifest::from_str(
            r#"{"semantic_models": [
                {"name": "ces", "model": "ref('stg_ces')"},
                {"name": "bad", "entities": [{"name": "e", "type": "sideways"}]}
            ]}"#,
        )
        .unwrap();

        let parsed = parse_reports(&semantic).unwrap();
        assert!(parsed.entities.contains_key("ces"));
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].id, "bad");
    }

    #[test]
    fn unnamed_report_in_array_aborts() {
        let semantic = SemanticManifest::from_str(r#"{"semantic_models": [{"model": "ref('x')"}]}"#).unwrap();
        assert!(matches!(
            parse_reports(&semantic),
            Err(CatalogError::MissingIdentifier { kind: EntityKind::Report, .. })
        ));
    }

    #[test]
    fn non_object_report_records_are_skipped_in_both_shapes() {
        let array = SemanticManifest::from_str(
            r#"{"semantic_models": ["ces", {"name": "jolts", "model": "ref('stg_jolts')"}]}"#,
        )
        .unwrap();
        let parsed = parse_reports(&array).unwrap();
        assert!(parsed.entities.contains_key("jolts"));
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].id, "#0");

        let keyed = SemanticManifest::from_str(
            r#"{"semantic_models": {"sm.ces": "ces", "sm.jolts": {"name": "jolts"}}}"#,
        )
        .unwrap();
        let parsed = parse_reports(&keyed).unwrap();
        assert_eq!(parsed.entities.len(), 1);
        assert_eq!(parsed.skipped[0].id, "sm.ces");
    }

    #[test]
    fn views_keep_document_order() {
        let manifest = manifest(
            r#"{"nodes": {
                "model.z.stg_ces": {"resource_type": "model", "name": "stg_ces", "schema": "analytics", "database": "bls"},
                "model.a.ces": {"resource_type": "model", "name": "ces", "schema": "legacy", "database": "bls"}
            }}"#,
        );

        let parsed = parse_views(&manifest).unwrap();
        let ids: Vec<&str> = parsed.entities.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["model.z.stg_ces", "model.a.ces"]);
    }

    #[test]
    fn dashboards_apply_defaults_and_read_meta_reports() {
        let manifest = manifest(
            r#"{"exposures": {
                "exposure.bls.jobs": {
                    "name": "jobs_dashboard",
                    "owner": {"name": "Labor Team", "email": null},
                    "depends_on": {"nodes": ["model.bls.stg_ces"]},
                    "meta": {"reports": ["semantic_model.bls.ces", "semantic_model.bls.missing"]}
                },
                "exposure.bls.bad_maturity": {"name": "x", "maturity": "extreme"},
                "exposure.bls.bad_reports": {"name": "y", "meta": {"reports": "ces"}}
            }}"#,
        );

        let parsed = parse_dashboards(&manifest).unwrap();
        assert_eq!(parsed.entities.len(), 1);
        assert_eq!(parsed.skipped.len(), 2);

        let dashboard = &parsed.entities["exposure.bls.jobs"];
        assert_eq!(dashboard.dashboard_type, "dashboard");
        assert_eq!(dashboard.maturity, Maturity::Low);
        assert_eq!(dashboard.url, "");
        assert_eq!(dashboard.owner.len(), 1);
        assert_eq!(dashboard.reports, vec!["semantic_model.bls.ces", "semantic_model.bls.missing"]);
        assert_eq!(dashboard.depends_on, vec!["model.bls.stg_ces"]);
    }
}
