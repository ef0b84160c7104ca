//! Catalog entities for the four layers
//!
//! Table -> View -> Report -> Dashboard. Each entity is identified by a
//! string id that is unique within its own collection.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Table id (dbt source unique_id, e.g. "source.bls.raw.ces")
pub type TableId = String;

/// View id (dbt model unique_id, e.g. "model.bls.stg_ces")
pub type ViewId = String;

/// Report id (semantic model id)
pub type ReportId = String;

/// Dashboard id (dbt exposure unique_id)
pub type DashboardId = String;

/// Free-form metadata attached to an entity
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Upstream artifacts write `null` for unset flags
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The four entity kinds of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Table,
    View,
    Report,
    Dashboard,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::View => write!(f, "view"),
            Self::Report => write!(f, "report"),
            Self::Dashboard => write!(f, "dashboard"),
        }
    }
}

/// Base layer: a raw source relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub schema: String,
    pub database: String,
    pub source_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub meta: Meta,
}

impl Table {
    /// Fully qualified relation name
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.name)
    }
}

/// How a view is materialized in the warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Materialization {
    View,
    Table,
    Incremental,
    Ephemeral,
    MaterializedView,
    /// Custom materializations are kept verbatim
    Other(String),
}

impl Default for Materialization {
    fn default() -> Self {
        Self::View
    }
}

impl From<String> for Materialization {
    fn from(value: String) -> Self {
        match value.as_str() {
            "view" => Self::View,
            "table" => Self::Table,
            "incremental" => Self::Incremental,
            "ephemeral" => Self::Ephemeral,
            "materialized_view" => Self::MaterializedView,
            _ => Self::Other(value),
        }
    }
}

impl From<Materialization> for String {
    fn from(value: Materialization) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for Materialization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::Table => write!(f, "table"),
            Self::Incremental => write!(f, "incremental"),
            Self::Ephemeral => write!(f, "ephemeral"),
            Self::MaterializedView => write!(f, "materialized_view"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Second layer: a relation derived from tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: ViewId,
    pub name: String,
    pub schema: String,
    pub database: String,
    #[serde(default)]
    pub materialization: Materialization,
    #[serde(default)]
    pub description: String,
    /// Upstream table ids
    #[serde(default)]
    pub tables: Vec<TableId>,
    #[serde(default)]
    pub meta: Meta,
}

impl View {
    /// Relation name used as a query target (`schema.name`)
    pub fn relation(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Entity type inside a semantic definition
///
/// `natural` appears in manifests written by dbt's semantic layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Primary,
    Foreign,
    Unique,
    Natural,
}

/// Joinable key of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            expr: None,
            description: None,
            role: None,
            label: None,
        }
    }
}

/// Dimension type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    Time,
    Categorical,
}

/// Time granularity for time dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGranularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Type parameters carried by time dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionTypeParams {
    pub time_granularity: TimeGranularity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_params: Option<serde_json::Value>,
}

/// Attribute for grouping or filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    /// SQL expression; the bare name is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Required when `dimension_type` is `Time`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_params: Option<DimensionTypeParams>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_partition: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Dimension {
    /// Create a categorical dimension
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension_type: DimensionType::Categorical,
            expr: None,
            description: None,
            type_params: None,
            is_partition: false,
            label: None,
        }
    }

    /// Create a time dimension with the given granularity
    pub fn time(name: impl Into<String>, granularity: TimeGranularity) -> Self {
        Self {
            dimension_type: DimensionType::Time,
            type_params: Some(DimensionTypeParams {
                time_granularity: granularity,
                validity_params: None,
            }),
            ..Self::categorical(name)
        }
    }

    pub fn with_expr(mut self, expr: impl Into<String>) -> Self {
        self.expr = Some(expr.into());
        self
    }

    /// SQL rendering: the expression when present, else the name
    pub fn sql(&self) -> &str {
        self.expr.as_deref().unwrap_or(&self.name)
    }
}

/// Aggregation applied by a measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Average,
    Count,
    Min,
    Max,
    CountDistinct,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
            Self::CountDistinct => "count_distinct",
        }
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregatable metric component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agg: Option<Aggregation>,
    /// SQL expression; the measure name is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agg_time_dimension: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub create_metric: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Measure {
    pub fn new(name: impl Into<String>, agg: Aggregation) -> Self {
        Self {
            name: name.into(),
            agg: Some(agg),
            expr: None,
            description: None,
            agg_time_dimension: None,
            create_metric: false,
            label: None,
        }
    }

    pub fn with_expr(mut self, expr: impl Into<String>) -> Self {
        self.expr = Some(expr.into());
        self
    }

    pub fn sql(&self) -> &str {
        self.expr.as_deref().unwrap_or(&self.name)
    }
}

/// Third layer: a semantic model built on a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Raw, unresolved model reference (e.g. "ref('stg_ces')")
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    /// Resolved form of `model`; filled by the resolver only
    #[serde(default)]
    pub views: Vec<ViewId>,
    #[serde(default)]
    pub meta: Meta,
}

impl Report {
    pub fn find_measure(&self, name: &str) -> Option<&Measure> {
        self.measures.iter().find(|m| m.name == name)
    }

    /// String value stored under `key` in the report's meta
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(|v| v.as_str())
    }
}

/// Maturity of a dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maturity {
    Low,
    Medium,
    High,
}

impl Default for Maturity {
    fn default() -> Self {
        Self::Low
    }
}

impl std::fmt::Display for Maturity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Top layer: a consumer-facing grouping of reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: DashboardId,
    pub name: String,
    #[serde(rename = "type")]
    pub dashboard_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    /// Owner details (name, email)
    #[serde(default)]
    pub owner: BTreeMap<String, String>,
    #[serde(default)]
    pub maturity: Maturity,
    /// Declared report ids; unknown ids are kept for inspection
    #[serde(default)]
    pub reports: Vec<ReportId>,
    /// Raw dependency list from the manifest
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub meta: Meta,
}

/// Database location of an authored semantic model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRelation {
    pub alias: String,
    pub schema_name: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
}

/// Semantic model as authored through the editor boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub node_relation: NodeRelation,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materialization_keeps_custom_names() {
        let parsed: Materialization = serde_json::from_str("\"incremental\"").unwrap();
        assert_eq!(parsed, Materialization::Incremental);

        let custom: Materialization = serde_json::from_str("\"dynamic_table\"").unwrap();
        assert_eq!(custom, Materialization::Other("dynamic_table".to_string()));
        assert_eq!(serde_json::to_string(&custom).unwrap(), "\"dynamic_table\"");
    }

    #[test]
    fn dimension_sql_falls_back_to_name() {
        let dim = Dimension::categorical("industry");
        assert_eq!(dim.sql(), "industry");

        let dim = dim.with_expr("industry_code");
        assert_eq!(dim.sql(), "industry_code");
    }

    #[test]
    fn entity_type_field_is_named_type() {
        let entity = Entity::new("series", EntityType::Primary);
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "primary");
        assert!(json.get("expr").is_none());
    }

    #[test]
    fn natural_entities_from_dbt_manifests_parse() {
        let entity: Entity = serde_json::from_str(r#"{"name": "area", "type": "natural"}"#).unwrap();
        assert_eq!(entity.entity_type, EntityType::Natural);
    }

    #[test]
    fn null_flags_read_as_false() {
        let dim: Dimension =
            serde_json::from_str(r#"{"name": "area", "type": "categorical", "is_partition": null}"#)
                .unwrap();
        assert!(!dim.is_partition);

        let measure: Measure =
            serde_json::from_str(r#"{"name": "jobs", "agg": "sum", "create_metric": null}"#).unwrap();
        assert!(!measure.create_metric);
    }

    #[test]
    fn aggregation_snake_case() {
        let agg: Aggregation = serde_json::from_str("\"count_distinct\"").unwrap();
        assert_eq!(agg, Aggregation::CountDistinct);
        assert_eq!(agg.as_str(), "count_distinct");
    }

    #[test]
    fn view_relation_is_schema_dot_name() {
        let view = View {
            id: "model.bls.stg_ces".to_string(),
            name: "stg_ces".to_string(),
            schema: "analytics".to_string(),
            database: "bls".to_string(),
            materialization: Materialization::default(),
            description: String::new(),
            tables: vec![],
            meta: Meta::new(),
        };
        assert_eq!(view.relation(), "analytics.stg_ces");
    }
}
