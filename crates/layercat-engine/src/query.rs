//! Report query compiler
//!
//! Renders one fixed query shape against the first view a report resolved
//! to:
//!
//! ```text
//! SELECT <fields>, <AGG(expr) AS measure>... FROM <schema.view>
//!   [WHERE <filters>] [GROUP BY <fields>] [LIMIT n]
//! ```
//!
//! [`QueryCompiler::compile`] interpolates filter values verbatim and does
//! no escaping. [`QueryCompiler::compile_parameterized`] renders the same
//! shape with `?` placeholders instead.

use layercat_core::{CatalogError, Measure, QueryDefaults, Report, Result, View, ViewId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive bounds on the date field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Filter criteria for a report query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    /// Allowed values per field; an empty list adds no condition
    #[serde(default)]
    pub dimensions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Runtime request for one report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportQueryRequest {
    #[serde(default)]
    pub filters: Option<ReportFilter>,
    /// Fields to select and group by; empty means the report's defaults
    #[serde(default)]
    pub group_by: Vec<String>,
    /// Measure names to aggregate; empty means the first measure
    #[serde(default)]
    pub metrics: Vec<String>,
}

impl ReportQueryRequest {
    pub fn with_filters(filters: ReportFilter) -> Self {
        Self {
            filters: Some(filters),
            ..Self::default()
        }
    }
}

/// Query text plus bound values for its placeholders, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<String>,
}

#[derive(Debug)]
enum Predicate<'a> {
    In { field: &'a str, values: &'a [String] },
    AtLeast { field: &'a str, value: &'a str },
    AtMost { field: &'a str, value: &'a str },
}

#[derive(Debug)]
struct QueryPlan<'a> {
    relation: String,
    select: Vec<String>,
    predicates: Vec<Predicate<'a>>,
    group_by: Vec<String>,
    limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Inline,
    Placeholder,
}

/// Compiles report requests into SQL
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    defaults: QueryDefaults,
}

impl QueryCompiler {
    pub fn new(defaults: QueryDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &QueryDefaults {
        &self.defaults
    }

    /// Query with filter values interpolated into the text
    pub fn compile(
        &self,
        report: &Report,
        views: &BTreeMap<ViewId, View>,
        request: &ReportQueryRequest,
    ) -> Result<String> {
        let plan = self.plan(report, views, request)?;
        Ok(render(&plan, Binding::Inline).sql)
    }

    /// Query with `?` placeholders for filter values
    pub fn compile_parameterized(
        &self,
        report: &Report,
        views: &BTreeMap<ViewId, View>,
        request: &ReportQueryRequest,
    ) -> Result<CompiledQuery> {
        let plan = self.plan(report, views, request)?;
        Ok(render(&plan, Binding::Placeholder))
    }

    fn plan<'a>(
        &'a self,
        report: &Report,
        views: &BTreeMap<ViewId, View>,
        request: &'a ReportQueryRequest,
    ) -> Result<QueryPlan<'a>> {
        let relation = report
            .views
            .first()
            .and_then(|id| views.get(id))
            .map(View::relation)
            .ok_or_else(|| CatalogError::NoTargetView {
                report_id: report.id.clone(),
            })?;

        let fields: Vec<String> = if request.group_by.is_empty() {
            report
                .dimensions
                .iter()
                .take(self.defaults.default_dimensions)
                .map(|d| d.sql().to_string())
                .collect()
        } else {
            request.group_by.clone()
        };

        // Unknown metric names are dropped
        let measures: Vec<&Measure> = if request.metrics.is_empty() {
            report.measures.iter().take(1).collect()
        } else {
            request
                .metrics
                .iter()
                .filter_map(|name| report.find_measure(name))
                .collect()
        };

        if fields.is_empty() && measures.is_empty() {
            return Err(CatalogError::EmptySelection {
                report_id: report.id.clone(),
            });
        }

        let group_by = if request.group_by.is_empty() {
            fields.iter().take(1).cloned().collect()
        } else {
            request.group_by.clone()
        };

        let mut select = fields;
        select.extend(measures.into_iter().map(|m| self.aggregate(m)));

        let mut predicates = Vec::new();
        let mut limit = None;

        if let Some(filters) = &request.filters {
            for (field, values) in &filters.dimensions {
                if !values.is_empty() {
                    predicates.push(Predicate::In {
                        field: field.as_str(),
                        values: values.as_slice(),
                    });
                }
            }

            if let Some(range) = &filters.date_range {
                let field = self.defaults.date_field.as_str();
                if let Some(start) = &range.start {
                    predicates.push(Predicate::AtLeast { field, value: start.as_str() });
                }
                if let Some(end) = &range.end {
                    predicates.push(Predicate::AtMost { field, value: end.as_str() });
                }
            }

            limit = filters.limit;
        }

        tracing::debug!(
            report = %report.id,
            relation = %relation,
            fields = select.len(),
            predicates = predicates.len(),
            "planned report query"
        );

        Ok(QueryPlan {
            relation,
            select,
            predicates,
            group_by,
            limit,
        })
    }

    fn aggregate(&self, measure: &Measure) -> String {
        let agg = measure.agg.unwrap_or(self.defaults.default_aggregation);
        format!(
            "{}({}) AS {}",
            agg.as_str().to_uppercase(),
            measure.sql(),
            measure.name
        )
    }
}

fn render(plan: &QueryPlan<'_>, binding: Binding) -> CompiledQuery {
    let mut params = Vec::new();
    let mut bind = |value: &str| match binding {
        Binding::Inline => format!("'{}'", value),
        Binding::Placeholder => {
            params.push(value.to_string());
            "?".to_string()
        }
    };

    let conditions: Vec<String> = plan
        .predicates
        .iter()
        .map(|predicate| match predicate {
            Predicate::In { field, values } => {
                let list: Vec<String> = values.iter().map(|v| bind(v)).collect();
                let separator = if binding == Binding::Inline { "," } else { ", " };
                format!("{} IN ({})", field, list.join(separator))
            }
            Predicate::AtLeast { field, value } => format!("{} >= {}", field, bind(value)),
            Predicate::AtMost { field, value } => format!("{} <= {}", field, bind(value)),
        })
        .collect();

    let mut sql = format!("SELECT {} FROM {}", plan.select.join(", "), plan.relation);

    if !conditions.is_empty() {
        sql.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
    }

    if !plan.group_by.is_empty() {
        sql.push_str(&format!(" GROUP BY {}", plan.group_by.join(", ")));
    }

    if let Some(limit) = plan.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    CompiledQuery { sql, params }
}
