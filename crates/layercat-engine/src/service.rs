//! Query-serving boundary
//!
//! Read-only operations over a built catalog, shaped for an HTTP layer to
//! serialize directly.

use crate::query::{CompiledQuery, QueryCompiler, ReportFilter, ReportQueryRequest};
use layercat_core::{Config, Maturity, Meta, Report, ReportId, Result};
use layercat_dbt::{Catalog, LineageResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Meta key naming a report's chart type
pub const VISUALIZATION_META_KEY: &str = "visualization_type";

/// Meta key naming a report's front-end component
pub const COMPONENT_META_KEY: &str = "component";

/// One row of [`CatalogService::list_dashboards`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardListing {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub dashboard_type: String,
    pub description: String,
    pub url: String,
    pub maturity: Maturity,
    /// Declared report ids, resolved or not
    pub report_count: usize,
}

/// Report as shown inside a dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: ReportId,
    pub name: String,
    pub description: String,
    pub visualization_type: Option<String>,
    pub component: Option<String>,
}

impl ReportSummary {
    fn from_report(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            name: report.name.clone(),
            description: report.description.clone(),
            visualization_type: report.meta_str(VISUALIZATION_META_KEY).map(str::to_string),
            component: report.meta_str(COMPONENT_META_KEY).map(str::to_string),
        }
    }
}

/// Full dashboard record with its existing reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardDetail {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub dashboard_type: String,
    pub description: String,
    pub url: String,
    pub owner: BTreeMap<String, String>,
    pub maturity: Maturity,
    pub reports: Vec<ReportSummary>,
    pub meta: Meta,
}

/// One row of [`CatalogService::list_reports`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportListing {
    pub id: ReportId,
    pub name: String,
    pub description: String,
    pub dimensions: Vec<String>,
    pub measures: Vec<String>,
    pub visualization_type: Option<String>,
}

/// Compilation result for one report of a dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportQueryOutcome {
    Compiled { sql: String },
    Failed { code: String, error: String },
}

impl ReportQueryOutcome {
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Compiled { sql } => Some(sql),
            Self::Failed { .. } => None,
        }
    }
}

/// Queries for every report of a dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardQueries {
    pub dashboard_id: String,
    pub dashboard_name: String,
    pub reports: BTreeMap<ReportId, ReportQueryOutcome>,
}

/// Catalog plus query compiler, shared by all request handlers
#[derive(Debug, Clone)]
pub struct CatalogService {
    catalog: Catalog,
    compiler: QueryCompiler,
}

impl CatalogService {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            compiler: QueryCompiler::default(),
        }
    }

    /// Service using the query defaults from `config`
    pub fn from_config(catalog: Catalog, config: &Config) -> Self {
        Self {
            catalog,
            compiler: QueryCompiler::new(config.query.clone()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn list_dashboards(&self) -> Vec<DashboardListing> {
        self.catalog
            .dashboards()
            .values()
            .map(|d| DashboardListing {
                id: d.id.clone(),
                name: d.name.clone(),
                dashboard_type: d.dashboard_type.clone(),
                description: d.description.clone(),
                url: d.url.clone(),
                maturity: d.maturity,
                report_count: d.reports.len(),
            })
            .collect()
    }

    pub fn get_dashboard(&self, dashboard_id: &str) -> Result<DashboardDetail> {
        let dashboard = self.catalog.dashboard(dashboard_id)?;
        let reports = self
            .catalog
            .reports_for_dashboard(dashboard_id)?
            .into_iter()
            .map(ReportSummary::from_report)
            .collect();

        Ok(DashboardDetail {
            id: dashboard.id.clone(),
            name: dashboard.name.clone(),
            dashboard_type: dashboard.dashboard_type.clone(),
            description: dashboard.description.clone(),
            url: dashboard.url.clone(),
            owner: dashboard.owner.clone(),
            maturity: dashboard.maturity,
            reports,
            meta: dashboard.meta.clone(),
        })
    }

    pub fn get_lineage(&self, dashboard_id: &str) -> Result<LineageResult> {
        self.catalog.lineage(dashboard_id)
    }

    pub fn compile_report_query(&self, report_id: &str, request: &ReportQueryRequest) -> Result<String> {
        let report = self.catalog.report(report_id)?;
        self.compiler.compile(report, self.catalog.views(), request)
    }

    pub fn compile_report_query_parameterized(
        &self,
        report_id: &str,
        request: &ReportQueryRequest,
    ) -> Result<CompiledQuery> {
        let report = self.catalog.report(report_id)?;
        self.compiler
            .compile_parameterized(report, self.catalog.views(), request)
    }

    pub fn list_reports(&self) -> Vec<ReportListing> {
        self.catalog
            .reports()
            .values()
            .map(|r| ReportListing {
                id: r.id.clone(),
                name: r.name.clone(),
                description: r.description.clone(),
                dimensions: r.dimensions.iter().map(|d| d.name.clone()).collect(),
                measures: r.measures.iter().map(|m| m.name.clone()).collect(),
                visualization_type: r.meta_str(VISUALIZATION_META_KEY).map(str::to_string),
            })
            .collect()
    }

    /// One query per declared report, sharing `filters`
    ///
    /// A report that fails to compile (including one missing from the
    /// catalog) gets a `Failed` entry; only an unknown dashboard is an error.
    pub fn compile_dashboard_queries(
        &self,
        dashboard_id: &str,
        filters: Option<ReportFilter>,
    ) -> Result<DashboardQueries> {
        let dashboard = self.catalog.dashboard(dashboard_id)?;
        let request = ReportQueryRequest {
            filters,
            ..ReportQueryRequest::default()
        };

        let mut seen = BTreeSet::new();
        let reports = dashboard
            .reports
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .map(|report_id| {
                let outcome = match self.compile_report_query(report_id, &request) {
                    Ok(sql) => ReportQueryOutcome::Compiled { sql },
                    Err(err) => {
                        tracing::warn!(report = %report_id, "{}", err);
                        ReportQueryOutcome::Failed {
                            code: err.code().to_string(),
                            error: err.to_string(),
                        }
                    }
                };
                (report_id.clone(), outcome)
            })
            .collect();

        Ok(DashboardQueries {
            dashboard_id: dashboard.id.clone(),
            dashboard_name: dashboard.name.clone(),
            reports,
        })
    }
}
