//! Catalog graph
//!
//! Four id-keyed collections built in one pass from project artifacts and
//! read-only afterwards.

use crate::lineage::{self, LineageResult};
use crate::manifest::ProjectArtifacts;
use crate::parser::{self, SkippedRecord};
use crate::resolver::{ReferenceResolver, ResolutionReport};
use layercat_core::{
    CatalogError, CatalogExport, Config, Dashboard, DashboardId, EntityKind, ExportMetadata,
    Report, ReportId, ResolutionPolicy, Result, StructuralValidator, Table, TableId,
    ValidationIssue, View, ViewId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Borrowed entity of any kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    Table(&'a Table),
    View(&'a View),
    Report(&'a Report),
    Dashboard(&'a Dashboard),
}

impl<'a> EntityRef<'a> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Table(_) => EntityKind::Table,
            Self::View(_) => EntityKind::View,
            Self::Report(_) => EntityKind::Report,
            Self::Dashboard(_) => EntityKind::Dashboard,
        }
    }

    pub fn id(&self) -> &'a str {
        match self {
            Self::Table(t) => &t.id,
            Self::View(v) => &v.id,
            Self::Report(r) => &r.id,
            Self::Dashboard(d) => &d.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Self::Table(t) => &t.name,
            Self::View(v) => &v.name,
            Self::Report(r) => &r.name,
            Self::Dashboard(d) => &d.name,
        }
    }

    /// JSON rendering of the entity with all its fields
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Table(t) => serde_json::to_value(t),
            Self::View(v) => serde_json::to_value(v),
            Self::Report(r) => serde_json::to_value(r),
            Self::Dashboard(d) => serde_json::to_value(d),
        }
    }
}

/// Everything produced by one catalog build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub catalog: Catalog,
    /// Records excluded by the parsers
    pub skipped: Vec<SkippedRecord>,
    pub resolution: ResolutionReport,
    /// Structural issues of upstream reports, keyed by report id
    pub validation: BTreeMap<ReportId, Vec<ValidationIssue>>,
}

/// Per-dashboard line of a [`CatalogSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub id: DashboardId,
    pub name: String,
    /// Names of the dashboard's reports that exist in the catalog
    pub reports: Vec<String>,
}

/// Entity counts per layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub tables: usize,
    pub views: usize,
    pub reports: usize,
    pub dashboards: usize,
    pub dashboard_reports: Vec<DashboardSummary>,
}

/// The four-layer metadata catalog
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    project_path: String,
    dbt_version: Option<String>,
    manifest_checksum: Option<String>,
    tables: BTreeMap<TableId, Table>,
    views: BTreeMap<ViewId, View>,
    reports: BTreeMap<ReportId, Report>,
    dashboards: BTreeMap<DashboardId, Dashboard>,
}

impl Catalog {
    /// Load artifacts per `config` and build
    pub fn load(config: &Config) -> Result<BuildOutcome> {
        let artifacts = ProjectArtifacts::load(config)?;
        Self::build(&artifacts, config.resolution.policy)
    }

    /// Parse, resolve and validate in a single pass
    ///
    /// Resolution runs over the parsed collections in manifest order; the
    /// catalog stores them keyed by id afterwards.
    pub fn build(artifacts: &ProjectArtifacts, policy: ResolutionPolicy) -> Result<BuildOutcome> {
        let tables = parser::parse_tables(&artifacts.manifest)?;
        let views = parser::parse_views(&artifacts.manifest)?;
        let mut reports = parser::parse_reports(&artifacts.semantic_manifest)?;
        let dashboards = parser::parse_dashboards(&artifacts.manifest)?;

        let resolution =
            ReferenceResolver::new(policy).resolve(&mut reports.entities, &views.entities, &dashboards.entities);

        let validator = StructuralValidator::new();
        let validation: BTreeMap<ReportId, Vec<ValidationIssue>> = reports
            .entities
            .values()
            .filter_map(|report| {
                let issues = validator.issues(report);
                (!issues.is_empty()).then(|| (report.id.clone(), issues))
            })
            .collect();

        let mut skipped = tables.skipped;
        skipped.extend(views.skipped);
        skipped.extend(reports.skipped);
        skipped.extend(dashboards.skipped);

        let catalog = Self {
            project_path: artifacts.project_root.display().to_string(),
            dbt_version: artifacts.manifest.metadata.dbt_version.clone(),
            manifest_checksum: Some(artifacts.manifest_checksum.clone()),
            tables: tables.entities.into_iter().collect(),
            views: views.entities.into_iter().collect(),
            reports: reports.entities.into_iter().collect(),
            dashboards: dashboards.entities.into_iter().collect(),
        };

        tracing::info!(
            tables = catalog.tables.len(),
            views = catalog.views.len(),
            reports = catalog.reports.len(),
            dashboards = catalog.dashboards.len(),
            skipped = skipped.len(),
            "catalog built"
        );

        Ok(BuildOutcome {
            catalog,
            skipped,
            resolution,
            validation,
        })
    }

    /// Rebuild a catalog from an export
    pub fn from_export(export: CatalogExport) -> Self {
        Self {
            project_path: export.metadata.project_path,
            dbt_version: export.metadata.dbt_version,
            manifest_checksum: export.metadata.manifest_checksum,
            tables: export.tables,
            views: export.views,
            reports: export.reports,
            dashboards: export.dashboards,
        }
    }

    /// Snapshot of the catalog, stamped with the current time
    pub fn to_export(&self) -> CatalogExport {
        let mut metadata = ExportMetadata::now(self.project_path.clone(), self.dbt_version.clone());
        metadata.manifest_checksum = self.manifest_checksum.clone();

        CatalogExport {
            metadata,
            tables: self.tables.clone(),
            views: self.views.clone(),
            reports: self.reports.clone(),
            dashboards: self.dashboards.clone(),
        }
    }

    /// Write the export document to `path`
    pub fn export_to(&self, path: &Path) -> Result<CatalogExport> {
        let export = self.to_export();
        export.save_to_file(path)?;
        tracing::info!(path = %path.display(), entities = export.entity_count(), "catalog exported");
        Ok(export)
    }

    pub fn project_path(&self) -> &str {
        &self.project_path
    }

    pub fn dbt_version(&self) -> Option<&str> {
        self.dbt_version.as_deref()
    }

    pub fn manifest_checksum(&self) -> Option<&str> {
        self.manifest_checksum.as_deref()
    }

    pub fn tables(&self) -> &BTreeMap<TableId, Table> {
        &self.tables
    }

    pub fn views(&self) -> &BTreeMap<ViewId, View> {
        &self.views
    }

    pub fn reports(&self) -> &BTreeMap<ReportId, Report> {
        &self.reports
    }

    pub fn dashboards(&self) -> &BTreeMap<DashboardId, Dashboard> {
        &self.dashboards
    }

    pub fn table(&self, id: &str) -> Result<&Table> {
        self.tables
            .get(id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Table, id))
    }

    pub fn view(&self, id: &str) -> Result<&View> {
        self.views
            .get(id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::View, id))
    }

    pub fn report(&self, id: &str) -> Result<&Report> {
        self.reports
            .get(id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Report, id))
    }

    pub fn dashboard(&self, id: &str) -> Result<&Dashboard> {
        self.dashboards
            .get(id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Dashboard, id))
    }

    /// Look up an entity of any kind
    pub fn get(&self, kind: EntityKind, id: &str) -> Result<EntityRef<'_>> {
        match kind {
            EntityKind::Table => self.table(id).map(EntityRef::Table),
            EntityKind::View => self.view(id).map(EntityRef::View),
            EntityKind::Report => self.report(id).map(EntityRef::Report),
            EntityKind::Dashboard => self.dashboard(id).map(EntityRef::Dashboard),
        }
    }

    /// Everything feeding a dashboard
    pub fn lineage(&self, dashboard_id: &str) -> Result<LineageResult> {
        let dashboard = self.dashboard(dashboard_id)?;
        Ok(lineage::trace(self, dashboard))
    }

    /// Existing reports of a dashboard, in dashboard order
    pub fn reports_for_dashboard(&self, dashboard_id: &str) -> Result<Vec<&Report>> {
        let dashboard = self.dashboard(dashboard_id)?;
        let mut seen = BTreeSet::new();

        Ok(dashboard
            .reports
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| self.reports.get(id))
            .collect())
    }

    /// Existing views of a report, in report order
    pub fn views_for_report(&self, report_id: &str) -> Result<Vec<&View>> {
        let report = self.report(report_id)?;
        let mut seen = BTreeSet::new();

        Ok(report
            .views
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| self.views.get(id))
            .collect())
    }

    /// Existing tables of a view, in view order
    pub fn tables_for_view(&self, view_id: &str) -> Result<Vec<&Table>> {
        let view = self.view(view_id)?;
        let mut seen = BTreeSet::new();

        Ok(view
            .tables
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| self.tables.get(id))
            .collect())
    }

    /// Dashboards that depend on a view through one of their reports
    pub fn dashboards_for_view(&self, view_id: &str) -> Result<Vec<&Dashboard>> {
        self.view(view_id)?;
        Ok(self.dashboards_reaching(|report| report.views.iter().any(|id| id == view_id)))
    }

    /// Dashboards that depend on a table through any view
    pub fn dashboards_for_table(&self, table_id: &str) -> Result<Vec<&Dashboard>> {
        self.table(table_id)?;

        let views: BTreeSet<&str> = self
            .views
            .values()
            .filter(|view| view.tables.iter().any(|id| id == table_id))
            .map(|view| view.id.as_str())
            .collect();

        Ok(self.dashboards_reaching(|report| report.views.iter().any(|id| views.contains(id.as_str()))))
    }

    fn dashboards_reaching(&self, feeds: impl Fn(&Report) -> bool) -> Vec<&Dashboard> {
        let reports: BTreeSet<&str> = self
            .reports
            .values()
            .filter(|report| feeds(report))
            .map(|report| report.id.as_str())
            .collect();

        self.dashboards
            .values()
            .filter(|dashboard| dashboard.reports.iter().any(|id| reports.contains(id.as_str())))
            .collect()
    }

    /// Counts per layer and report names per dashboard
    pub fn summary(&self) -> CatalogSummary {
        let dashboard_reports = self
            .dashboards
            .values()
            .map(|dashboard| DashboardSummary {
                id: dashboard.id.clone(),
                name: dashboard.name.clone(),
                reports: dashboard
                    .reports
                    .iter()
                    .filter_map(|id| self.reports.get(id))
                    .map(|report| report.name.clone())
                    .collect(),
            })
            .collect();

        CatalogSummary {
            tables: self.tables.len(),
            views: self.views.len(),
            reports: self.reports.len(),
            dashboards: self.dashboards.len(),
            dashboard_reports,
        }
    }
}
