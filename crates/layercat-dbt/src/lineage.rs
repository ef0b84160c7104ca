//! Lineage traversal: Dashboard -> Report -> View -> Table
//!
//! The walk keeps the maximal sub-graph reachable through ids that exist.
//! Each entity appears once, at its first-seen position.

use crate::catalog::Catalog;
use layercat_core::{Dashboard, EntityKind, Report, Table, View};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An edge whose target id is absent from its collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedLink {
    pub from_kind: EntityKind,
    pub from_id: String,
    pub to_kind: EntityKind,
    pub to_id: String,
}

/// Sub-graph feeding one dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageResult {
    pub dashboard: Dashboard,
    pub reports: Vec<Report>,
    pub views: Vec<View>,
    pub tables: Vec<Table>,
    /// Ids skipped during the walk
    #[serde(default)]
    pub unresolved: Vec<UnresolvedLink>,
}

impl LineageResult {
    pub fn report_ids(&self) -> Vec<&str> {
        self.reports.iter().map(|r| r.id.as_str()).collect()
    }

    pub fn view_ids(&self) -> Vec<&str> {
        self.views.iter().map(|v| v.id.as_str()).collect()
    }

    pub fn table_ids(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.id.as_str()).collect()
    }
}

fn missing(from_kind: EntityKind, from_id: &str, to_kind: EntityKind, to_id: &str) -> UnresolvedLink {
    UnresolvedLink {
        from_kind,
        from_id: from_id.to_string(),
        to_kind,
        to_id: to_id.to_string(),
    }
}

/// Walk the catalog from `dashboard`
pub(crate) fn trace(catalog: &Catalog, dashboard: &Dashboard) -> LineageResult {
    let mut seen_reports = HashSet::new();
    let mut seen_views = HashSet::new();
    let mut seen_tables = HashSet::new();

    let mut reports = Vec::new();
    let mut views = Vec::new();
    let mut tables = Vec::new();
    let mut unresolved = Vec::new();

    for report_id in &dashboard.reports {
        let Some(report) = catalog.reports().get(report_id) else {
            unresolved.push(missing(EntityKind::Dashboard, &dashboard.id, EntityKind::Report, report_id));
            continue;
        };
        if !seen_reports.insert(report_id.as_str()) {
            continue;
        }
        reports.push(report.clone());

        for view_id in &report.views {
            let Some(view) = catalog.views().get(view_id) else {
                unresolved.push(missing(EntityKind::Report, &report.id, EntityKind::View, view_id));
                continue;
            };
            if !seen_views.insert(view_id.as_str()) {
                continue;
            }
            views.push(view.clone());

            for table_id in &view.tables {
                let Some(table) = catalog.tables().get(table_id) else {
                    unresolved.push(missing(EntityKind::View, &view.id, EntityKind::Table, table_id));
                    continue;
                };
                if seen_tables.insert(table_id.as_str()) {
                    tables.push(table.clone());
                }
            }
        }
    }

    if !unresolved.is_empty() {
        tracing::debug!(
            dashboard = %dashboard.id,
            skipped = unresolved.len(),
            "lineage skipped missing ids"
        );
    }

    LineageResult {
        dashboard: dashboard.clone(),
        reports,
        views,
        tables,
        unresolved,
    }
}
