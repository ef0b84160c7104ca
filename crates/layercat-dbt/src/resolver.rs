//! Reference resolution
//!
//! Reports point at their view through an unstructured model reference
//! (usually the text of a `ref()` call). A view matches when its name or
//! its id occurs anywhere in that string. Views are scanned in manifest
//! document order, so the first match is the first matching model node.

use layercat_core::{
    Dashboard, DashboardId, Report, ReportId, ResolutionPolicy, View, ViewId,
};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Target model named by a `ref('...')` call, if the string contains one
///
/// Two-argument refs (`ref('package', 'model')`) yield the model name.
pub fn ref_target(reference: &str) -> Option<&str> {
    static REF_CALL: OnceLock<Option<Regex>> = OnceLock::new();

    let pattern = REF_CALL
        .get_or_init(|| {
            Regex::new(r#"ref\(\s*['"]([^'"]+)['"]\s*(?:,\s*['"]([^'"]+)['"]\s*)?\)"#).ok()
        })
        .as_ref()?;

    let captures = pattern.captures(reference)?;
    captures
        .get(2)
        .or_else(|| captures.get(1))
        .map(|m| m.as_str())
}

/// Report whose reference matched no view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedModel {
    pub report_id: ReportId,
    pub reference: String,
    /// Model named inside `ref()`, when one could be extracted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_target: Option<String>,
}

/// Report whose reference matched more than one view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousModel {
    pub report_id: ReportId,
    pub reference: String,
    /// Every matching view, in view order
    pub candidates: Vec<ViewId>,
}

/// Report id declared by a dashboard but absent from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingReportRef {
    pub dashboard_id: DashboardId,
    pub report_id: ReportId,
}

/// Everything resolution could not link cleanly
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub unresolved_models: Vec<UnresolvedModel>,
    pub ambiguous_models: Vec<AmbiguousModel>,
    pub dangling_report_refs: Vec<DanglingReportRef>,
}

impl ResolutionReport {
    /// True when every reference resolved to exactly one target
    pub fn is_clean(&self) -> bool {
        self.unresolved_models.is_empty()
            && self.ambiguous_models.is_empty()
            && self.dangling_report_refs.is_empty()
    }
}

/// Links reports to views and checks dashboard report ids
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceResolver {
    policy: ResolutionPolicy,
}

impl ReferenceResolver {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    /// All views matching `reference`, in iteration order of `views`
    ///
    /// An empty reference matches nothing. Views with an empty name can
    /// only match by id.
    pub fn match_views<'a>(reference: &str, views: impl IntoIterator<Item = &'a View>) -> Vec<ViewId> {
        if reference.is_empty() {
            return Vec::new();
        }

        views
            .into_iter()
            .filter(|view| {
                (!view.name.is_empty() && reference.contains(view.name.as_str()))
                    || reference.contains(view.id.as_str())
            })
            .map(|view| view.id.clone())
            .collect()
    }

    /// Fill `Report::views` for every report and record what failed to link
    pub fn resolve(
        &self,
        reports: &mut IndexMap<ReportId, Report>,
        views: &IndexMap<ViewId, View>,
        dashboards: &IndexMap<DashboardId, Dashboard>,
    ) -> ResolutionReport {
        let mut outcome = ResolutionReport::default();

        for report in reports.values_mut() {
            let matches = Self::match_views(&report.model, views.values());

            if matches.is_empty() {
                tracing::debug!(report = %report.id, reference = %report.model, "no view matches report model");
                outcome.unresolved_models.push(UnresolvedModel {
                    report_id: report.id.clone(),
                    reference: report.model.clone(),
                    ref_target: ref_target(&report.model).map(str::to_string),
                });
                report.views = Vec::new();
                continue;
            }

            if matches.len() > 1 {
                tracing::debug!(
                    report = %report.id,
                    candidates = matches.len(),
                    "report model matches several views"
                );
                outcome.ambiguous_models.push(AmbiguousModel {
                    report_id: report.id.clone(),
                    reference: report.model.clone(),
                    candidates: matches.clone(),
                });
            }

            report.views = match self.policy {
                ResolutionPolicy::AllMatches => matches,
                ResolutionPolicy::FirstMatch => matches.into_iter().take(1).collect(),
                ResolutionPolicy::Strict if matches.len() > 1 => Vec::new(),
                ResolutionPolicy::Strict => matches,
            };
        }

        for dashboard in dashboards.values() {
            for report_id in &dashboard.reports {
                if !reports.contains_key(report_id) {
                    outcome.dangling_report_refs.push(DanglingReportRef {
                        dashboard_id: dashboard.id.clone(),
                        report_id: report_id.clone(),
                    });
                }
            }
        }

        outcome
    }
}
