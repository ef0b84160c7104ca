//! Test fixtures for catalog integration tests
//!
//! A small labor-statistics project: three raw sources, four models, three
//! semantic models and two exposures. One exposure references a report
//! that does not exist and one semantic model points at no known view.

#![allow(dead_code)]

use serde_json::{json, Value};

pub const PROJECT_ROOT: &str = "/projects/labor";

fn source(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "resource_type": "source",
        "schema": "raw",
        "database": "labor",
        "source_name": "bls",
        "description": description,
        "meta": {"loader": "bls_api"}
    })
}

fn model(name: &str, materialized: &str, depends_on: &[&str]) -> Value {
    json!({
        "name": name,
        "resource_type": "model",
        "schema": "analytics",
        "database": "labor",
        "config": {"materialized": materialized},
        "description": format!("{} model", name),
        "depends_on": {"nodes": depends_on}
    })
}

/// manifest.json for the labor project
pub fn manifest() -> Value {
    json!({
        "metadata": {
            "dbt_schema_version": "https://schemas.getdbt.com/dbt/manifest/v11.json",
            "dbt_version": "1.7.4"
        },
        "sources": {
            "source.labor.bls.ces": source("ces", "Current Employment Statistics"),
            "source.labor.bls.jolts": source("jolts", "Job Openings and Labor Turnover"),
            "source.labor.bls.laus": source("laus", "Local Area Unemployment Statistics")
        },
        "nodes": {
            "model.labor.stg_ces": model("stg_ces", "view", &["source.labor.bls.ces"]),
            "model.labor.stg_jolts": model("stg_jolts", "view", &["source.labor.bls.jolts"]),
            "model.labor.fct_labor_market": model(
                "fct_labor_market",
                "table",
                &["model.labor.stg_ces", "model.labor.stg_jolts", "source.labor.bls.ces", "source.labor.bls.jolts"]
            ),
            "model.labor.stg_laus": model("stg_laus", "incremental", &["source.labor.bls.laus", "source.labor.bls.retired"]),
            "test.labor.not_null_stg_ces_value": {
                "name": "not_null_stg_ces_value",
                "resource_type": "test",
                "depends_on": {"nodes": ["model.labor.stg_ces"]}
            }
        },
        "exposures": {
            "exposure.labor.jobs_overview": {
                "name": "jobs_overview",
                "type": "dashboard",
                "description": "National jobs picture",
                "url": "https://dash.example.com/jobs",
                "owner": {"name": "Labor Analytics", "email": "labor@example.com"},
                "maturity": "high",
                "depends_on": {"nodes": ["model.labor.fct_labor_market"]},
                "meta": {"reports": [
                    "semantic_model.labor.employment",
                    "semantic_model.labor.openings",
                    "semantic_model.labor.retired_report"
                ]}
            },
            "exposure.labor.local_areas": {
                "name": "local_areas",
                "depends_on": {"nodes": ["model.labor.stg_laus"]},
                "meta": {"reports": ["semantic_model.labor.unemployment"]}
            }
        }
    })
}

/// semantic_manifest.json for the labor project, keyed-object shape
pub fn semantic_manifest() -> Value {
    json!({
        "semantic_models": {
            "semantic_model.labor.employment": {
                "name": "employment",
                "description": "Nonfarm payroll employment",
                "model": "{{ ref('stg_ces') }}",
                "entities": [{"name": "series", "type": "primary", "expr": "series_id"}],
                "dimensions": [
                    {"name": "year_month", "type": "time", "expr": "period_date",
                     "type_params": {"time_granularity": "month"}},
                    {"name": "industry", "type": "categorical"},
                    {"name": "state", "type": "categorical", "expr": "state_code"},
                    {"name": "seasonal", "type": "categorical"}
                ],
                "measures": [
                    {"name": "employment", "agg": "sum", "expr": "value"},
                    {"name": "series_count", "agg": "count_distinct", "expr": "series_id"}
                ],
                "meta": {"visualization_type": "line", "component": "TimeSeriesChart"}
            },
            "semantic_model.labor.openings": {
                "name": "openings",
                "model": "{{ ref('stg_jolts') }}",
                "entities": [{"name": "series", "type": "primary"}],
                "dimensions": [
                    {"name": "year_month", "type": "time",
                     "type_params": {"time_granularity": "month"}},
                    {"name": "industry", "type": "categorical"}
                ],
                "measures": [{"name": "openings", "expr": "value"}],
                "meta": {"visualization_type": "bar"}
            },
            "semantic_model.labor.unemployment": {
                "name": "unemployment",
                "model": "{{ ref('local_area_rates') }}",
                "entities": [],
                "dimensions": [
                    {"name": "area", "type": "categorical"},
                    {"name": "area", "type": "categorical"},
                    {"name": "year_month", "type": "time"}
                ],
                "measures": [{"name": "rate", "agg": "average"}]
            }
        }
    })
}

pub fn manifest_json() -> String {
    manifest().to_string()
}

pub fn semantic_manifest_json() -> String {
    semantic_manifest().to_string()
}

/// Write both artifacts under `root/target`
pub fn write_project(root: &std::path::Path) {
    let target = root.join("target");
    std::fs::create_dir_all(&target).unwrap();
    std::fs::write(target.join("manifest.json"), manifest_json()).unwrap();
    std::fs::write(target.join("semantic_manifest.json"), semantic_manifest_json()).unwrap();
}
