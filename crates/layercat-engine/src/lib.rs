//! Layercat engine - operations served on top of the catalog
//!
//! This crate implements:
//! - Report query compilation (interpolated and parameterized)
//! - The query-serving boundary used by an HTTP front door
//! - The semantic model authoring store

pub mod authoring;
pub mod query;
pub mod service;

pub use authoring::SemanticModelStore;
pub use query::{CompiledQuery, DateRange, QueryCompiler, ReportFilter, ReportQueryRequest};
pub use service::{
    CatalogService, DashboardDetail, DashboardListing, DashboardQueries, ReportListing,
    ReportQueryOutcome, ReportSummary,
};
