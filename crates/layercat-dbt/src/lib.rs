//! dbt artifact parsing and catalog construction
//!
//! This crate handles:
//! - Loading manifest.json and semantic_manifest.json
//! - Parsing sources, models, semantic models and exposures into entities
//! - Resolving report model references to views
//! - Lineage and impact traversal over the catalog graph

pub mod catalog;
pub mod lineage;
pub mod manifest;
pub mod parser;
pub mod resolver;

pub use catalog::{BuildOutcome, Catalog, CatalogSummary, DashboardSummary, EntityRef};
pub use lineage::{LineageResult, UnresolvedLink};
pub use manifest::{Manifest, ManifestError, ManifestMetadata, ProjectArtifacts, SemanticManifest, SemanticModelEntry};
pub use parser::{Parsed, SkippedRecord};
pub use resolver::{ref_target, AmbiguousModel, DanglingReportRef, ReferenceResolver, ResolutionReport, UnresolvedModel};
