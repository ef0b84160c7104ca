//! Layercat Core
//!
//! Core domain model with stable, versioned types.
//! Never rename validation codes - they are part of the public API.

pub mod config;
pub mod diagnostic;
pub mod entity;
pub mod error;
pub mod export;
pub mod validation;

pub use config::{ArtifactPaths, Config, ConfigError, QueryDefaults, ResolutionConfig, ResolutionPolicy};
pub use diagnostic::{Severity, ValidationCode, ValidationIssue, ValidationResult};
pub use entity::{
    Aggregation, Dashboard, DashboardId, Dimension, DimensionType, DimensionTypeParams, Entity,
    EntityKind, EntityType, Materialization, Maturity, Measure, Meta, NodeRelation, Report,
    ReportId, SemanticModel, Table, TableId, TimeGranularity, View, ViewId,
};
pub use error::{CatalogError, Result};
pub use export::{checksum, CatalogExport, ExportMetadata, ExportVersion};
pub use validation::{SemanticDefinition, StructuralValidator};
