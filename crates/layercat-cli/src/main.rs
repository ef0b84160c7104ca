use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use layercat_core::{Config, SemanticModel, Severity, StructuralValidator, ValidationIssue};
use layercat_dbt::{parser, BuildOutcome, Catalog, SemanticManifest};
use layercat_engine::{CatalogService, DateRange, ReportFilter, ReportQueryRequest};

const PROJECT_DIR_ENV: &str = "LAYERCAT_PROJECT_DIR";

/// Layercat - four-layer metadata catalog for dbt projects
#[derive(Parser)]
#[command(name = "layercat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: layercat.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// dbt project root (overrides config and LAYERCAT_PROJECT_DIR)
    #[arg(short = 'p', long, global = true)]
    project_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show entity counts per layer and reports per dashboard
    Summary,

    /// Write the catalog export document
    Export {
        /// Output file (default: artifacts.export from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List dashboards
    Dashboards,

    /// List reports with their dimensions and measures
    Reports,

    /// Show everything feeding a dashboard
    Lineage {
        /// Dashboard id (exposure unique_id)
        dashboard_id: String,
    },

    /// Show dashboards affected by a table or view
    Impact {
        /// Table id (source unique_id) or view id (model unique_id)
        id: String,
    },

    /// Compile the SQL query for a report
    Query {
        /// Report id
        report_id: String,

        /// Field to select and group by (repeatable)
        #[arg(short, long = "group-by")]
        group_by: Vec<String>,

        /// Measure to aggregate (repeatable)
        #[arg(short, long = "metric")]
        metric: Vec<String>,

        /// Dimension filter as field=value1,value2 (repeatable)
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filter: Vec<(String, Vec<String>)>,

        /// Lower bound on the date field
        #[arg(long)]
        start: Option<String>,

        /// Upper bound on the date field
        #[arg(long)]
        end: Option<String>,

        /// Row limit
        #[arg(short, long)]
        limit: Option<u64>,

        /// Render placeholders and print bound values separately
        #[arg(long)]
        params: bool,
    },

    /// Validate a semantic model or semantic manifest JSON file
    Validate {
        /// Path to a semantic model object or a semantic_manifest.json
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    dotenvy::dotenv().ok();

    let config = load_config(&cli)?;

    if cli.verbose {
        eprintln!("{} {}", "Project root:".cyan(), config.project_root.display());
        eprintln!("{} {:?}", "Resolution policy:".cyan(), config.resolution.policy);
    }

    match cli.command {
        Commands::Summary => summary_command(&config, cli.verbose),
        Commands::Export { output } => export_command(&config, output.as_deref(), cli.verbose),
        Commands::Dashboards => dashboards_command(&config, cli.verbose),
        Commands::Reports => reports_command(&config, cli.verbose),
        Commands::Lineage { dashboard_id } => lineage_command(&config, &dashboard_id, cli.verbose),
        Commands::Impact { id } => impact_command(&config, &id, cli.verbose),
        Commands::Query {
            report_id,
            group_by,
            metric,
            filter,
            start,
            end,
            limit,
            params,
        } => {
            let date_range = if start.is_some() || end.is_some() {
                Some(DateRange { start, end })
            } else {
                None
            };
            let request = ReportQueryRequest {
                filters: Some(ReportFilter {
                    dimensions: filter.into_iter().collect(),
                    date_range,
                    limit,
                }),
                group_by,
                metrics: metric,
            };
            query_command(&config, &report_id, &request, params, cli.verbose)
        }
        Commands::Validate { path } => validate_command(&path),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "layercat=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Config file, then environment, then command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if Path::new("layercat.toml").exists() {
        Config::from_file(Path::new("layercat.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    if let Ok(dir) = std::env::var(PROJECT_DIR_ENV) {
        config.project_root = PathBuf::from(dir);
    }

    if let Some(dir) = &cli.project_dir {
        config.project_root = dir.clone();
    }

    Ok(config)
}

fn parse_filter(value: &str) -> std::result::Result<(String, Vec<String>), String> {
    let (field, values) = value
        .split_once('=')
        .ok_or_else(|| format!("expected field=value1,value2, got '{}'", value))?;

    let field = field.trim();
    if field.is_empty() {
        return Err("filter field name is empty".to_string());
    }

    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    Ok((field.to_string(), values))
}

/// Build the catalog and report what the build could not link
fn build_catalog(config: &Config, verbose: bool) -> Result<Catalog> {
    if verbose {
        eprintln!("{} {}", "Loading manifest from:".cyan(), config.manifest_path().display());
    }

    let BuildOutcome {
        catalog,
        skipped,
        resolution,
        validation,
    } = Catalog::load(config).context("Failed to build catalog")?;

    if verbose {
        for record in &skipped {
            eprintln!("  {} {} '{}': {}", "⚠ Skipped".yellow(), record.kind, record.id, record.reason);
        }
        for model in &resolution.unresolved_models {
            eprintln!(
                "  {} report '{}' matches no view ({})",
                "⚠".yellow(),
                model.report_id,
                model.reference
            );
        }
        for model in &resolution.ambiguous_models {
            eprintln!(
                "  {} report '{}' matches {} views: {}",
                "⚠".yellow(),
                model.report_id,
                model.candidates.len(),
                model.candidates.join(", ")
            );
        }
        for link in &resolution.dangling_report_refs {
            eprintln!(
                "  {} dashboard '{}' lists unknown report '{}'",
                "⚠".yellow(),
                link.dashboard_id,
                link.report_id
            );
        }
        for (report_id, issues) in &validation {
            eprintln!("  {} report '{}' has {} structural issue(s)", "⚠".yellow(), report_id, issues.len());
        }
    }

    Ok(catalog)
}

fn print_banner(title: &str) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", title.bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();
}

fn print_footer() {
    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Summary command - counts per layer
fn summary_command(config: &Config, verbose: bool) -> Result<()> {
    let catalog = build_catalog(config, verbose)?;
    let summary = catalog.summary();

    print_banner("Metadata Catalog Summary");

    println!("{} {}", "Tables:".bold(), summary.tables);
    println!("{} {}", "Views:".bold(), summary.views);
    println!("{} {}", "Reports:".bold(), summary.reports);
    println!("{} {}", "Dashboards:".bold(), summary.dashboards);

    if !summary.dashboard_reports.is_empty() {
        println!();
        println!("{}", "Dashboard hierarchy:".bold());
        for dashboard in &summary.dashboard_reports {
            println!();
            println!("  {} ({})", dashboard.name.green(), dashboard.id);
            for report in &dashboard.reports {
                println!("    - {}", report);
            }
        }
    }

    print_footer();
    Ok(())
}

/// Export command - write metadata_catalog.json
fn export_command(config: &Config, output: Option<&Path>, verbose: bool) -> Result<()> {
    let catalog = build_catalog(config, verbose)?;
    let path = output.map(Path::to_path_buf).unwrap_or_else(|| config.export_path());

    let export = catalog
        .export_to(&path)
        .with_context(|| format!("Failed to write export {}", path.display()))?;

    println!(
        "{} {} entities to {}",
        "✓ Exported".green(),
        export.entity_count(),
        path.display()
    );
    Ok(())
}

/// Dashboards command - list dashboards
fn dashboards_command(config: &Config, verbose: bool) -> Result<()> {
    let service = CatalogService::from_config(build_catalog(config, verbose)?, config);
    let dashboards = service.list_dashboards();

    print_banner("Dashboards");

    if dashboards.is_empty() {
        println!("{}", "No dashboards found".yellow());
    }

    for dashboard in &dashboards {
        println!("{} {}", dashboard.name.green().bold(), format!("({})", dashboard.id).dimmed());
        println!("  {} {}", "Type:".bold(), dashboard.dashboard_type);
        println!("  {} {}", "Maturity:".bold(), dashboard.maturity);
        if !dashboard.url.is_empty() {
            println!("  {} {}", "URL:".bold(), dashboard.url);
        }
        println!("  {} {}", "Reports:".bold(), dashboard.report_count);
        println!();
    }

    println!("{} {}", "Total:".bold(), dashboards.len());
    print_footer();
    Ok(())
}

/// Reports command - list reports
fn reports_command(config: &Config, verbose: bool) -> Result<()> {
    let service = CatalogService::from_config(build_catalog(config, verbose)?, config);
    let reports = service.list_reports();

    print_banner("Reports");

    for report in &reports {
        println!("{} {}", report.name.green().bold(), format!("({})", report.id).dimmed());
        if !report.description.is_empty() {
            println!("  {}", report.description);
        }
        if let Some(visualization) = &report.visualization_type {
            println!("  {} {}", "Visualization:".bold(), visualization);
        }
        println!("  {} {}", "Dimensions:".bold(), report.dimensions.join(", "));
        println!("  {} {}", "Measures:".bold(), report.measures.join(", "));
        println!();
    }

    println!("{} {}", "Total:".bold(), reports.len());
    print_footer();
    Ok(())
}

/// Lineage command - dashboard down to tables
fn lineage_command(config: &Config, dashboard_id: &str, verbose: bool) -> Result<()> {
    let catalog = build_catalog(config, verbose)?;
    let lineage = catalog.lineage(dashboard_id)?;

    print_banner("Dashboard Lineage");

    println!("{} {}", "Dashboard:".bold(), lineage.dashboard.name.green());
    println!();

    for report in &lineage.reports {
        println!("  {} {}", "Report:".bold(), report.name.cyan());
        for view_id in &report.views {
            if let Some(view) = lineage.views.iter().find(|v| &v.id == view_id) {
                println!("    {} {} ({})", "View:".bold(), view.relation(), view.materialization);
                for table_id in &view.tables {
                    if let Some(table) = lineage.tables.iter().find(|t| &t.id == table_id) {
                        println!("      {} {}", "Table:".bold(), table.fqn());
                    }
                }
            }
        }
    }

    println!();
    println!(
        "{} {} reports, {} views, {} tables",
        "Reachable:".bold(),
        lineage.reports.len(),
        lineage.views.len(),
        lineage.tables.len()
    );

    if !lineage.unresolved.is_empty() {
        println!();
        println!("{}", "Missing links:".yellow().bold());
        for link in &lineage.unresolved {
            println!(
                "  {} {} '{}' -> {} '{}'",
                "⚠".yellow(),
                link.from_kind,
                link.from_id,
                link.to_kind,
                link.to_id
            );
        }
    }

    print_footer();
    Ok(())
}

/// Impact command - dashboards fed by a table or view
fn impact_command(config: &Config, id: &str, verbose: bool) -> Result<()> {
    let catalog = build_catalog(config, verbose)?;

    let (kind, dashboards) = if catalog.tables().contains_key(id) {
        ("Table", catalog.dashboards_for_table(id)?)
    } else if catalog.views().contains_key(id) {
        ("View", catalog.dashboards_for_view(id)?)
    } else {
        return Err(anyhow::anyhow!(
            "'{}' is neither a table nor a view id. Use the full unique_id (e.g., 'source.project.raw.table')",
            id
        ));
    };

    print_banner("Dashboard Impact Analysis");

    println!("{} {}", format!("{}:", kind).bold(), id.green());
    println!("{} {}", "Affected dashboards:".bold(), dashboards.len());
    println!();

    if dashboards.is_empty() {
        println!("{}", "✓ No dashboards depend on this entity".green());
    } else {
        for (i, dashboard) in dashboards.iter().enumerate() {
            println!("  {}. {} ({})", i + 1, dashboard.name.yellow(), dashboard.id);
        }
    }

    print_footer();
    Ok(())
}

/// Query command - compile report SQL
fn query_command(
    config: &Config,
    report_id: &str,
    request: &ReportQueryRequest,
    params: bool,
    verbose: bool,
) -> Result<()> {
    let service = CatalogService::from_config(build_catalog(config, verbose)?, config);

    if params {
        let compiled = service.compile_report_query_parameterized(report_id, request)?;
        println!("{}", compiled.sql);
        let bound = serde_json::to_string(&compiled.params)?;
        eprintln!("{} {}", "Params:".cyan(), bound);
    } else {
        println!("{}", service.compile_report_query(report_id, request)?);
    }

    Ok(())
}

/// What a block of validation output refers to
#[derive(Debug, Clone, PartialEq, Eq)]
enum ValidationSubject {
    /// Checks on the semantic manifest document itself
    Manifest,
    /// One semantic model, by name
    Model(String),
    /// A record that could not be read as a semantic model
    Unreadable { record: String, error: String },
}

impl std::fmt::Display for ValidationSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manifest => write!(f, "semantic manifest"),
            Self::Model(name) => write!(f, "{}", name),
            Self::Unreadable { record, .. } => write!(f, "record {}", record),
        }
    }
}

/// Validation results for a file, in document order
fn collect_validation(value: serde_json::Value) -> Result<Vec<(ValidationSubject, Vec<ValidationIssue>)>> {
    let validator = StructuralValidator::new();
    let mut results = Vec::new();

    if value.get("semantic_models").is_none() {
        let model: SemanticModel = serde_json::from_value(value).context("not a semantic model")?;
        let issues = validator.issues(&model);
        results.push((ValidationSubject::Model(model.name), issues));
        return Ok(results);
    }

    let manifest_result = validator.validate_manifest(&value);
    results.push((
        ValidationSubject::Manifest,
        manifest_result.errors.into_iter().chain(manifest_result.warnings).collect(),
    ));

    let semantic = SemanticManifest::from_value(value)?;
    for (index, entry) in semantic.semantic_models.into_iter().enumerate() {
        let record = entry.key.clone().unwrap_or_else(|| format!("#{}", index));

        // One record at a time so an unnamed record does not hide the rest
        let single = SemanticManifest {
            semantic_models: vec![entry],
        };
        match parser::parse_reports(&single) {
            Ok(parsed) => {
                for skipped in parsed.skipped {
                    results.push((
                        ValidationSubject::Unreadable {
                            record: skipped.id,
                            error: skipped.reason,
                        },
                        Vec::new(),
                    ));
                }
                for report in parsed.entities.values() {
                    results.push((ValidationSubject::Model(report.name.clone()), validator.issues(report)));
                }
            }
            Err(err) => results.push((
                ValidationSubject::Unreadable {
                    record,
                    error: err.to_string(),
                },
                Vec::new(),
            )),
        }
    }

    Ok(results)
}

/// Validate command - structural checks on authored definitions
fn validate_command(path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let results = collect_validation(value).with_context(|| format!("Failed to validate {}", path.display()))?;

    let mut error_count = 0;
    for (subject, issues) in &results {
        if let ValidationSubject::Unreadable { error, .. } = subject {
            error_count += 1;
            println!("{} {}", "✗".red(), subject.to_string().bold());
            println!("    {} {}", "UNREADABLE".red(), error);
            continue;
        }

        if issues.is_empty() {
            println!("{} {}", "✓".green(), subject);
            continue;
        }

        println!("{} {}", "✗".red(), subject.to_string().bold());
        for issue in issues {
            let label = match issue.severity {
                Severity::Error => {
                    error_count += 1;
                    issue.code.as_str().red()
                }
                Severity::Warning => issue.code.as_str().yellow(),
                Severity::Info => issue.code.as_str().cyan(),
            };
            println!("    {} {} ({})", label, issue.message, issue.location.dimmed());
            if let Some(suggestion) = &issue.suggestion {
                println!("      {} {}", "→".dimmed(), suggestion);
            }
        }
    }

    println!();
    if error_count > 0 {
        println!("{} {} error(s)", "✗ Validation failed:".red().bold(), error_count);
        std::process::exit(1);
    }

    println!("{}", "✓ Validation passed".green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn manifest_issues_are_not_shadowed_by_model_names() {
        let manifest = serde_json::json!({
            "semantic_models": [
                {"name": "semantic_manifest", "entities": [{"name": "id", "type": "primary"}]},
                {"name": "semantic_manifest", "entities": [{"name": "id", "type": "primary"}]}
            ]
        });

        let results = collect_validation(manifest).unwrap();
        assert_eq!(results[0].0, ValidationSubject::Manifest);
        assert_eq!(results[0].1[0].code.as_str(), "DUPLICATE_MODEL_NAMES");
        assert!(results[1..]
            .iter()
            .any(|(subject, _)| subject == &ValidationSubject::Model("semantic_manifest".to_string())));
    }

    #[test]
    fn unnamed_record_is_reported_alongside_the_rest() {
        let manifest = serde_json::json!({
            "semantic_models": [
                {"model": "ref('stg_ces')"},
                {"name": "employment", "entities": []}
            ]
        });

        let results = collect_validation(manifest).unwrap();
        assert!(matches!(
            &results[1].0,
            ValidationSubject::Unreadable { record, .. } if record == "#0"
        ));
        assert_eq!(results[2].0, ValidationSubject::Model("employment".to_string()));
        assert_eq!(results[2].1[0].code.as_str(), "MISSING_ENTITIES");
    }

    #[test]
    fn filter_argument_parsing() {
        assert_eq!(
            parse_filter("state=CA, NY").unwrap(),
            ("state".to_string(), vec!["CA".to_string(), "NY".to_string()])
        );
        assert_eq!(parse_filter("state=").unwrap().1, Vec::<String>::new());
        assert!(parse_filter("state").is_err());
        assert!(parse_filter("=CA").is_err());
    }
}
