//! CensusLens - census indicator analytics
//!
//! A CLI tool that classifies census attribute columns, reconciles entity
//! names with a boundary file, and reports rankings, correlations and
//! insights for a chosen attribute.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (load failure, invalid arguments, malformed data)
//!   2 - The requested attribute is not a column of the data file

mod analysis;
mod cli;
mod config;
mod error;
mod labels;
mod loader;
mod models;
mod report;
mod resolver;
mod snapshot;
mod taxonomy;

use analysis::{Comparison, CorrelationMatrix, MetricsEngine};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use error::QueryError;
use models::{
    AttributeAnalysis, CorrelationSection, Direction, Level, Report, ReportMetadata, Scope,
};
use resolver::NameResolver;
use snapshot::{Snapshot, SnapshotStore, TaxonomySource};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const EXIT_ATTRIBUTE_NOT_FOUND: i32 = 2;

fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("CensusLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .censuslens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize columns, category rules, name overrides, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Load both sources and build the snapshot.
fn load_snapshot(args: &Args, config: &Config, store: &SnapshotStore) -> Result<()> {
    let level = Level::from(args.level);
    let data_path = args.data.as_deref().context("--data is required")?;

    println!("📥 Loading {} data: {}", level, data_path.display());
    let dataset = loader::load_table(data_path, &config.data.schema(level))
        .with_context(|| format!("Failed to load {}", data_path.display()))?;

    let features = match args.geo {
        Some(ref geo_path) => {
            println!("🗺️  Loading boundaries: {}", geo_path.display());
            loader::load_features(geo_path)
                .with_context(|| format!("Failed to load {}", geo_path.display()))?
        }
        None => Vec::new(),
    };

    let taxonomy = match level {
        Level::State => TaxonomySource::Rules(config.taxonomy.rules.clone()),
        Level::District => TaxonomySource::Fixed(taxonomy::district_table()),
    };
    let overrides = config.resolver.table();
    if overrides.is_empty() {
        debug!("No name overrides configured");
    } else {
        debug!("Using {} name override(s)", overrides.len());
    }
    let resolver = NameResolver::new(overrides);

    let snapshot = Snapshot::build(dataset, features, &taxonomy, resolver)
        .with_context(|| format!("Malformed data in {}", data_path.display()))?;
    store.replace(snapshot);

    Ok(())
}

/// Print the taxonomy with short labels (--list-attributes).
fn print_attributes(snapshot: &Snapshot) {
    let taxonomy = snapshot.taxonomy();

    if taxonomy.is_empty() {
        println!("\nNo attribute column matched a category.");
    }
    for category in taxonomy.categories() {
        println!("\n{} ({})", category.label, category.columns.len());
        for column in &category.columns {
            println!(
                "   {:<50} {}",
                column,
                labels::short_label(column, snapshot.level())
            );
        }
    }

    let uncategorized: Vec<&String> = snapshot
        .columns()
        .iter()
        .filter(|c| taxonomy.category_of(c).is_none())
        .collect();
    if !uncategorized.is_empty() {
        println!("\nUncategorized ({})", uncategorized.len());
        for column in uncategorized {
            println!("   {}", column);
        }
    }
}

/// Translate --state, --entities and --search into a query scope.
fn build_scope(args: &Args, snapshot: &Snapshot) -> Result<Scope> {
    let mut scope = Scope::all();

    if let Some(ref state) = args.state {
        let key = snapshot
            .state_key(state)
            .with_context(|| format!("State '{}' has no districts in the data", state))?;
        scope = scope.within(key);
    }

    if let Some(ref names) = args.entities {
        let mut keys = Vec::new();
        for name in names.iter().filter(|n| !n.trim().is_empty()) {
            match snapshot.entity_key(name) {
                Some(key) => keys.push(key),
                None => warn!("'{}' is not in the data, skipping it", name.trim()),
            }
        }
        if keys.is_empty() {
            bail!("None of the selected entities are in the data");
        }
        scope = scope.with_keys(keys);
    }

    if let Some(ref term) = args.search {
        scope = scope.matching(term.as_str());
    }

    Ok(scope)
}

/// Everything computed for the chosen attribute.
///
/// `Ok(None)` when the attribute exists but the scope holds no values.
fn analyze(
    engine: &MetricsEngine,
    snapshot: &Snapshot,
    attribute: &str,
    scope: &Scope,
    direction: Direction,
    top_n: usize,
) -> Result<Option<AttributeAnalysis>, QueryError> {
    let ranking = engine.rank(scope, attribute, direction)?;
    let Some(summary) = engine.summary(attribute, scope)? else {
        warn!("No values for '{}' in the selected entities", attribute);
        return Ok(None);
    };

    let names = |keys: Vec<String>| -> Vec<String> {
        keys.iter()
            .map(|k| snapshot.display_name(k).to_string())
            .collect()
    };

    Ok(Some(AttributeAnalysis {
        attribute: attribute.to_string(),
        label: labels::short_label(attribute, snapshot.level()),
        category: snapshot.taxonomy().category_of(attribute).map(String::from),
        summary,
        top: names(engine.top_n(scope, attribute, top_n)?),
        bottom: names(engine.bottom_n(scope, attribute, top_n)?),
        ranking,
        gaps: engine.gap_analysis(scope, attribute)?,
        insights: engine.insights(attribute, scope)?,
    }))
}

/// Correlation matrix over the attribute's category, or just the attribute.
fn category_matrix(
    engine: &MetricsEngine,
    snapshot: &Snapshot,
    attribute: &str,
    scope: &Scope,
) -> Result<CorrelationMatrix, QueryError> {
    let taxonomy = snapshot.taxonomy();
    let columns: Vec<String> = taxonomy
        .category_of(attribute)
        .and_then(|label| taxonomy.columns(label))
        .map(<[String]>::to_vec)
        .unwrap_or_else(|| vec![attribute.to_string()]);

    engine.correlation_matrix(&columns, scope)
}

/// Report sections that depend on the chosen attribute.
#[derive(Default)]
struct Sections {
    analysis: Option<AttributeAnalysis>,
    correlations: Vec<CorrelationSection>,
    matrix: Option<CorrelationMatrix>,
    comparison: Vec<Comparison>,
}

fn compute_sections(
    args: &Args,
    config: &Config,
    engine: &MetricsEngine,
    snapshot: &Snapshot,
    scope: &Scope,
    attribute: &str,
) -> Result<Sections, QueryError> {
    let analysis = analyze(
        engine,
        snapshot,
        attribute,
        scope,
        args.direction.into(),
        config.report.top_n,
    )?;

    let correlations = args
        .compare
        .iter()
        .flatten()
        .map(|other| -> Result<CorrelationSection, QueryError> {
            Ok(CorrelationSection {
                attribute: attribute.to_string(),
                other: other.clone(),
                result: engine.correlate(attribute, other, scope)?,
            })
        })
        .collect::<Result<Vec<_>, QueryError>>()?;

    let matrix = if args.matrix {
        Some(category_matrix(engine, snapshot, attribute, scope)?)
    } else {
        None
    };

    let comparison = if args.entities.is_some() {
        engine.compare(scope, attribute, args.comparison.into())?
    } else {
        Vec::new()
    };

    Ok(Sections {
        analysis,
        correlations,
        matrix,
        comparison,
    })
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let store = SnapshotStore::new();
    load_snapshot(&args, &config, &store)?;
    let snapshot = store.current().context("No data loaded")?;

    println!(
        "   {} {}, {} attribute columns, {} categories",
        snapshot.entities().len(),
        snapshot.level().plural(),
        snapshot.columns().len(),
        snapshot.taxonomy().categories().len()
    );

    if args.list_attributes {
        print_attributes(&snapshot);
        return Ok(0);
    }

    let scope = build_scope(&args, &snapshot)?;
    let engine = MetricsEngine::from(&*snapshot);

    let mut sections = Sections::default();
    if let Some(ref attribute) = args.attribute {
        println!("\n🔬 Analyzing {}...", attribute);

        match compute_sections(&args, &config, &engine, &snapshot, &scope, attribute) {
            Ok(computed) => sections = computed,
            Err(QueryError::AttributeNotFound { attribute }) => {
                eprintln!(
                    "\n⛔ Attribute '{}' is not a column of the data. Use --list-attributes to see them.",
                    attribute
                );
                return Ok(EXIT_ATTRIBUTE_NOT_FOUND);
            }
            Err(e) => warn!("{}", e),
        }
    }

    println!("\n📝 Generating report...");

    let resolution = snapshot.resolution();
    let (unresolved_features, unresolved_entities) = if snapshot.features().is_empty() {
        (Vec::new(), Vec::new())
    } else {
        (resolution.unresolved_features(), resolution.unresolved.clone())
    };

    let duration = start_time.elapsed().as_secs_f64();
    let report = Report {
        metadata: ReportMetadata {
            data_source: args
                .data
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            geo_source: args.geo.as_ref().map(|p| p.display().to_string()),
            analysis_date: Utc::now(),
            level: snapshot.level(),
            entity_count: snapshot.entities().len(),
            attribute_count: snapshot.columns().len(),
            skipped_rows: snapshot.skipped_rows(),
            duration_seconds: duration,
        },
        taxonomy: snapshot.taxonomy().to_pairs(),
        analysis: sections.analysis,
        correlations: sections.correlations,
        matrix: sections.matrix,
        comparison: sections.comparison,
        unresolved_features,
        unresolved_entities,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&report, &config.report.options())
        }
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!("\n📊 Analysis Summary:");
    if let Some(ref analysis) = report.analysis {
        println!("   Attribute: {} ({})", analysis.label, analysis.attribute);
        println!(
            "   {} ranked, mean {:.1}, range {:.1} - {:.1}",
            analysis.summary.count, analysis.summary.mean, analysis.summary.min, analysis.summary.max
        );
    }
    if !report.unresolved_entities.is_empty() || !report.unresolved_features.is_empty() {
        println!(
            "   Unmatched names: {} in data, {} in boundaries",
            report.unresolved_entities.len(),
            report.unresolved_features.len()
        );
    }
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        output_path.display()
    );

    Ok(0)
}
