//! seedscope CLI - classify a schema snapshot and derive seeding settings
//!
//! Usage:
//!   seedscope detect <schema.json> [--json]
//!   seedscope select <schema.json> [--strategy <name>]
//!   seedscope configure <schema.json> [--mode <mode>] [--output <file>]
//!   seedscope debug <schema.json> --table <name> --rows <rows.json> [--format <format>]
//!
//! Examples:
//!   seedscope detect snapshots/makerkit.json
//!   seedscope configure snapshots/makerkit.json --mode optimized --output seed.json
//!   seedscope debug snapshots/makerkit.json --table accounts --rows rows.json --format html

use clap::{Parser, Subcommand};
use seedscope::cache::DetectionCache;
use seedscope::config::Settings;
use seedscope::configure::{write_configuration, AutoConfigOptions, AutoConfigurator, GenerationMode};
use seedscope::debugging::{DebugConstraint, DebuggingEngine, ReportFormat, Row};
use seedscope::detection::{DetectionConfig, DetectionSummary, Detector};
use seedscope::introspect::{DetectionAnalysisContext, ProbePlan, SchemaSnapshot, SnapshotIntrospector};
use seedscope::strategy::{StrategyRegistry, StrategySelection};
use seedscope::telemetry::{init_tracing, Reporter, Verbosity};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "seedscope")]
#[command(about = "seedscope - Classify application schemas and derive seeding configurations")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to SEEDSCOPE_CONFIG, ./seedscope.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More detail (-v verbose, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress progress and warnings
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify architecture, domain and framework
    Detect {
        /// Path to the schema snapshot (JSON)
        schema: PathBuf,

        /// Print the full summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Choose a seeding strategy
    Select {
        /// Path to the schema snapshot (JSON)
        schema: PathBuf,

        /// Force a registered strategy
        #[arg(short, long)]
        strategy: Option<String>,
    },

    /// Generate a seed configuration
    Configure {
        /// Path to the schema snapshot (JSON)
        schema: PathBuf,

        /// Generation mode (comprehensive, minimal, conservative, optimized)
        #[arg(short, long)]
        mode: Option<GenerationMode>,

        /// Force a registered strategy
        #[arg(short, long)]
        strategy: Option<String>,

        /// Write the configuration JSON here instead of printing the result
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Test a table's constraints against candidate rows
    Debug {
        /// Path to the schema snapshot (JSON)
        schema: PathBuf,

        /// Table whose constraints are tested
        #[arg(short, long)]
        table: String,

        /// JSON array of row objects
        #[arg(short, long)]
        rows: PathBuf,

        /// Report format (markdown, json, html)
        #[arg(short, long, default_value = "markdown")]
        format: ReportFormat,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let reporter = Reporter::new(verbosity(&cli, &settings));

    let result = match cli.command {
        Commands::Detect { schema, json } => cmd_detect(&settings, reporter, &schema, json).await,
        Commands::Select { schema, strategy } => {
            cmd_select(&settings, reporter, &schema, strategy.as_deref()).await
        }
        Commands::Configure {
            schema,
            mode,
            strategy,
            output,
        } => cmd_configure(&settings, reporter, &schema, mode, strategy.as_deref(), output.as_deref()).await,
        Commands::Debug {
            schema,
            table,
            rows,
            format,
        } => cmd_debug(&schema, &table, &rows, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, Box<dyn Error>> {
    Ok(match path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    })
}

fn verbosity(cli: &Cli, settings: &Settings) -> Verbosity {
    if cli.quiet {
        return Verbosity::Quiet;
    }
    match cli.verbose {
        0 => settings.logging.verbosity,
        1 => Verbosity::Verbose,
        _ => Verbosity::Debug,
    }
}

async fn build_context(
    settings: &Settings,
    reporter: Reporter,
    schema: &Path,
) -> Result<DetectionAnalysisContext, Box<dyn Error>> {
    let introspector = SnapshotIntrospector::from_file(schema)?;
    let context = DetectionAnalysisContext::build(
        &introspector,
        &ProbePlan::from_pattern_library(),
        &settings.detection.probe_options(),
        reporter,
    )
    .await?;
    Ok(context)
}

async fn detect(settings: &Settings, context: &DetectionAnalysisContext) -> Result<DetectionSummary, Box<dyn Error>> {
    let mut detector = Detector::new(DetectionConfig::default());
    let mut cache = None;
    if settings.cache.enabled {
        let shared = Arc::new(match settings.cache.resolved_path()? {
            Some(path) => DetectionCache::open(path, settings.cache.ttl())?,
            None => DetectionCache::new(settings.cache.ttl()),
        });
        detector = detector.with_cache(Arc::clone(&shared));
        cache = Some(shared);
    }

    let summary = detector.detect_context(context).await?;
    if let Some(cache) = cache {
        if let Err(e) = cache.persist().await {
            tracing::warn!(error = %e, "could not persist detection cache");
        }
    }
    Ok(summary)
}

async fn select(
    settings: &Settings,
    context: &DetectionAnalysisContext,
    strategy: Option<&str>,
) -> StrategySelection {
    let registry = StrategyRegistry::with_min_confidence(settings.detection.min_strategy_confidence);
    let mut selection = registry.select_strategy(context, strategy).await;
    if let Some(profile) = &settings.framework {
        selection
            .warnings
            .push(format!("Framework profile from settings ({}) replaces the detected one", profile.kind_name()));
        selection.profile = profile.clone();
    }
    selection
}

async fn cmd_detect(settings: &Settings, reporter: Reporter, schema: &Path, json: bool) -> CliResult {
    let context = build_context(settings, reporter, schema).await?;
    let summary = detect(settings, &context).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Schema: {}", schema.display());
    if let Some(hash) = &summary.schema_hash {
        println!("Hash: {}", hash);
    }
    println!(
        "Architecture: {} ({:.2}, {})",
        summary.architecture.primary_label, summary.architecture.confidence, summary.architecture.confidence_level
    );
    println!(
        "Domain: {} ({:.2}, {})",
        summary.domain.primary_label, summary.domain.confidence, summary.domain.confidence_level
    );
    let framework = &summary.framework.classification;
    println!(
        "Framework: {} ({:.2}, {})",
        framework.primary_label, framework.confidence, framework.confidence_level
    );
    print_list("Warnings", &summary.warnings);
    print_list("Recommendations", &summary.framework.recommendations);
    Ok(())
}

async fn cmd_select(settings: &Settings, reporter: Reporter, schema: &Path, strategy: Option<&str>) -> CliResult {
    let context = build_context(settings, reporter, schema).await?;
    let selection = select(settings, &context, strategy).await;

    println!("Strategy: {} ({})", selection.strategy_name, selection.reason);
    println!(
        "Classification: {} ({:.2})",
        selection.classification.primary_label, selection.classification.confidence
    );
    println!("Profile: {}", serde_json::to_string(&selection.profile)?);
    print_list("Warnings", &selection.warnings);
    Ok(())
}

async fn cmd_configure(
    settings: &Settings,
    reporter: Reporter,
    schema: &Path,
    mode: Option<GenerationMode>,
    strategy: Option<&str>,
    output: Option<&Path>,
) -> CliResult {
    let context = build_context(settings, reporter, schema).await?;
    let summary = detect(settings, &context).await?;
    let selection = select(settings, &context, strategy).await;

    let options = AutoConfigOptions::new(mode.unwrap_or(settings.configuration.mode))
        .with_overrides(settings.configuration.overrides())
        .with_selection(selection);
    let result = AutoConfigurator::new().generate_configuration(&summary, &options);

    match output {
        Some(path) => {
            write_configuration(&result.configuration, path)?;
            println!(
                "Wrote {} ({:.2} confidence, {})",
                path.display(),
                result.confidence,
                result.confidence_level
            );
            print_list("Warnings", &result.warnings);
        }
        None => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

fn cmd_debug(schema: &Path, table: &str, rows: &Path, format: ReportFormat) -> CliResult {
    let snapshot = SchemaSnapshot::from_file(schema)?;
    let table = table.to_lowercase();
    let constraints: Vec<DebugConstraint> = snapshot
        .constraints
        .iter()
        .filter(|c| c.table == table)
        .map(DebugConstraint::from_info)
        .collect();
    if constraints.is_empty() {
        return Err(format!("no constraints recorded for table '{}'", table).into());
    }

    let rows: Vec<Row> = serde_json::from_str(&fs::read_to_string(rows)?)?;

    let engine = DebuggingEngine::new();
    let session_id = engine.start_debugging_session(&table, constraints, rows);
    engine.run_constraint_tests(&session_id)?;
    let report = engine.generate_debugging_report(&session_id, format)?;
    engine.end_session(&session_id)?;

    println!("{}", report);
    Ok(())
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{}:", title);
    for item in items {
        println!("  - {}", item);
    }
}
