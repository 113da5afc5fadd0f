//! # Geomail CLI
//!
//! Command-line interface for the Geomail library (`geomail_core`).
//! This binary parses arguments, sets up configuration, loads business
//! records from a JSON file, runs email discovery and aggregation over
//! them, and writes the resulting records back out as JSON.

use geomail_core::{
    build_pipeline, ConfigBuilder, DiscoveryMethod, EmailRecord, Entity, EntityStore, MemoryStore,
    MethodMode, Pipeline, RawEntityRecord, RunSummary,
};

// Dependencies specific to the CLI binary
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};

/// CLI-facing spelling of the three-state method policy.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Disabled,
    Manual,
    Auto,
}

impl From<ModeArg> for MethodMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Disabled => MethodMode::Disabled,
            ModeArg::Manual => MethodMode::ManualOnly,
            ModeArg::Auto => MethodMode::AutoInline,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MethodArg {
    Static,
    Harvester,
    Scraper,
}

impl From<MethodArg> for DiscoveryMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Static => DiscoveryMethod::Static,
            MethodArg::Harvester => DiscoveryMethod::Harvester,
            MethodArg::Scraper => DiscoveryMethod::Scraper,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Discovers and aggregates business contact emails.",
    long_about = "Geomail takes business records (name, address, website), discovers \
                  email addresses for them via pattern generation and website scraping, \
                  merges the candidates into confidence-ranked records, and optionally \
                  validates deliverability against a checking service."
)]
struct AppArgs {
    /// Path to the input JSON file containing business records.
    #[arg(short, long, default_value = "input.json", env = "GEOMAIL_INPUT")]
    input: String,

    /// Path to the output JSON file where results will be saved.
    #[arg(short, long, default_value = "results.json", env = "GEOMAIL_OUTPUT")]
    output: String,

    /// Output results to standard output instead of a file.
    #[arg(long, default_value = "false", env = "GEOMAIL_STDOUT")]
    stdout: bool,

    /// Path to a configuration file (TOML format). CLI args override file settings.
    #[arg(long, env = "GEOMAIL_CONFIG")]
    config_file: Option<String>,

    /// Activation policy for the pattern-generation method.
    #[arg(long, value_enum, env = "GEOMAIL_STATIC_MODE")]
    static_mode: Option<ModeArg>,

    /// Activation policy for the website-scraping method.
    #[arg(long, value_enum, env = "GEOMAIL_SCRAPER_MODE")]
    scraper_mode: Option<ModeArg>,

    /// Explicitly invoke one discovery method for every loaded record,
    /// including manual-only methods, instead of the automatic run.
    #[arg(long, value_enum, env = "GEOMAIL_INVOKE")]
    invoke: Option<MethodArg>,

    /// Maximum email records kept per business after aggregation.
    #[arg(long, env = "GEOMAIL_MAX_EMAILS")]
    max_emails: Option<usize>,

    /// Minimum confidence an aggregated record must carry to be kept.
    #[arg(long, env = "GEOMAIL_MIN_CONFIDENCE")]
    min_confidence: Option<f64>,

    /// Crawl depth for the scraping method (-1 for unlimited).
    #[arg(long, env = "GEOMAIL_SCRAPER_DEPTH")]
    scraper_depth: Option<i32>,

    /// Enable inline deliverability validation of aggregated records.
    #[arg(long, action = clap::ArgAction::SetTrue, env = "GEOMAIL_CHECK")]
    check: Option<bool>,

    /// Endpoint of the email checking service.
    #[arg(long, env = "GEOMAIL_CHECKER_ENDPOINT")]
    checker_endpoint: Option<String>,

    /// User agent string for HTTP requests.
    #[arg(long, env = "GEOMAIL_USER_AGENT")]
    user_agent: Option<String>,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "GEOMAIL_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,
}

/// One business with its aggregated email records, as written to the
/// output file.
#[derive(Debug, Serialize)]
struct BusinessResult {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    website: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    query: String,
    emails: Vec<EmailRecord>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_thread_names(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    tracing::info!("Geomail CLI v{} starting...", env!("CARGO_PKG_VERSION"));

    let args = AppArgs::parse();
    tracing::debug!("Parsed CLI arguments: {:?}", args);

    let mut config_builder = ConfigBuilder::new();
    if let Some(ref path) = args.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(mode) = args.static_mode {
        config_builder = config_builder.static_mode(mode.into());
    }
    if let Some(mode) = args.scraper_mode {
        config_builder = config_builder.scraper_mode(mode.into());
    }
    if let Some(max) = args.max_emails {
        config_builder = config_builder.max_emails_per_entity(max);
    }
    if let Some(floor) = args.min_confidence {
        config_builder = config_builder.min_confidence(floor);
    }
    if let Some(depth) = args.scraper_depth {
        config_builder = config_builder.scraper_depth(depth);
    }
    if args.check == Some(true) {
        config_builder = config_builder.checker_enabled(true);
    }
    if let Some(ref endpoint) = args.checker_endpoint {
        config_builder = config_builder.checker_endpoint(endpoint.clone());
    }
    if let Some(ref ua) = args.user_agent {
        config_builder = config_builder.user_agent(ua.clone());
    }
    if let Some(secs) = args.request_timeout {
        config_builder = config_builder.request_timeout(Duration::from_secs(secs));
    }

    let config = match config_builder.build() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            return Err(anyhow::anyhow!("Failed to build configuration: {}", e));
        }
    };
    if let Some(ref path) = config.loaded_config_path {
        tracing::info!("Using configuration from '{}'.", path);
    }

    let start_time = Instant::now();
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let pipeline = build_pipeline(config, store.clone() as Arc<dyn EntityStore>)
        .map_err(|e| anyhow::anyhow!("Failed to assemble pipeline: {}", e))?;

    run_file_mode(&pipeline, store.as_ref(), &args, start_time).await
}

async fn run_file_mode(
    pipeline: &Pipeline,
    store: &dyn EntityStore,
    args: &AppArgs,
    start_time: Instant,
) -> Result<()> {
    tracing::info!(
        "Running in file mode. Input: '{}', Output: '{}'",
        args.input,
        args.output
    );
    let input_path = Path::new(&args.input);
    if !input_path.exists() || !input_path.is_file() {
        return Err(anyhow::anyhow!(
            "Input file not found or is not a file: {}",
            args.input
        ));
    }
    if !args.stdout {
        ensure_writable(&args.output)?;
    }

    let records = load_records(&args.input)?;
    let total_loaded = records.len();
    if total_loaded == 0 {
        tracing::warn!(
            "Input file '{}' contains no business records. Saving empty results file.",
            args.input
        );
        if !args.stdout {
            save_results(&[], &args.output)?;
        }
        return Ok(());
    }
    tracing::info!("Loaded {} business records from input file.", total_loaded);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Failed to set progress bar template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Discovering emails for {} businesses...", total_loaded));

    let summary = match args.invoke {
        Some(method) => run_manual_invocation(pipeline, records, method.into()).await?,
        None => pipeline
            .run_records(records)
            .await
            .map_err(|e| anyhow::anyhow!("Pipeline run failed: {}", e))?,
    };
    pb.finish_with_message(format!("Processed {} businesses", total_loaded));

    let results = collect_results(store)?;
    if args.stdout {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).context("Failed to serialize results")?
        );
    } else {
        tracing::info!("Saving results to '{}'...", args.output);
        save_results(&results, &args.output)?;
        tracing::info!("Results saved successfully.");
    }

    log_summary(&summary, total_loaded, start_time.elapsed());
    Ok(())
}

/// Explicit single-method run: ingests the records, then invokes one
/// method for every business regardless of its manual-only gating.
async fn run_manual_invocation(
    pipeline: &Pipeline,
    records: Vec<RawEntityRecord>,
    method: DiscoveryMethod,
) -> Result<RunSummary> {
    tracing::info!("Explicitly invoking the '{}' method.", method);
    let mut summary = RunSummary::default();
    let store = pipeline.store();
    let orchestrator = pipeline.orchestrator();
    let policy = orchestrator.policy().clone();

    for record in &records {
        if record.name.trim().is_empty() {
            continue;
        }
        store.upsert_entity(Entity::from_record(record))?;
        summary.entities_discovered += 1;
    }

    for entity in store.entities()? {
        let discovery = orchestrator
            .discover_manual(&entity, method)
            .await
            .map_err(|e| anyhow::anyhow!("Manual invocation failed: {}", e))?;
        for (method, outcome) in &discovery.outcomes {
            summary.record_outcome(*method, *outcome);
            if outcome.marks_completion() {
                store.mark_method(&entity.key, *method)?;
            }
        }
        if discovery.candidates.is_empty() {
            continue;
        }
        let merged = geomail_core::merge(
            &entity.key,
            &discovery.candidates,
            policy.max_emails_per_entity,
            policy.min_confidence,
        );
        summary.emails_found += merged.len() as u64;
        store.upsert_email_records(&entity.key, merged)?;
    }
    Ok(summary)
}

fn load_records(file_path: &str) -> Result<Vec<RawEntityRecord>> {
    tracing::debug!("Opening input file: {}", file_path);
    let file = File::open(file_path)
        .with_context(|| format!("Failed to open input file '{}'", file_path))?;
    let reader = BufReader::new(file);

    let records: Vec<RawEntityRecord> = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse JSON from '{}'. Ensure it's an array of business objects.",
            file_path
        )
    })?;
    Ok(records)
}

fn collect_results(store: &dyn EntityStore) -> Result<Vec<BusinessResult>> {
    let mut results = Vec::new();
    for entity in store
        .entities()
        .map_err(|e| anyhow::anyhow!("Failed to read entities: {}", e))?
    {
        let emails = store
            .email_records(&entity.key)
            .map_err(|e| anyhow::anyhow!("Failed to read email records: {}", e))?;
        results.push(BusinessResult {
            name: entity.name,
            address: entity.address,
            website: entity.website,
            query: entity.query,
            emails,
        });
    }
    results.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(results)
}

fn ensure_writable(file_path: &str) -> Result<()> {
    let output_path = Path::new(file_path);
    if let Some(parent_dir) = output_path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            tracing::debug!("Creating output directory: {}", parent_dir.display());
            std::fs::create_dir_all(parent_dir).with_context(|| {
                format!(
                    "Failed to create output directory '{}'",
                    parent_dir.display()
                )
            })?;
        }
    }
    File::create(file_path).with_context(|| {
        format!("Cannot write to output file '{}'. Check permissions.", file_path)
    })?;
    tracing::debug!("Output path '{}' seems writable.", file_path);
    Ok(())
}

/// Saves the aggregated results to the specified JSON file.
/// Uses `serde_json` with pretty printing for human readability.
fn save_results(results: &[BusinessResult], file_path: &str) -> Result<()> {
    tracing::debug!("Creating output file: {}", file_path);
    let file = File::create(file_path)
        .with_context(|| format!("Failed to create/truncate output file '{}'", file_path))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, results)
        .with_context(|| format!("Failed to serialize results to JSON for '{}'", file_path))?;
    Ok(())
}

/// Logs a summary of the run to the console using `tracing::info`.
fn log_summary(summary: &RunSummary, total_loaded: usize, duration: Duration) {
    tracing::info!("-------------------- Run Summary --------------------");
    tracing::info!("Business Records Loaded  : {}", total_loaded);
    tracing::info!("Entities In Store        : {}", summary.entities_discovered);
    tracing::info!("Email Records Aggregated : {}", summary.emails_found);
    tracing::info!("Email Records Validated  : {}", summary.emails_validated);
    let method_failures =
        summary.static_failures + summary.harvester_failures + summary.scraper_failures;
    if method_failures > 0 {
        tracing::info!(
            "Method Failures          : {} (static: {}, harvester: {}, scraper: {})",
            method_failures,
            summary.static_failures,
            summary.harvester_failures,
            summary.scraper_failures
        );
    }
    tracing::info!("Total Time Taken         : {:.2?}", duration);
    if duration.as_secs_f64() > 0.01 && total_loaded > 0 {
        let rate = (total_loaded as f64) / duration.as_secs_f64();
        tracing::info!("Processing Rate          : {:.2} records/sec", rate);
    }
    tracing::info!("-----------------------------------------------------");
}
