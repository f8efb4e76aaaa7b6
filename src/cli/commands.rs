//! Command implementations for the ingestion CLI
//!
//! Builds the orchestrator from layered configuration, drives it for the
//! selected datasets and renders progress and summaries.

use crate::cache::CacheStore;
use crate::cli::args::{Args, Commands, DatasetArgs, LoadArgs, OutputFormat, StatusArgs};
use crate::config::IngestConfig;
use crate::models::{CacheInfo, DatasetKind, DatasetState, LoadOptions, LoadPhase};
use crate::orchestrator::IngestionOrchestrator;
use crate::source::HttpExportSource;
use anyhow::{Context, Result, bail};
use colored::*;
use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

type Orchestrator = IngestionOrchestrator<HttpExportSource>;

/// Dispatch to the selected subcommand
pub async fn run(args: Args) -> Result<()> {
    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    let Some(command) = args.command.clone() else {
        bail!("no command given; run with --help for usage");
    };

    let config = load_configuration(&args)?;
    debug!("Loaded configuration: {:?}", config);
    let orchestrator = build_orchestrator(&config)?;

    match command {
        Commands::Load(load_args) => {
            let options = load_args
                .max_age
                .map(LoadOptions::with_max_age)
                .unwrap_or_else(|| orchestrator.default_options());
            run_load(&orchestrator, &load_args, Operation::Load(options), args.show_progress())
                .await
        }
        Commands::Refetch(DatasetArgs { dataset }) => {
            let load_args = LoadArgs {
                dataset,
                max_age: None,
                sample: 0,
            };
            run_load(&orchestrator, &load_args, Operation::Refetch, args.show_progress()).await
        }
        Commands::Clear(dataset_args) => run_clear(&orchestrator, &dataset_args).await,
        Commands::Status(status_args) => run_status(&orchestrator, &config, &status_args).await,
    }
}

/// Set up structured logging based on CLI arguments
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dashboard_ingest={}", log_level)));

    let initialized = if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if initialized.is_ok() {
        debug!("Logging initialized at level: {}", log_level);
    }
}

/// Defaults -> config file -> environment -> command-line flags
fn load_configuration(args: &Args) -> Result<IngestConfig> {
    let mut config = match &args.config_file {
        Some(path) => {
            info!("Using config file: {}", path.display());
            IngestConfig::from_file(path)?
        }
        None => IngestConfig::default(),
    };
    config = config.with_env_overrides();

    if let Some(url) = &args.api_url {
        config = config.with_api_base_url(url.clone());
    }
    if let Some(dir) = &args.cache_dir {
        config = config.with_cache_dir(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

fn build_orchestrator(config: &IngestConfig) -> Result<Orchestrator> {
    let source = HttpExportSource::from_config(config)?;
    let store = CacheStore::open(&config.cache_dir)
        .with_context(|| format!("opening cache at {}", config.cache_dir.display()))?
        .with_row_group_size(config.write_row_group_size);
    info!(
        "API {} | cache {}",
        config.api_base_url,
        config.cache_dir.display()
    );
    Ok(IngestionOrchestrator::new(Arc::new(source), store, config))
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Load(LoadOptions),
    Refetch,
}

async fn run_load(
    orchestrator: &Orchestrator,
    load_args: &LoadArgs,
    operation: Operation,
    show_progress: bool,
) -> Result<()> {
    let start_time = Instant::now();
    let kinds = load_args.dataset.kinds();
    let bars = MultiProgress::new();

    // Kinds address disjoint partitions, so they load concurrently
    let states = futures::future::join_all(kinds.iter().map(|kind| {
        let bar = if show_progress {
            bars.add(progress_bar(*kind))
        } else {
            ProgressBar::hidden()
        };
        load_with_progress(orchestrator, *kind, operation, bar)
    }))
    .await;

    println!();
    for state in &states {
        print_summary(state);
    }
    println!(
        "{} {}",
        "Finished in".dimmed(),
        HumanDuration(start_time.elapsed())
    );

    if load_args.sample > 0 {
        for state in &states {
            print_sample(state, load_args.sample)?;
        }
    }

    let failed: Vec<String> = states
        .iter()
        .filter(|state| state.phase == LoadPhase::Errored)
        .map(|state| state.kind.to_string())
        .collect();
    if !failed.is_empty() {
        bail!("ingestion failed for {}", failed.join(", "));
    }
    Ok(())
}

fn progress_bar(kind: DatasetKind) -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix:>12} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    bar.set_style(style);
    bar.set_prefix(kind.to_string());
    bar
}

/// Drive one load while mirroring its state channel onto `bar`
async fn load_with_progress(
    orchestrator: &Orchestrator,
    kind: DatasetKind,
    operation: Operation,
    bar: ProgressBar,
) -> DatasetState {
    let mut receiver = orchestrator.subscribe(kind);
    let work = async {
        match operation {
            Operation::Load(options) => orchestrator.load(kind, options).await,
            Operation::Refetch => orchestrator.refetch(kind).await,
        }
    };
    let follow = async {
        while receiver.changed().await.is_ok() {
            let state = receiver.borrow_and_update().clone();
            bar.set_position(state.progress_percent.round() as u64);
            bar.set_message(phase_label(state.phase));
        }
    };

    let state = tokio::select! {
        state = work => state,
        _ = follow => orchestrator.state(kind),
    };
    bar.finish_and_clear();
    state
}

fn phase_label(phase: LoadPhase) -> &'static str {
    match phase {
        LoadPhase::Idle => "idle",
        LoadPhase::Deciding => "checking cache",
        LoadPhase::CacheHit => "reading cache",
        LoadPhase::Fetching => "downloading",
        LoadPhase::Parsing => "parsing",
        LoadPhase::Ready => "ready",
        LoadPhase::Errored => "failed",
    }
}

fn print_summary(state: &DatasetState) {
    let kind = format!("{:>12}", state.kind.to_string());
    match state.phase {
        LoadPhase::Ready => println!(
            "{} {} {} records",
            "✓".green().bold(),
            kind.bold(),
            state.record_count()
        ),
        LoadPhase::Errored if state.stale => println!(
            "{} {} {} (serving {} stale records)",
            "!".yellow().bold(),
            kind.bold(),
            state.error.as_deref().unwrap_or("unknown error").yellow(),
            state.record_count()
        ),
        LoadPhase::Errored => println!(
            "{} {} {}",
            "✗".red().bold(),
            kind.bold(),
            state.error.as_deref().unwrap_or("unknown error").red()
        ),
        other => println!("{} {} {}", "-".dimmed(), kind.bold(), phase_label(other)),
    }
}

fn print_sample(state: &DatasetState, limit: usize) -> Result<()> {
    for record in state.records.iter().take(limit) {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

async fn run_clear(orchestrator: &Orchestrator, dataset_args: &DatasetArgs) -> Result<()> {
    for kind in dataset_args.dataset.kinds() {
        orchestrator
            .clear_cache(kind)
            .await
            .with_context(|| format!("clearing {} cache", kind))?;
        println!("{} {} cache cleared", "✓".green().bold(), kind);
    }
    Ok(())
}

async fn run_status(
    orchestrator: &Orchestrator,
    config: &IngestConfig,
    status_args: &StatusArgs,
) -> Result<()> {
    let mut report = BTreeMap::new();
    for kind in DatasetKind::ALL {
        report.insert(kind, orchestrator.cache_info(kind).await?);
    }

    match status_args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Human => {
            println!("{} {}", "Cache:".bold(), config.cache_dir.display());
            for (kind, info) in &report {
                match info {
                    CacheInfo::NotLoaded => {
                        println!("  {:>12}  {}", kind.to_string(), "not loaded".dimmed())
                    }
                    CacheInfo::Cached {
                        row_count,
                        loaded_at,
                        server_version_marker,
                        size_bytes,
                    } => println!(
                        "  {:>12}  {} rows, {}, loaded {} (marker {})",
                        kind.to_string(),
                        row_count.to_string().green(),
                        format_size(*size_bytes),
                        loaded_at,
                        server_version_marker
                    ),
                }
            }
        }
    }
    Ok(())
}

/// Format a byte count in human-readable units
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
