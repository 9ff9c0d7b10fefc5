//! Gateway Bench - REST waterfall vs GraphQL gateway load benchmark
//!
//! Drives phased concurrent load against a set of REST microservices and the
//! GraphQL gateway that aggregates them, records per-call metrics, checks
//! pass/fail thresholds and renders a comparative HTML report.
//!
//! ## Features
//!
//! - Four suites: REST waterfall, GraphQL aggregated, side-by-side comparison, cache impact
//! - Fixed, ramping and per-actor-iteration executors with overlapping phases
//! - Trend, counter and rate metrics with tag filtering
//! - Snapshot files, JSON/CSV export and a self-contained HTML report
//!
//! ## Usage
//!
//! ```bash
//! # Run one suite
//! gateway-bench run graphql-aggregated
//!
//! # Quick smoke run of every suite at 1% of the real timings
//! gateway-bench run all --time-scale 0.01
//!
//! # Render the report from saved snapshots
//! gateway-bench report
//!
//! # Export a snapshot
//! gateway-bench export benchmarks/results/comparison-summary.json -o comparison.csv
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

mod benchmark;
mod cli;
mod config;
mod http;
mod results;
mod utils;
mod workload;

use benchmark::{Suite, SuiteRunner};
use cli::Args;
use config::{AppConfig, EnvConfig};
use http::{HttpClient, Transport};
use results::{ExportFormat, ResultsStorage};
use utils::{init_logger, LogLevel, Timer};
use workload::GraphqlQuery;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = LogLevel::from_flags(args.log_level.as_deref(), args.verbose).ok_or_else(|| {
        anyhow::anyhow!("Unknown log level: {}", args.log_level.as_deref().unwrap_or_default())
    })?;
    init_logger(level);

    match args.command {
        cli::Command::Run(run_args) => {
            run_suites(run_args).await?;
        }
        cli::Command::Report(report_args) => {
            build_report(report_args)?;
        }
        cli::Command::Export(export_args) => {
            export_snapshot(export_args)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args)?;
        }
    }

    Ok(())
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    AppConfig::resolve(path, &EnvConfig::load())
}

async fn run_suites(args: cli::RunArgs) -> Result<()> {
    let suites: Vec<Suite> = if args.suite.eq_ignore_ascii_case("all") {
        Suite::ALL.to_vec()
    } else {
        let suite = Suite::from_str(&args.suite)
            .ok_or_else(|| anyhow::anyhow!("Unknown suite: {}", args.suite))?;
        vec![suite]
    };
    let query = GraphqlQuery::from_str(&args.query)
        .ok_or_else(|| anyhow::anyhow!("Unknown query: {}", args.query))?;

    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(dir) = args.results_dir {
        config.results_dir = dir;
    }
    if let Some(url) = args.gateway_url {
        config.endpoints.gateway = url;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(scale) = args.time_scale {
        config.time_scale = scale;
    }
    config.validate()?;

    let client = HttpClient::with_timeout(config.timeout_secs).context("Failed to build HTTP client")?;
    let transport: Arc<dyn Transport> = Arc::new(client);

    info!(
        "Running {} suite(s) against {} (time scale {})",
        suites.len(),
        config.endpoints.gateway,
        config.time_scale
    );
    for suite in &suites {
        for line in suite.load_profile() {
            info!("  {}: {}", suite.name(), line);
        }
    }

    let timer = Timer::start("benchmark run");
    let runner = SuiteRunner::new(config, transport)
        .with_query(query)
        .with_thresholds(!args.no_thresholds);
    let outcomes = runner.run_all(&suites).await?;
    let elapsed = timer.stop();

    println!();
    let mut breached = 0;
    for outcome in &outcomes {
        println!("{} ({} metrics)", outcome.suite.label(), outcome.snapshot.metrics.len());
        for phase in &outcome.phases {
            println!(
                "  {:<20} {:>10} iterations, {:>6} failed, {:.1}s",
                phase.name,
                phase.completed,
                phase.failed,
                phase.elapsed.as_secs_f64()
            );
        }
        for verdict in &outcome.verdicts {
            println!("  {verdict}");
        }
        breached += outcome.breaches().count();
    }
    println!("\nTotal time: {:.1}s", elapsed / 1000.0);

    if breached > 0 {
        bail!("{breached} threshold(s) breached");
    }
    Ok(())
}

fn build_report(args: cli::ReportArgs) -> Result<()> {
    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(dir) = args.results_dir {
        config.results_dir = dir;
    }

    let storage = ResultsStorage::new(config.results_dir);
    let path = results::generate_report(&storage)
        .with_context(|| format!("Failed to build report from {}", storage.base_dir().display()))?;

    println!("✓ Report written to {}", path.display());
    Ok(())
}

fn export_snapshot(args: cli::ExportArgs) -> Result<()> {
    let format = match args.format.as_deref() {
        Some(f) => ExportFormat::from_str(f).ok_or_else(|| anyhow::anyhow!("Unknown export format: {f}"))?,
        None => ExportFormat::from_extension(&args.output).unwrap_or_else(|| {
            warn!("Cannot infer format from {}, using json", args.output.display());
            ExportFormat::Json
        }),
    };

    let dir = args.input.parent().unwrap_or_else(|| Path::new("."));
    let storage = ResultsStorage::new(dir);
    let snapshot = storage.load_from_path(&args.input)?;
    storage.export(&snapshot, &args.output, format)?;

    println!("✓ Exported {} to {}", snapshot.label, args.output.display());
    Ok(())
}

fn manage_config(args: cli::ConfigArgs) -> Result<()> {
    match args.action {
        cli::ConfigAction::Show { config, format } => {
            let config = resolve_config(config.as_deref())?;
            let output = if format == "json" {
                serde_json::to_string_pretty(&config)?
            } else {
                serde_yaml::to_string(&config)?
            };
            println!("{output}");
        }

        cli::ConfigAction::Env => {
            config::print_env_help();
            println!();
            EnvConfig::load().print_summary();
        }

        cli::ConfigAction::Init { output, force } => {
            if output.exists() && !force {
                bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    output.display()
                );
            }

            AppConfig::default().save(&output)?;
            println!("✓ Configuration file created: {}", output.display());
        }
    }

    Ok(())
}
