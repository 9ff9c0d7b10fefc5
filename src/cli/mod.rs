//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// REST waterfall vs GraphQL gateway load benchmark
#[derive(Parser, Debug)]
#[command(name = "gateway-bench")]
#[command(version = "0.1.0")]
#[command(about = "Benchmark a GraphQL gateway against the REST services behind it")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one benchmark suite, or `all` of them in sequence
    Run(RunArgs),

    /// Build the HTML report from saved snapshots
    Report(ReportArgs),

    /// Export a saved snapshot to JSON or CSV
    Export(ExportArgs),

    /// Show or create configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Suite to run (rest-waterfall, graphql-aggregated, comparison, cache-impact, all)
    pub suite: String,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory snapshots are written to
    #[arg(short, long)]
    pub results_dir: Option<PathBuf>,

    /// GraphQL gateway URL
    #[arg(long)]
    pub gateway_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Multiplier for every phase offset, duration and pause
    #[arg(long)]
    pub time_scale: Option<f64>,

    /// Query used by the graphql-aggregated suite (user-deep, all-users, dashboard, products)
    #[arg(short, long, default_value = "user-deep")]
    pub query: String,

    /// Skip threshold evaluation
    #[arg(long)]
    pub no_thresholds: bool,
}

/// Arguments for report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the suite snapshots
    #[arg(short, long)]
    pub results_dir: Option<PathBuf>,
}

/// Arguments for export command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Snapshot file to read
    pub input: PathBuf,

    /// Destination file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format (json, csv); inferred from the output extension when omitted
    #[arg(short, long)]
    pub format: Option<String>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Configuration file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// List supported environment variables and their current values
    Env,

    /// Write a configuration file with default values
    Init {
        /// Output file path
        #[arg(short, long, default_value = "gateway-bench.yaml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "gateway-bench",
            "run",
            "comparison",
            "--time-scale",
            "0.1",
            "--no-thresholds",
            "--results-dir",
            "/tmp/out",
        ]);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.suite, "comparison");
                assert_eq!(run.time_scale, Some(0.1));
                assert!(run.no_thresholds);
                assert_eq!(run.results_dir, Some(PathBuf::from("/tmp/out")));
                assert_eq!(run.query, "user-deep");
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["gateway-bench", "report", "-v", "--log-level", "warn"]);
        assert!(args.verbose);
        assert_eq!(args.log_level.as_deref(), Some("warn"));
        assert!(matches!(args.command, Command::Report(_)));
    }

    #[test]
    fn test_export_args() {
        let args = Args::parse_from([
            "gateway-bench",
            "export",
            "results/comparison-summary.json",
            "--output",
            "out.csv",
        ]);
        match args.command {
            Command::Export(export) => {
                assert_eq!(export.output, PathBuf::from("out.csv"));
                assert!(export.format.is_none());
            }
            _ => panic!("Expected Export command"),
        }
    }

    #[test]
    fn test_config_init() {
        let args = Args::parse_from(["gateway-bench", "config", "init", "--force"]);
        match args.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { output, force },
            }) => {
                assert_eq!(output, PathBuf::from("gateway-bench.yaml"));
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_run_requires_suite() {
        assert!(Args::try_parse_from(["gateway-bench", "run"]).is_err());
    }
}
