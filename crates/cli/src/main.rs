//! Flowspec CLI - Main Entry Point
//!
//! Validates and inspects process spec files and renders the reports
//! written by spec runs.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use flowspec_cli::commands::{kinds, report, resources, show, validate};
use flowspec_cli::output::{self, print_error};
use flowspec_runner::RunnerConfig;

/// Flowspec CLI - Declarative tests for BPMN processes
#[derive(Parser)]
#[command(name = "flowspec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Runner configuration file
    #[arg(short, long, env = "FLOWSPEC_CONFIG", default_value = "flowspec.toml", global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check spec files for configuration errors
    Validate(validate::ValidateArgs),

    /// Show the test cases of a spec file
    Show(show::ShowArgs),

    /// List deployable resources
    Resources(resources::ResourcesArgs),

    /// Render a test results report
    Report(report::ReportArgs),

    /// List the action and verification kinds
    Kinds,

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = RunnerConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    let success = match cli.command {
        Commands::Validate(args) => validate::execute(args, cli.format)?,
        Commands::Show(args) => {
            show::execute(args, cli.format)?;
            true
        }
        Commands::Resources(args) => {
            resources::execute(args, &config, cli.format)?;
            true
        }
        Commands::Report(args) => report::execute(args, &config, cli.format)?,
        Commands::Kinds => {
            kinds::execute(cli.format);
            true
        }
        Commands::Version => {
            println!("Flowspec CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Runner library v{}", flowspec_common::VERSION);
            true
        }
    };

    if !success {
        if !cli.format.is_structured() {
            print_error("Some checks failed");
        }
        std::process::exit(1);
    }

    Ok(())
}
