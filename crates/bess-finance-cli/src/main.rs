mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::estimators::{EstimateDscrArgs, EstimateIrrArgs};
use commands::model::ModelArgs;
use commands::sensitivity::SensitivityArgs;

/// Battery energy storage project-finance models
#[derive(Parser)]
#[command(
    name = "bess-finance",
    version,
    about = "Battery energy storage project-finance models",
    long_about = "A CLI for building 25-year pro-forma models of battery storage projects \
                  with decimal precision. Supports the full statement model, one-way \
                  sensitivity sweeps, and quick DSCR / levered IRR estimates."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the full project-finance model
    Model(ModelArgs),
    /// Re-run the model across parameter perturbations
    Sensitivity(SensitivityArgs),
    /// Quick year-1 DSCR estimate
    EstimateDscr(EstimateDscrArgs),
    /// Quick pre-tax levered IRR estimate
    EstimateIrr(EstimateIrrArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .parse_filters(&cli.log_level)
        .format_timestamp(None)
        .init();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Model(args) => commands::model::run_model(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::EstimateDscr(args) => commands::estimators::run_estimate_dscr(args),
        Commands::EstimateIrr(args) => commands::estimators::run_estimate_irr(args),
        Commands::Version => {
            println!("bess-finance {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
