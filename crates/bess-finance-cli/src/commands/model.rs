use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use bess_finance_core::assumptions::input::InterestResolution;
use bess_finance_core::collaborators::QuoteSource;
use bess_finance_core::model::request::ModelRequest;

use crate::input;

/// Arguments for the full project-finance model
#[derive(Args)]
pub struct ModelArgs {
    /// Path to a JSON or YAML model request
    #[arg(long)]
    pub input: Option<String>,

    /// Use a fixed installed cost instead of the request's quote source
    #[arg(long)]
    pub capex: Option<Decimal>,

    /// Iterate the interest/tax circularity to convergence
    #[arg(long)]
    pub iterative: bool,

    /// Pass cap for --iterative
    #[arg(long, default_value = "20")]
    pub max_passes: u32,

    /// Interest convergence tolerance in dollars for --iterative
    #[arg(long, default_value = "0.01")]
    pub tolerance: Decimal,

    /// Drop the per-year schedules and print only the summary
    #[arg(long)]
    pub summary_only: bool,
}

pub fn run_model(args: ModelArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: ModelRequest = if let Some(ref path) = args.input {
        input::file::read_request(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <request.json|yaml> or stdin required for the model".into());
    };

    if let Some(total_capex) = args.capex {
        request.quote = QuoteSource::Fixed { total_capex };
    }
    if args.iterative {
        request.input.assumptions.interest_resolution = Some(InterestResolution::Iterative {
            max_passes: args.max_passes,
            tolerance: args.tolerance,
        });
    }

    log::info!(
        "Modeling {} MW / {} h at {}",
        request.input.storage_size_mw,
        request.input.duration_hours,
        request.input.location
    );
    let output = request.run()?;
    if args.summary_only {
        return Ok(serde_json::json!({
            "result": output.result.summary,
            "methodology": output.methodology,
            "warnings": output.warnings,
        }));
    }
    Ok(serde_json::to_value(output)?)
}
