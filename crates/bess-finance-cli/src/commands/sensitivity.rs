use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use bess_finance_core::model::request::ModelRequest;
use bess_finance_core::sensitivity::analyzer::{SensitivityParameter, SensitivityRequest};

use crate::input;

/// Arguments for a one-way sensitivity sweep
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a JSON or YAML sensitivity request (or a bare model request
    /// when --parameters is given)
    #[arg(long)]
    pub input: Option<String>,

    /// Parameters to vary (comma-separated: electricity_rate,capex,interest_rate,degradation)
    #[arg(long, value_delimiter = ',')]
    pub parameters: Option<Vec<String>>,

    /// Relative perturbations (comma-separated, e.g. "-0.2,-0.1,0,0.1,0.2")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub perturbations: Option<Vec<Decimal>>,
}

fn parse_parameter(name: &str) -> Result<SensitivityParameter, Box<dyn std::error::Error>> {
    let parameter = match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "electricity_rate" => SensitivityParameter::ElectricityRate,
        "capex" => SensitivityParameter::Capex,
        "interest_rate" => SensitivityParameter::InterestRate,
        "degradation" | "degradation_rate" => SensitivityParameter::Degradation,
        other => {
            return Err(format!(
                "Unknown sensitivity parameter '{}' (expected electricity_rate, capex, interest_rate or degradation)",
                other
            )
            .into())
        }
    };
    Ok(parameter)
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data: Value = if let Some(ref path) = args.input {
        input::file::read_request(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <request.json|yaml> or stdin required for sensitivity".into());
    };

    let mut request: SensitivityRequest = match args.parameters {
        Some(ref names) => {
            let parameters = names
                .iter()
                .map(|n| parse_parameter(n))
                .collect::<Result<Vec<_>, _>>()?;
            let model: ModelRequest = match data.get("model").cloned() {
                Some(inner) => serde_json::from_value(inner)?,
                None => serde_json::from_value(data)?,
            };
            SensitivityRequest {
                model,
                parameters,
                perturbations: None,
            }
        }
        None => serde_json::from_value(data)?,
    };

    if args.perturbations.is_some() {
        request.perturbations = args.perturbations;
    }

    log::info!(
        "Sweeping {} parameters for {}",
        request.parameters.len(),
        request.model.input.location
    );
    let output = request.run()?;
    Ok(serde_json::to_value(output)?)
}
