use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use bess_finance_core::model::estimators::{self, QuickEstimateInput};

use crate::input;

/// Shared flags for the quick estimators
#[derive(Args)]
pub struct QuickEstimateArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Total installed cost
    #[arg(long)]
    pub capex: Option<Decimal>,

    /// Year-1 revenue
    #[arg(long)]
    pub revenue: Option<Decimal>,

    /// Year-1 operating cost
    #[arg(long)]
    pub opex: Option<Decimal>,

    /// Debt share of capex (default 0.70)
    #[arg(long)]
    pub debt_ratio: Option<Decimal>,

    /// Annual interest rate (default 0.06)
    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    /// Loan term in years (default 15)
    #[arg(long)]
    pub loan_term: Option<u32>,

    /// Project life in years (default 25)
    #[arg(long)]
    pub project_life: Option<u32>,

    /// Investment tax credit rate (default 0.30)
    #[arg(long)]
    pub itc_rate: Option<Decimal>,
}

#[derive(Args)]
pub struct EstimateDscrArgs {
    #[command(flatten)]
    pub quick: QuickEstimateArgs,
}

#[derive(Args)]
pub struct EstimateIrrArgs {
    #[command(flatten)]
    pub quick: QuickEstimateArgs,
}

fn quick_input(args: QuickEstimateArgs) -> Result<QuickEstimateInput, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return input::file::read_request(path);
    }
    if let Some(data) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    Ok(QuickEstimateInput {
        total_capex: args.capex.ok_or("--capex is required (or provide --input)")?,
        annual_revenue: args.revenue.ok_or("--revenue is required (or provide --input)")?,
        annual_operating_cost: args.opex.unwrap_or(Decimal::ZERO),
        debt_ratio: args.debt_ratio,
        interest_rate: args.interest_rate,
        loan_term_years: args.loan_term,
        project_life_years: args.project_life,
        itc_rate: args.itc_rate,
    })
}

pub fn run_estimate_dscr(args: EstimateDscrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let quick = quick_input(args.quick)?;
    let result = estimators::estimate_dscr(&quick)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_estimate_irr(args: EstimateIrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let quick = quick_input(args.quick)?;
    let result = estimators::estimate_levered_irr(&quick)?;
    Ok(serde_json::to_value(result)?)
}
