use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::configuration::ModelConfiguration;
use crate::assumptions::input::{ItcTiming, ModelInput};
use crate::assumptions::market_rates::MarketRateTable;
use crate::collaborators::{fetch_constants, fetch_quote, ConstantsLookup, QuoteLookup, QuoteRequest};
use crate::debt::circularity::{resolve_interest_circularity, InterestResolutionReport};
use crate::debt::schedule::{dscr_statistics, DebtScheduleYear};
use crate::returns::metrics::compute_return_metrics;
use crate::revenue::projector::{project_revenue, RevenueYear};
use crate::statements::balance_sheet::{build_balance_sheets, BalanceSheetYear, CapitalStructure};
use crate::statements::cash_flow::{build_cash_flows, CashFlowYear};
use crate::statements::income::{project_operating_costs, IncomeStatement};
use crate::tax::depreciation::{depreciable_basis, depreciation_schedule, DepreciationYear};
use crate::time_value::IrrOutcome;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Years};
use crate::BessFinanceResult;

const MIN_DSCR_COVENANT: Multiple = dec!(1.20);
const MIN_LLCR: Multiple = dec!(1.10);
const EQUITY_HURDLE: Decimal = dec!(0.08);
const PAYBACK_LIFE_SHARE: Decimal = dec!(0.70);

// ---------------------------------------------------------------------------
// Output structs
// ---------------------------------------------------------------------------

/// Headline figures for the model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub total_capex: Money,
    pub equity_amount: Money,
    pub debt_amount: Money,
    pub itc_amount: Money,
    pub simple_payback_years: Years,
    pub discounted_payback_years: Years,
    pub unlevered_irr: IrrOutcome,
    pub levered_irr: IrrOutcome,
    pub npv: Money,
    pub equity_npv: Money,
    pub average_dscr: Option<Multiple>,
    pub minimum_dscr: Option<Multiple>,
    pub llcr: Option<Multiple>,
    pub plcr: Option<Multiple>,
    pub year1_ebitda: Money,
    pub moic: Option<Multiple>,
    pub lcos_per_mwh: Option<Money>,
    pub effective_capacity_factor_pct: Decimal,
    pub commercial_operation_date: Option<NaiveDate>,
    pub debt_maturity_date: Option<NaiveDate>,
}

/// Every year-series produced by the pipeline plus the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub configuration: ModelConfiguration,
    pub capital_structure: CapitalStructure,
    pub revenue: Vec<RevenueYear>,
    pub depreciation: Vec<DepreciationYear>,
    pub income_statements: Vec<IncomeStatement>,
    pub debt_schedule: Vec<DebtScheduleYear>,
    pub cash_flows: Vec<CashFlowYear>,
    pub balance_sheets: Vec<BalanceSheetYear>,
    pub unlevered_cash_flows: Vec<Money>,
    pub levered_cash_flows: Vec<Money>,
    pub interest_resolution: InterestResolutionReport,
    pub summary: ModelSummary,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Build the full project-finance model with the built-in market rate table.
pub fn generate_model(
    input: &ModelInput,
    quotes: &dyn QuoteLookup,
    constants: &dyn ConstantsLookup,
) -> BessFinanceResult<ComputationOutput<ModelResult>> {
    generate_model_with_rates(input, quotes, constants, &MarketRateTable::default())
}

/// Build the full project-finance model against an injected rate table.
pub fn generate_model_with_rates(
    input: &ModelInput,
    quotes: &dyn QuoteLookup,
    constants: &dyn ConstantsLookup,
    rates: &MarketRateTable,
) -> BessFinanceResult<ComputationOutput<ModelResult>> {
    let start = Instant::now();
    let config = ModelConfiguration::resolve(input)?;
    let mut warnings: Vec<String> = Vec::new();

    let result = run_model(&config, input.financial_close_date, quotes, constants, rates, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "BESS Project Finance Model (revenue stack, MACRS, level-payment debt)",
        &serde_json::json!({
            "project_name": config.project_name,
            "region": config.region,
            "power_mw": config.system.power_mw.to_string(),
            "energy_mwh": config.system.energy_mwh.to_string(),
            "project_life_years": config.project_life_years,
            "debt_ratio": config.debt_ratio.to_string(),
            "interest_rate": config.interest_rate.to_string(),
            "loan_term_years": config.loan_term_years,
            "combined_tax_rate": config.combined_tax_rate().to_string(),
            "itc_rate": config.itc_rate.to_string(),
            "discount_rate": config.discount_rate.to_string(),
            "interest_resolution": config.interest_resolution,
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// Run stages 1–7 on an already-resolved configuration.
pub(crate) fn run_model(
    config: &ModelConfiguration,
    financial_close: Option<NaiveDate>,
    quotes: &dyn QuoteLookup,
    constants: &dyn ConstantsLookup,
    rates: &MarketRateTable,
    warnings: &mut Vec<String>,
) -> BessFinanceResult<ModelResult> {
    let quote = fetch_quote(quotes, &QuoteRequest::from(config))?;
    let battery = fetch_constants(constants)?;
    log::debug!(
        "{}: capex {} at RTE {} and {} cycles/yr",
        config.project_name,
        quote.total_capex,
        battery.round_trip_efficiency,
        battery.annual_cycles
    );

    // ── Capital structure ────────────────────────────────────────────
    let total_capex = quote.total_capex;
    let debt_amount = total_capex * config.debt_ratio;
    let itc_amount = total_capex * config.itc_rate;
    let (itc_up_front, first_year_credit) = match config.itc_timing {
        ItcTiming::UpFront => (itc_amount, Decimal::ZERO),
        ItcTiming::FirstTaxYear => (Decimal::ZERO, itc_amount),
    };
    let capital = CapitalStructure {
        total_capex,
        debt_amount,
        equity_amount: total_capex - debt_amount,
        itc_amount,
        itc_up_front,
    };

    // ── Operating projections ────────────────────────────────────────
    let revenue = project_revenue(config, &battery, rates);
    let costs = project_operating_costs(config, total_capex);
    let basis = depreciable_basis(total_capex, config.itc_rate);
    let depreciation =
        depreciation_schedule(basis, config.depreciation_method, config.project_life_years);
    log::debug!("Revenue, opex and depreciation projected over {} years", config.project_life_years);

    // ── Financing ────────────────────────────────────────────────────
    let resolved =
        resolve_interest_circularity(config, debt_amount, &revenue, &costs, &depreciation)?;

    // ── Statements ───────────────────────────────────────────────────
    let cash_flows = build_cash_flows(
        &resolved.income_statements,
        &resolved.debt_schedule,
        first_year_credit,
    );
    let balance_sheets = build_balance_sheets(&capital, &cash_flows, &resolved.debt_schedule);
    log::debug!("Cash flow and balance sheet rolled forward");

    // ── Returns ──────────────────────────────────────────────────────
    let returns = compute_return_metrics(
        config,
        &battery,
        &capital,
        &cash_flows,
        &costs,
        &resolved.cads,
    )?;
    let (average_dscr, minimum_dscr) = dscr_statistics(&resolved.debt_schedule);
    let year1_ebitda = resolved
        .income_statements
        .first()
        .map_or(Decimal::ZERO, |is| is.ebitda);

    let commercial_operation_date =
        financial_close.and_then(|close| add_years(close, config.construction_period_years));
    let debt_maturity_date = if config.has_debt() {
        commercial_operation_date.and_then(|cod| add_years(cod, config.loan_term_years))
    } else {
        None
    };

    let summary = ModelSummary {
        total_capex,
        equity_amount: capital.equity_amount,
        debt_amount,
        itc_amount,
        simple_payback_years: returns.simple_payback_years,
        discounted_payback_years: returns.discounted_payback_years,
        unlevered_irr: returns.unlevered_irr,
        levered_irr: returns.levered_irr,
        npv: returns.npv,
        equity_npv: returns.equity_npv,
        average_dscr,
        minimum_dscr,
        llcr: returns.llcr,
        plcr: returns.plcr,
        year1_ebitda,
        moic: returns.moic,
        lcos_per_mwh: returns.lcos_per_mwh,
        effective_capacity_factor_pct: returns.effective_capacity_factor_pct,
        commercial_operation_date,
        debt_maturity_date,
    };

    collect_warnings(config, &summary, warnings);
    log::debug!("Model complete for {}", config.project_name);

    Ok(ModelResult {
        configuration: config.clone(),
        capital_structure: capital,
        revenue,
        depreciation,
        income_statements: resolved.income_statements,
        debt_schedule: resolved.debt_schedule,
        cash_flows,
        balance_sheets,
        unlevered_cash_flows: returns.unlevered_cash_flows,
        levered_cash_flows: returns.levered_cash_flows,
        interest_resolution: resolved.report,
        summary,
    })
}

/// Warning text for an IRR search that found no root.
pub(crate) fn irr_warning(label: &str, outcome: IrrOutcome) -> Option<String> {
    match outcome {
        IrrOutcome::Converged { .. } => None,
        IrrOutcome::NotConverged { iterations, .. } => Some(format!(
            "{label}: no root found (stopped after {iterations} Newton steps)"
        )),
    }
}

/// `None` when the month count or the resulting date is out of range.
fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    let months = years.checked_mul(12)?;
    date.checked_add_months(Months::new(months))
}

fn collect_warnings(config: &ModelConfiguration, summary: &ModelSummary, warnings: &mut Vec<String>) {
    if let Some(min_dscr) = summary.minimum_dscr {
        if min_dscr < MIN_DSCR_COVENANT {
            log::warn!("{}: minimum DSCR {min_dscr} below covenant", config.project_name);
            warnings.push(format!(
                "Minimum DSCR of {} is below 1.2x; lender covenant risk",
                min_dscr.round_dp(2)
            ));
        }
    }
    if let Some(llcr) = summary.llcr {
        if llcr < MIN_LLCR {
            warnings.push(format!(
                "LLCR of {} is below 1.1x; debt serviceability concern",
                llcr.round_dp(2)
            ));
        }
    }

    for (label, outcome) in [
        ("Unlevered IRR", summary.unlevered_irr),
        ("Levered IRR", summary.levered_irr),
    ] {
        warnings.extend(irr_warning(label, outcome));
    }
    if let Some(rate) = summary.levered_irr.rate() {
        if rate < EQUITY_HURDLE {
            warnings.push(format!(
                "Levered IRR of {} is below 8%; may not meet investor hurdle",
                rate.round_dp(4)
            ));
        }
    }

    let life = Decimal::from(config.project_life_years);
    if summary.simple_payback_years > life * PAYBACK_LIFE_SHARE {
        warnings.push(format!(
            "Payback period of {} years exceeds 70% of project life",
            summary.simple_payback_years.round_dp(2)
        ));
    }
    if summary.year1_ebitda < Decimal::ZERO {
        warnings.push("Year-1 EBITDA is negative: operating costs exceed revenue".into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::input::{AssumptionOverrides, RevenueStreamSelection};
    use crate::assumptions::market_rates::MarketRegion;
    use crate::collaborators::{BatteryConstants, QuoteSource};
    use crate::error::BessFinanceError;

    fn sample_input() -> ModelInput {
        ModelInput {
            project_name: Some("Otay Mesa Storage".into()),
            storage_size_mw: dec!(1),
            duration_hours: dec!(4),
            solar_mw: None,
            wind_mw: None,
            location: "San Diego, CA".into(),
            region: MarketRegion::Caiso,
            electricity_rate: dec!(0.18),
            demand_charge: Some(dec!(18)),
            revenue_streams: RevenueStreamSelection::all(),
            assumptions: AssumptionOverrides::default(),
            financial_close_date: NaiveDate::from_ymd_opt(2026, 3, 31),
        }
    }

    fn run(input: &ModelInput) -> ComputationOutput<ModelResult> {
        generate_model(input, &QuoteSource::default(), &BatteryConstants::default()).unwrap()
    }

    #[test]
    fn test_series_lengths_match_life() {
        let out = run(&sample_input());
        let r = &out.result;
        assert_eq!(r.revenue.len(), 25);
        assert_eq!(r.depreciation.len(), 25);
        assert_eq!(r.income_statements.len(), 25);
        assert_eq!(r.debt_schedule.len(), 25);
        assert_eq!(r.cash_flows.len(), 25);
        assert_eq!(r.balance_sheets.len(), 25);
        assert_eq!(r.unlevered_cash_flows.len(), 26);
    }

    #[test]
    fn test_capital_structure_split() {
        let out = run(&sample_input());
        let s = &out.result.summary;
        // 4000 kWh × 350 + 1000 kW × 150
        assert_eq!(s.total_capex, dec!(1550000));
        assert_eq!(s.debt_amount, dec!(1085000));
        assert_eq!(s.equity_amount, dec!(465000));
        assert_eq!(s.itc_amount, dec!(465000));
    }

    #[test]
    fn test_dates_follow_financial_close() {
        let out = run(&sample_input());
        let s = &out.result.summary;
        assert_eq!(s.commercial_operation_date, NaiveDate::from_ymd_opt(2027, 3, 31));
        assert_eq!(s.debt_maturity_date, NaiveDate::from_ymd_opt(2042, 3, 31));
    }

    #[test]
    fn test_first_year_credit_reaches_cash_flow() {
        let out = run(&sample_input());
        assert_eq!(out.result.cash_flows[0].tax_credit_proceeds, dec!(465000));
        assert_eq!(out.result.unlevered_cash_flows[0], dec!(-1550000));
    }

    #[test]
    fn test_up_front_credit_nets_year_zero() {
        let mut input = sample_input();
        input.assumptions.itc_timing = Some(ItcTiming::UpFront);
        let out = run(&input);
        assert_eq!(out.result.unlevered_cash_flows[0], dec!(-1085000));
        assert!(out.result.cash_flows.iter().all(|cf| cf.tax_credit_proceeds.is_zero()));
    }

    #[test]
    fn test_invalid_input_rejected_before_quote() {
        let mut input = sample_input();
        input.duration_hours = Decimal::ZERO;
        let err = generate_model(&input, &QuoteSource::default(), &BatteryConstants::default())
            .unwrap_err();
        assert!(matches!(err, BessFinanceError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_far_future_close_date_has_no_dates() {
        let mut input = sample_input();
        input.financial_close_date = NaiveDate::from_ymd_opt(262_140, 1, 1);
        input.assumptions.construction_period_years = Some(10);
        let out = run(&input);
        assert_eq!(out.result.summary.commercial_operation_date, None);
        assert_eq!(out.result.summary.debt_maturity_date, None);
        assert_eq!(add_years(NaiveDate::MIN, u32::MAX), None);
    }

    #[test]
    fn test_irr_warning_names_newton_steps() {
        let stuck = IrrOutcome::NotConverged {
            last_rate: dec!(-0.99),
            iterations: 2,
        };
        assert_eq!(
            irr_warning("Levered IRR", stuck).as_deref(),
            Some("Levered IRR: no root found (stopped after 2 Newton steps)")
        );
        let found = IrrOutcome::Converged {
            rate: dec!(0.12),
            iterations: 5,
        };
        assert_eq!(irr_warning("Levered IRR", found), None);
    }

    #[test]
    fn test_metadata_envelope() {
        let out = run(&sample_input());
        assert!(out.methodology.contains("BESS"));
        assert_eq!(out.assumptions["region"], "CAISO");
    }
}
