//! Lightweight previews that skip the full statement build.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::configuration::{
    DEFAULT_DEBT_RATIO, DEFAULT_INTEREST_RATE, DEFAULT_ITC_RATE, DEFAULT_LOAN_TERM_YEARS,
    DEFAULT_PROJECT_LIFE_YEARS,
};
use crate::error::BessFinanceError;
use crate::model::orchestrator::irr_warning;
use crate::time_value::{irr, level_payment, IrrOutcome};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::BessFinanceResult;

/// Back-of-envelope project economics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickEstimateInput {
    pub total_capex: Money,
    pub annual_revenue: Money,
    pub annual_operating_cost: Money,
    #[serde(default)]
    pub debt_ratio: Option<Rate>,
    #[serde(default)]
    pub interest_rate: Option<Rate>,
    #[serde(default)]
    pub loan_term_years: Option<u32>,
    #[serde(default)]
    pub project_life_years: Option<u32>,
    #[serde(default)]
    pub itc_rate: Option<Rate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DscrEstimate {
    pub net_operating_income: Money,
    pub debt_amount: Money,
    pub annual_debt_service: Money,
    /// `None` when nothing is borrowed
    pub dscr: Option<Multiple>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeveredIrrEstimate {
    pub equity_amount: Money,
    pub cash_flows: Vec<Money>,
    pub levered_irr: IrrOutcome,
}

struct Resolved {
    debt_ratio: Rate,
    interest_rate: Rate,
    loan_term_years: u32,
    project_life_years: u32,
    itc_rate: Rate,
}

fn resolve(input: &QuickEstimateInput) -> BessFinanceResult<Resolved> {
    if input.total_capex <= Decimal::ZERO {
        return Err(BessFinanceError::invalid(
            "total_capex",
            "Total capex must be positive",
        ));
    }
    if input.annual_revenue < Decimal::ZERO || input.annual_operating_cost < Decimal::ZERO {
        return Err(BessFinanceError::invalid(
            "annual_revenue",
            "Revenue and operating cost must be non-negative",
        ));
    }

    let resolved = Resolved {
        debt_ratio: input.debt_ratio.unwrap_or(DEFAULT_DEBT_RATIO),
        interest_rate: input.interest_rate.unwrap_or(DEFAULT_INTEREST_RATE),
        loan_term_years: input.loan_term_years.unwrap_or(DEFAULT_LOAN_TERM_YEARS),
        project_life_years: input.project_life_years.unwrap_or(DEFAULT_PROJECT_LIFE_YEARS),
        itc_rate: input.itc_rate.unwrap_or(DEFAULT_ITC_RATE),
    };

    for (field, value) in [
        ("debt_ratio", resolved.debt_ratio),
        ("interest_rate", resolved.interest_rate),
        ("itc_rate", resolved.itc_rate),
    ] {
        if value < Decimal::ZERO || value > Decimal::ONE {
            return Err(BessFinanceError::invalid(
                field,
                format!("Rate must be between 0 and 1, got {value}"),
            ));
        }
    }
    if resolved.project_life_years == 0 {
        return Err(BessFinanceError::invalid(
            "project_life_years",
            "Project life must be at least 1 year",
        ));
    }
    if resolved.loan_term_years == 0 || resolved.loan_term_years > resolved.project_life_years {
        return Err(BessFinanceError::invalid(
            "loan_term_years",
            "Loan term must be between 1 year and the project life",
        ));
    }
    Ok(resolved)
}

fn annual_debt_service(debt: Money, params: &Resolved) -> BessFinanceResult<Money> {
    if debt.is_zero() {
        return Ok(Decimal::ZERO);
    }
    level_payment(params.interest_rate, params.loan_term_years, debt)
}

/// Year-1 DSCR on a level annual payment: `(revenue − opex) / payment`.
pub fn estimate_dscr(input: &QuickEstimateInput) -> BessFinanceResult<ComputationOutput<DscrEstimate>> {
    let start = Instant::now();
    let params = resolve(input)?;
    let mut warnings = Vec::new();

    let net_operating_income = input.annual_revenue - input.annual_operating_cost;
    let debt_amount = input.total_capex * params.debt_ratio;
    let payment = annual_debt_service(debt_amount, &params)?;
    let dscr = if payment > Decimal::ZERO {
        Some(net_operating_income / payment)
    } else {
        None
    };

    if let Some(d) = dscr {
        if d < dec!(1.2) {
            warnings.push(format!("Estimated DSCR of {} is below 1.2x", d.round_dp(2)));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Quick DSCR estimate (level annual payment)",
        input,
        warnings,
        elapsed,
        DscrEstimate {
            net_operating_income,
            debt_amount,
            annual_debt_service: payment,
            dscr,
        },
    ))
}

/// Pre-tax equity IRR on flat operating income, level debt service over the
/// loan term, and the ITC received with the first year.
pub fn estimate_levered_irr(
    input: &QuickEstimateInput,
) -> BessFinanceResult<ComputationOutput<LeveredIrrEstimate>> {
    let start = Instant::now();
    let params = resolve(input)?;
    let mut warnings = Vec::new();

    let debt_amount = input.total_capex * params.debt_ratio;
    let equity_amount = input.total_capex - debt_amount;
    let payment = annual_debt_service(debt_amount, &params)?;
    let itc = input.total_capex * params.itc_rate;
    let noi = input.annual_revenue - input.annual_operating_cost;

    let mut cash_flows = Vec::with_capacity(params.project_life_years as usize + 1);
    cash_flows.push(-equity_amount);
    for yr in 1..=params.project_life_years {
        let service = if yr <= params.loan_term_years {
            payment
        } else {
            Decimal::ZERO
        };
        let credit = if yr == 1 { itc } else { Decimal::ZERO };
        cash_flows.push(noi - service + credit);
    }

    let levered_irr = irr(&cash_flows, dec!(0.10))?;
    warnings.extend(irr_warning("Levered IRR", levered_irr));

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Quick levered IRR estimate (pre-tax, flat NOI)",
        input,
        warnings,
        elapsed,
        LeveredIrrEstimate {
            equity_amount,
            cash_flows,
            levered_irr,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_value::npv;

    fn quick() -> QuickEstimateInput {
        QuickEstimateInput {
            total_capex: dec!(1000000),
            annual_revenue: dec!(250000),
            annual_operating_cost: dec!(50000),
            debt_ratio: Some(dec!(0.70)),
            interest_rate: Some(dec!(0.06)),
            loan_term_years: Some(15),
            project_life_years: Some(20),
            itc_rate: Some(dec!(0.30)),
        }
    }

    #[test]
    fn test_estimate_dscr() {
        let out = estimate_dscr(&quick()).unwrap();
        let r = &out.result;
        assert_eq!(r.net_operating_income, dec!(200000));
        assert_eq!(r.debt_amount, dec!(700000));
        // 700k over 15 years at 6% ≈ 72,073.90
        assert!((r.annual_debt_service - dec!(72073.90)).abs() < dec!(0.1));
        let dscr = r.dscr.unwrap();
        assert!((dscr - dec!(2.775)).abs() < dec!(0.001));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_estimate_dscr_without_debt() {
        let mut input = quick();
        input.debt_ratio = Some(Decimal::ZERO);
        let out = estimate_dscr(&input).unwrap();
        assert_eq!(out.result.dscr, None);
        assert_eq!(out.result.annual_debt_service, Decimal::ZERO);
    }

    #[test]
    fn test_estimate_levered_irr_zeroes_npv() {
        let out = estimate_levered_irr(&quick()).unwrap();
        let r = &out.result;
        assert_eq!(r.equity_amount, dec!(300000));
        assert_eq!(r.cash_flows.len(), 21);
        let rate = r.levered_irr.rate().expect("should converge");
        assert!(rate > Decimal::ZERO);
        assert!(npv(rate, &r.cash_flows).unwrap().abs() < dec!(1));
    }

    #[test]
    fn test_unrecoverable_equity_reports_no_irr() {
        let input = QuickEstimateInput {
            total_capex: dec!(1000000),
            annual_revenue: dec!(100),
            annual_operating_cost: Decimal::ZERO,
            debt_ratio: Some(Decimal::ZERO),
            interest_rate: None,
            loan_term_years: Some(1),
            project_life_years: Some(1),
            itc_rate: Some(Decimal::ZERO),
        };
        let out = estimate_levered_irr(&input).unwrap();
        assert_eq!(out.result.levered_irr.rate(), None);
        assert!(out
            .warnings
            .iter()
            .any(|w| w.starts_with("Levered IRR: no root found")));
    }

    #[test]
    fn test_rejects_zero_capex() {
        let mut input = quick();
        input.total_capex = Decimal::ZERO;
        assert!(estimate_dscr(&input).is_err());
        assert!(estimate_levered_irr(&input).is_err());
    }

    #[test]
    fn test_defaults_fill_missing_terms() {
        let json = r#"{
            "total_capex": "2000000",
            "annual_revenue": "300000",
            "annual_operating_cost": "60000"
        }"#;
        let input: QuickEstimateInput = serde_json::from_str(json).unwrap();
        let out = estimate_dscr(&input).unwrap();
        assert_eq!(out.result.debt_amount, dec!(1400000));
    }
}
