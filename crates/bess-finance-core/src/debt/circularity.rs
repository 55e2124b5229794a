use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assumptions::configuration::ModelConfiguration;
use crate::assumptions::input::InterestResolution;
use crate::debt::schedule::{build_debt_schedule, DebtScheduleYear};
use crate::revenue::projector::RevenueYear;
use crate::statements::income::{
    build_income_statements, estimated_interest, IncomeStatement, OperatingCosts,
};
use crate::tax::depreciation::DepreciationYear;
use crate::types::Money;
use crate::BessFinanceResult;

/// How the interest/CADS loop was closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestResolutionReport {
    pub mode: InterestResolution,
    /// Income-statement passes, including the estimated first pass
    pub passes: u32,
    /// Largest change in any year's interest on the final correction
    pub max_interest_adjustment: Money,
    /// Upper bound on the CADS error carried into the coverage ratios:
    /// `tax rate × max_interest_adjustment`
    pub cads_error_bound: Money,
    /// Iterative mode stopped on tolerance rather than the pass cap
    pub converged: bool,
}

/// Income statements and debt schedule after the interest correction.
#[derive(Debug, Clone)]
pub struct ResolvedFinancials {
    pub income_statements: Vec<IncomeStatement>,
    pub debt_schedule: Vec<DebtScheduleYear>,
    /// CADS the final schedule was built from; internal to coverage metrics
    pub cads: Vec<Money>,
    pub report: InterestResolutionReport,
}

/// Close the interest circularity.
///
/// Pass 1 prices interest with a straight-line estimate and derives CADS from
/// the draft statements. The debt schedule built from that CADS then supplies
/// actual interest, and the statements are recomputed below EBITDA. In
/// `TwoPass` mode that single correction is final. In `Iterative` mode CADS
/// is re-derived from the corrected statements and the schedule rebuilt until
/// the largest interest change drops below the tolerance or the pass cap is
/// reached.
pub fn resolve_interest_circularity(
    config: &ModelConfiguration,
    debt_amount: Money,
    revenue: &[RevenueYear],
    costs: &[OperatingCosts],
    depreciation: &[DepreciationYear],
) -> BessFinanceResult<ResolvedFinancials> {
    let tax_rate = config.combined_tax_rate();
    let (max_passes, tolerance) = match config.interest_resolution {
        InterestResolution::TwoPass => (2, None),
        InterestResolution::Iterative {
            max_passes,
            tolerance,
        } => (max_passes.max(2), Some(tolerance)),
    };

    let mut interest = estimated_interest(
        debt_amount,
        config.interest_rate,
        config.loan_term_years,
        config.project_life_years,
    );
    let mut statements =
        build_income_statements(revenue, costs, depreciation, &interest, tax_rate);
    let mut passes = 1;

    loop {
        let cads: Vec<Money> = statements
            .iter()
            .map(IncomeStatement::cash_available_for_debt_service)
            .collect();
        let schedule = build_debt_schedule(
            debt_amount,
            config.interest_rate,
            config.loan_term_years,
            config.project_life_years,
            &cads,
        )?;

        let actual: Vec<Money> = schedule.iter().map(|y| y.interest).collect();
        let adjustment = interest
            .iter()
            .zip(&actual)
            .map(|(est, act)| (*act - *est).abs())
            .max()
            .unwrap_or(Decimal::ZERO);

        for (statement, amount) in statements.iter_mut().zip(&actual) {
            statement.apply_interest(*amount, tax_rate);
        }
        passes += 1;
        interest = actual;

        let within_tolerance = tolerance.map(|tol| adjustment < tol);
        if within_tolerance.unwrap_or(true) || passes >= max_passes {
            if within_tolerance == Some(false) {
                log::warn!(
                    "Interest resolution stopped at {passes} passes with adjustment {adjustment}"
                );
            }
            log::debug!("Interest circularity closed after {passes} passes (max adjustment {adjustment})");

            return Ok(ResolvedFinancials {
                income_statements: statements,
                debt_schedule: schedule,
                cads,
                report: InterestResolutionReport {
                    mode: config.interest_resolution,
                    passes,
                    max_interest_adjustment: adjustment,
                    cads_error_bound: adjustment * tax_rate,
                    converged: within_tolerance.unwrap_or(false),
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::input::{AssumptionOverrides, ModelInput, RevenueStreamSelection};
    use crate::assumptions::market_rates::{MarketRateTable, MarketRegion};
    use crate::collaborators::BatteryConstants;
    use crate::revenue::projector::project_revenue;
    use crate::statements::income::project_operating_costs;
    use crate::tax::depreciation::{depreciable_basis, depreciation_schedule};
    use rust_decimal_macros::dec;

    const CAPEX: Money = dec!(1750000);

    fn config(resolution: InterestResolution) -> ModelConfiguration {
        let input = ModelInput {
            project_name: None,
            storage_size_mw: dec!(1),
            duration_hours: dec!(4),
            solar_mw: None,
            wind_mw: None,
            location: "San Diego, CA".into(),
            region: MarketRegion::Caiso,
            electricity_rate: dec!(0.18),
            demand_charge: None,
            revenue_streams: RevenueStreamSelection::all(),
            assumptions: AssumptionOverrides {
                interest_resolution: Some(resolution),
                ..Default::default()
            },
            financial_close_date: None,
        };
        ModelConfiguration::resolve(&input).unwrap()
    }

    fn resolve(config: &ModelConfiguration) -> ResolvedFinancials {
        let revenue = project_revenue(config, &BatteryConstants::default(), &MarketRateTable::default());
        let costs = project_operating_costs(config, CAPEX);
        let basis = depreciable_basis(CAPEX, config.itc_rate);
        let depreciation =
            depreciation_schedule(basis, config.depreciation_method, config.project_life_years);
        let debt = CAPEX * config.debt_ratio;
        resolve_interest_circularity(config, debt, &revenue, &costs, &depreciation).unwrap()
    }

    #[test]
    fn test_two_pass_uses_schedule_interest() {
        let resolved = resolve(&config(InterestResolution::TwoPass));
        assert_eq!(resolved.report.passes, 2);
        for (statement, year) in resolved
            .income_statements
            .iter()
            .zip(&resolved.debt_schedule)
        {
            assert_eq!(statement.interest_expense, year.interest);
        }
        assert!(resolved.report.max_interest_adjustment > Decimal::ZERO);
        assert_eq!(
            resolved.report.cads_error_bound,
            resolved.report.max_interest_adjustment * dec!(0.2574)
        );
    }

    #[test]
    fn test_iterative_converges_after_correction() {
        let resolved = resolve(&config(InterestResolution::Iterative {
            max_passes: 10,
            tolerance: dec!(0.01),
        }));
        assert!(resolved.report.converged);
        // Schedule interest does not move once CADS is re-derived
        assert_eq!(resolved.report.passes, 3);
        assert_eq!(resolved.report.max_interest_adjustment, Decimal::ZERO);
    }

    #[test]
    fn test_iterative_cads_matches_final_statements() {
        let resolved = resolve(&config(InterestResolution::Iterative {
            max_passes: 10,
            tolerance: dec!(0.01),
        }));
        for (cads, statement) in resolved.cads.iter().zip(&resolved.income_statements) {
            assert_eq!(*cads, statement.cash_available_for_debt_service());
        }
    }
}
