use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assumptions::configuration::ModelConfiguration;
use crate::revenue::projector::RevenueYear;
use crate::tax::depreciation::DepreciationYear;
use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Output structs
// ---------------------------------------------------------------------------

/// Operating expense lines for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingCosts {
    pub year: i32,
    pub om: Money,
    pub insurance: Money,
    pub land_lease: Money,
    pub total: Money,
}

/// Income statement for a single operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub year: i32,
    pub revenue: Money,
    pub om: Money,
    pub insurance: Money,
    pub land_lease: Money,
    pub total_opex: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub interest_expense: Money,
    pub ebt: Money,
    pub taxes: Money,
    pub net_income: Money,
}

impl IncomeStatement {
    /// Replace interest expense and recompute everything below EBITDA.
    pub fn apply_interest(&mut self, interest_expense: Money, tax_rate: Rate) {
        self.interest_expense = interest_expense;
        self.ebt = self.ebitda - self.depreciation - interest_expense;
        self.taxes = income_tax(self.ebt, tax_rate);
        self.net_income = self.ebt - self.taxes;
    }

    /// EBITDA less cash taxes.
    pub fn cash_available_for_debt_service(&self) -> Money {
        self.ebitda - self.taxes
    }
}

/// Tax on positive earnings only; losses are not carried forward.
pub fn income_tax(ebt: Money, tax_rate: Rate) -> Money {
    if ebt > Decimal::ZERO {
        ebt * tax_rate
    } else {
        Decimal::ZERO
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// O&M and insurance as shares of capex plus a per-MW land lease, all
/// escalating at the O&M escalation rate.
pub fn project_operating_costs(config: &ModelConfiguration, capex: Money) -> Vec<OperatingCosts> {
    let base_om = capex * config.om_cost_pct;
    let base_insurance = capex * config.insurance_pct;
    let base_lease = config.system.power_mw * config.land_lease_per_mw_year;

    let mut escalation = Decimal::ONE;
    let mut out = Vec::with_capacity(config.project_life_years as usize);
    for yr in 1..=config.project_life_years {
        if yr > 1 {
            escalation *= Decimal::ONE + config.om_escalation;
        }
        let om = base_om * escalation;
        let insurance = base_insurance * escalation;
        let land_lease = base_lease * escalation;
        out.push(OperatingCosts {
            year: yr as i32,
            om,
            insurance,
            land_lease,
            total: om + insurance + land_lease,
        });
    }
    out
}

/// Straight-line decaying interest estimate used before the debt schedule
/// exists: `debt × rate × (1 − (year−1)/term)` inside the term, zero after.
pub fn estimated_interest(debt: Money, rate: Rate, term_years: u32, life_years: u32) -> Vec<Money> {
    (1..=life_years)
        .map(|yr| {
            if term_years == 0 || yr > term_years {
                return Decimal::ZERO;
            }
            let elapsed = Decimal::from(yr - 1) / Decimal::from(term_years);
            debt * rate * (Decimal::ONE - elapsed)
        })
        .collect()
}

/// Combine revenue, operating costs and depreciation with an interest series.
///
/// All slices are indexed by operating year and must share the same length;
/// a missing interest entry is read as zero.
pub fn build_income_statements(
    revenue: &[RevenueYear],
    costs: &[OperatingCosts],
    depreciation: &[DepreciationYear],
    interest: &[Money],
    tax_rate: Rate,
) -> Vec<IncomeStatement> {
    revenue
        .iter()
        .zip(costs)
        .zip(depreciation)
        .enumerate()
        .map(|(i, ((rev, cost), dep))| {
            let mut statement = IncomeStatement {
                year: rev.year,
                revenue: rev.total,
                om: cost.om,
                insurance: cost.insurance,
                land_lease: cost.land_lease,
                total_opex: cost.total,
                ebitda: rev.total - cost.total,
                depreciation: dep.depreciation,
                interest_expense: Decimal::ZERO,
                ebt: Decimal::ZERO,
                taxes: Decimal::ZERO,
                net_income: Decimal::ZERO,
            };
            let interest_expense = interest.get(i).copied().unwrap_or(Decimal::ZERO);
            statement.apply_interest(interest_expense, tax_rate);
            statement
        })
        .collect()
}
