use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::assumptions::configuration::ModelConfiguration;
use crate::collaborators::BatteryConstants;
use crate::revenue::projector::retention_curve;
use crate::statements::balance_sheet::CapitalStructure;
use crate::statements::cash_flow::CashFlowYear;
use crate::statements::income::OperatingCosts;
use crate::time_value::{irr, npv, IrrOutcome};
use crate::types::{Money, Multiple, Rate, Years};
use crate::BessFinanceResult;

const IRR_GUESS: Rate = dec!(0.10);
const KWH_PER_MWH: Decimal = dec!(1000);
const DAYS_PER_YEAR: Decimal = dec!(365);

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Investor and lender return metrics for one model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    /// Year 0 = −capex (net of an up-front ITC), years 1..N = FCFF
    pub unlevered_cash_flows: Vec<Money>,
    /// Year 0 = −equity (net of an up-front ITC), years 1..N = FCFE
    pub levered_cash_flows: Vec<Money>,
    pub unlevered_irr: IrrOutcome,
    pub levered_irr: IrrOutcome,
    pub npv: Money,
    pub equity_npv: Money,
    pub simple_payback_years: Years,
    pub discounted_payback_years: Years,
    pub moic: Option<Multiple>,
    /// Levelized cost of storage, $/MWh discharged
    pub lcos_per_mwh: Option<Money>,
    pub effective_capacity_factor_pct: Decimal,
    pub llcr: Option<Multiple>,
    pub plcr: Option<Multiple>,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Compute every return metric from the finished statements.
pub fn compute_return_metrics(
    config: &ModelConfiguration,
    battery: &BatteryConstants,
    capital: &CapitalStructure,
    cash_flows: &[CashFlowYear],
    costs: &[OperatingCosts],
    cads: &[Money],
) -> BessFinanceResult<ReturnMetrics> {
    let up_front_credit = capital.itc_up_front;

    let mut unlevered_cash_flows = Vec::with_capacity(cash_flows.len() + 1);
    unlevered_cash_flows.push(-capital.total_capex + up_front_credit);
    unlevered_cash_flows.extend(cash_flows.iter().map(|cf| cf.free_cash_flow_to_firm));

    let mut levered_cash_flows = Vec::with_capacity(cash_flows.len() + 1);
    levered_cash_flows.push(-capital.equity_amount + up_front_credit);
    levered_cash_flows.extend(cash_flows.iter().map(|cf| cf.free_cash_flow_to_equity));

    let unlevered_irr = irr(&unlevered_cash_flows, IRR_GUESS)?;
    let levered_irr = irr(&levered_cash_flows, IRR_GUESS)?;

    let project_npv = npv(config.discount_rate, &unlevered_cash_flows)?;
    let equity_npv = npv(config.discount_rate, &levered_cash_flows)?;

    let life = Decimal::from(config.project_life_years);
    let simple_payback_years = payback_period(&unlevered_cash_flows, None, life);
    let discounted_payback_years =
        payback_period(&unlevered_cash_flows, Some(config.discount_rate), life);

    let moic = multiple_on_invested_capital(&levered_cash_flows, capital.equity_amount);

    let lcos_per_mwh =
        levelized_cost_of_storage(config, battery, capital.total_capex, costs)?;
    let effective_capacity_factor_pct = effective_capacity_factor(config, battery);

    let term = (config.loan_term_years as usize).min(cads.len());
    let llcr = coverage_life_ratio(&cads[..term], config.interest_rate, capital.debt_amount)?;
    let plcr = coverage_life_ratio(cads, config.interest_rate, capital.debt_amount)?;

    Ok(ReturnMetrics {
        unlevered_cash_flows,
        levered_cash_flows,
        unlevered_irr,
        levered_irr,
        npv: project_npv,
        equity_npv,
        simple_payback_years,
        discounted_payback_years,
        moic,
        lcos_per_mwh,
        effective_capacity_factor_pct,
        llcr,
        plcr,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Years until cumulative (optionally discounted) cash flow turns
/// non-negative, interpolated linearly within the crossing year. Returns
/// `never` when the flows are not recovered.
pub fn payback_period(cash_flows: &[Money], discount_rate: Option<Rate>, never: Years) -> Years {
    let Some((first, rest)) = cash_flows.split_first() else {
        return never;
    };
    if *first >= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let one_plus_r = Decimal::ONE + discount_rate.unwrap_or(Decimal::ZERO);
    let mut discount = Decimal::ONE;
    let mut cumulative = *first;

    for (i, cf) in rest.iter().enumerate() {
        discount *= one_plus_r;
        let present = match cf.checked_div(discount) {
            Some(v) => v,
            None => return never,
        };
        let previous = cumulative;
        cumulative += present;
        if cumulative >= Decimal::ZERO {
            let fraction = if present > Decimal::ZERO {
                -previous / present
            } else {
                Decimal::ZERO
            };
            return Decimal::from(i as i64) + fraction;
        }
    }

    never
}

/// Sum of positive levered flows after close over the equity invested.
pub fn multiple_on_invested_capital(levered: &[Money], equity: Money) -> Option<Multiple> {
    if equity <= Decimal::ZERO {
        return None;
    }
    let distributions: Money = levered
        .iter()
        .skip(1)
        .filter(|cf| **cf > Decimal::ZERO)
        .sum();
    Some(distributions / equity)
}

/// `(capex + NPV(opex) + NPV(charging)) / NPV(MWh discharged)`.
///
/// Discharge is usable energy × cycles × retention; charging buys the
/// discharged energy grossed up for round-trip losses at the escalating
/// electricity rate. `None` when nothing is discharged.
pub fn levelized_cost_of_storage(
    config: &ModelConfiguration,
    battery: &BatteryConstants,
    capex: Money,
    costs: &[OperatingCosts],
) -> BessFinanceResult<Option<Money>> {
    let usable_mwh = config.system.energy_mwh * config.depth_of_discharge;
    let retention = retention_curve(config.degradation_rate, config.project_life_years);

    let mut discharged = vec![Decimal::ZERO];
    let mut charging = vec![Decimal::ZERO];
    let mut escalation = Decimal::ONE;
    for (i, r) in retention.iter().enumerate() {
        if i > 0 {
            escalation *= Decimal::ONE + config.revenue_escalation;
        }
        let mwh = usable_mwh * battery.annual_cycles * r;
        let purchased_kwh = mwh / battery.round_trip_efficiency * KWH_PER_MWH;
        discharged.push(mwh);
        charging.push(purchased_kwh * config.electricity_rate * escalation);
    }

    let mut opex = vec![Decimal::ZERO];
    opex.extend(costs.iter().map(|c| c.total));

    let pv_discharged = npv(config.discount_rate, &discharged)?;
    if pv_discharged <= Decimal::ZERO {
        return Ok(None);
    }
    let pv_opex = npv(config.discount_rate, &opex)?;
    let pv_charging = npv(config.discount_rate, &charging)?;

    Ok(Some((capex + pv_opex + pv_charging) / pv_discharged))
}

/// Realized cycling over the maximum of one full cycle per day, in percent.
pub fn effective_capacity_factor(config: &ModelConfiguration, battery: &BatteryConstants) -> Decimal {
    let retention = retention_curve(config.degradation_rate, config.project_life_years);
    let realized: Decimal = retention.iter().map(|r| battery.annual_cycles * r).sum();
    let theoretical = DAYS_PER_YEAR * Decimal::from(config.project_life_years);
    if theoretical.is_zero() {
        return Decimal::ZERO;
    }
    realized / theoretical * dec!(100)
}

/// PV of CADS at the debt rate, first year discounted one period, over the
/// debt amount. Used for both LLCR (loan term) and PLCR (project life).
pub fn coverage_life_ratio(
    cads: &[Money],
    rate: Rate,
    debt: Money,
) -> BessFinanceResult<Option<Multiple>> {
    if debt <= Decimal::ZERO || cads.is_empty() {
        return Ok(None);
    }
    let mut flows = Vec::with_capacity(cads.len() + 1);
    flows.push(Decimal::ZERO);
    flows.extend_from_slice(cads);
    let pv = npv(rate, &flows)?;
    Ok(Some(pv / debt))
}
