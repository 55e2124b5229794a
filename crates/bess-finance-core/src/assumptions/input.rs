use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assumptions::market_rates::MarketRegion;
use crate::types::{Megawatts, Money, Rate};

/// Which revenue streams the project stacks. All six default to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueStreamSelection {
    pub energy_arbitrage: bool,
    pub demand_charge_reduction: bool,
    pub frequency_regulation: bool,
    pub spinning_reserve: bool,
    pub capacity_payments: bool,
    pub resource_adequacy: bool,
}

impl RevenueStreamSelection {
    pub fn all() -> Self {
        RevenueStreamSelection {
            energy_arbitrage: true,
            demand_charge_reduction: true,
            frequency_regulation: true,
            spinning_reserve: true,
            capacity_payments: true,
            resource_adequacy: true,
        }
    }

    pub fn none() -> Self {
        RevenueStreamSelection {
            energy_arbitrage: false,
            demand_charge_reduction: false,
            frequency_regulation: false,
            spinning_reserve: false,
            capacity_payments: false,
            resource_adequacy: false,
        }
    }
}

impl Default for RevenueStreamSelection {
    fn default() -> Self {
        Self::all()
    }
}

/// MACRS recovery period used for tax depreciation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    #[default]
    Macrs5,
    Macrs7,
}

/// When the investment tax credit turns into cash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItcTiming {
    /// Monetized at financial close, netted against the year-0 outlay
    UpFront,
    /// Claimed with the first operating-year tax filing
    #[default]
    FirstTaxYear,
}

/// How the interest/CADS circularity is closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum InterestResolution {
    /// One estimated pass, one corrective pass
    #[default]
    TwoPass,
    /// Repeat CADS → schedule → interest until the largest interest change
    /// is below `tolerance`
    Iterative { max_passes: u32, tolerance: Money },
}

/// Optional overrides for every financing, tax and operating assumption.
/// Anything left `None` takes the documented default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssumptionOverrides {
    pub project_life_years: Option<u32>,
    pub construction_period_years: Option<u32>,
    /// Debt share of total capex (0.70 = 70/30 debt/equity)
    pub debt_ratio: Option<Rate>,
    pub interest_rate: Option<Rate>,
    pub loan_term_years: Option<u32>,
    pub federal_tax_rate: Option<Rate>,
    pub state_tax_rate: Option<Rate>,
    pub itc_rate: Option<Rate>,
    pub itc_timing: Option<ItcTiming>,
    pub depreciation_method: Option<DepreciationMethod>,
    pub degradation_rate: Option<Rate>,
    /// Annual O&M as a share of capex
    pub om_cost_pct: Option<Rate>,
    /// Annual insurance premium as a share of capex
    pub insurance_pct: Option<Rate>,
    pub land_lease_per_mw_year: Option<Money>,
    pub revenue_escalation: Option<Rate>,
    pub om_escalation: Option<Rate>,
    pub discount_rate: Option<Rate>,
    /// Probability of catching the monthly peak
    pub demand_capture_reliability: Option<Rate>,
    pub depth_of_discharge: Option<Rate>,
    /// Average peak/off-peak spread as a share of the retail electricity rate
    pub arbitrage_spread_factor: Option<Rate>,
    pub regulation_hours_per_day: Option<Decimal>,
    pub spinning_reserve_hours_per_day: Option<Decimal>,
    pub interest_resolution: Option<InterestResolution>,
}

/// Fully-formed request for one project-finance model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInput {
    #[serde(default)]
    pub project_name: Option<String>,
    /// Battery power rating
    pub storage_size_mw: Megawatts,
    /// Battery discharge duration at rated power
    pub duration_hours: Decimal,
    #[serde(default)]
    pub solar_mw: Option<Megawatts>,
    #[serde(default)]
    pub wind_mw: Option<Megawatts>,
    /// Site location (city/state or utility territory)
    pub location: String,
    pub region: MarketRegion,
    /// Retail electricity rate, $/kWh
    pub electricity_rate: Money,
    /// Monthly demand charge, $/kW-month
    #[serde(default)]
    pub demand_charge: Option<Money>,
    #[serde(default)]
    pub revenue_streams: RevenueStreamSelection,
    #[serde(default)]
    pub assumptions: AssumptionOverrides,
    /// Anchors the commercial-operation and debt-maturity dates
    #[serde(default)]
    pub financial_close_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minimal_json_applies_serde_defaults() {
        let json = r#"{
            "storage_size_mw": "1",
            "duration_hours": "4",
            "location": "San Diego, CA",
            "region": "CAISO",
            "electricity_rate": "0.18"
        }"#;
        let input: ModelInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.storage_size_mw, dec!(1));
        assert_eq!(input.region, MarketRegion::Caiso);
        assert_eq!(input.revenue_streams, RevenueStreamSelection::all());
        assert_eq!(input.assumptions, AssumptionOverrides::default());
        assert!(input.financial_close_date.is_none());
    }

    #[test]
    fn test_partial_stream_selection() {
        let json = r#"{ "frequency_regulation": false }"#;
        let streams: RevenueStreamSelection = serde_json::from_str(json).unwrap();
        assert!(!streams.frequency_regulation);
        assert!(streams.energy_arbitrage);
    }

    #[test]
    fn test_iterative_resolution_is_tagged() {
        let json = r#"{ "mode": "iterative", "max_passes": 5, "tolerance": "0.01" }"#;
        let mode: InterestResolution = serde_json::from_str(json).unwrap();
        assert_eq!(
            mode,
            InterestResolution::Iterative {
                max_passes: 5,
                tolerance: dec!(0.01)
            }
        );
    }
}
