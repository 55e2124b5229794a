use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::assumptions::configuration::ModelConfiguration;
use crate::assumptions::market_rates::MarketRateTable;
use crate::collaborators::BatteryConstants;
use crate::types::Money;

const KW_PER_MW: Decimal = dec!(1000);
const MONTHS_PER_YEAR: Decimal = dec!(12);
const DAYS_PER_YEAR: Decimal = dec!(365);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Year-1 revenue by stream, before escalation and degradation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRevenue {
    pub energy_arbitrage: Money,
    pub demand_charge_reduction: Money,
    pub frequency_regulation: Money,
    pub spinning_reserve: Money,
    pub capacity_payments: Money,
    pub resource_adequacy: Money,
}

/// Revenue stack for one project year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueYear {
    pub year: i32,
    pub energy_arbitrage: Money,
    pub demand_charge_reduction: Money,
    pub frequency_regulation: Money,
    pub spinning_reserve: Money,
    pub capacity_payments: Money,
    pub resource_adequacy: Money,
    pub total: Money,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Year-1 revenue for every enabled stream; disabled streams are zero.
pub fn baseline_revenue(
    config: &ModelConfiguration,
    battery: &BatteryConstants,
    rates: &MarketRateTable,
) -> BaselineRevenue {
    let streams = &config.revenue_streams;
    let system = &config.system;
    let region_rates = rates.rates_for(config.region);
    let enabled = |on: bool, amount: Money| if on { amount } else { Decimal::ZERO };

    // Effective capacity × RTE × cycles × average spread
    let usable_kwh = system.energy_mwh * KW_PER_MW * config.depth_of_discharge;
    let price_spread = config.electricity_rate * config.arbitrage_spread_factor;
    let energy_arbitrage = usable_kwh
        * battery.round_trip_efficiency
        * battery.annual_cycles
        * price_spread;

    let demand_charge_reduction = system.power_mw
        * KW_PER_MW
        * config.demand_charge
        * MONTHS_PER_YEAR
        * config.demand_capture_reliability;

    let frequency_regulation = system.power_mw
        * region_rates.regulation_per_mw_hour
        * config.regulation_hours_per_day
        * DAYS_PER_YEAR;

    let spinning_reserve = system.power_mw
        * region_rates.spinning_reserve_per_mw_hour
        * config.spinning_reserve_hours_per_day
        * DAYS_PER_YEAR;

    let capacity_payments = system.power_mw * region_rates.capacity_per_mw_year;

    let resource_adequacy = if rates.qualifies_for_resource_adequacy(config.region) {
        let ra = &rates.resource_adequacy;
        let proration = if ra.qualifying_duration_hours > Decimal::ZERO {
            (system.duration_hours / ra.qualifying_duration_hours).min(Decimal::ONE)
        } else {
            Decimal::ONE
        };
        system.power_mw * ra.price_per_mw_month * MONTHS_PER_YEAR * proration
    } else {
        Decimal::ZERO
    };

    BaselineRevenue {
        energy_arbitrage: enabled(streams.energy_arbitrage, energy_arbitrage),
        demand_charge_reduction: enabled(streams.demand_charge_reduction, demand_charge_reduction),
        frequency_regulation: enabled(streams.frequency_regulation, frequency_regulation),
        spinning_reserve: enabled(streams.spinning_reserve, spinning_reserve),
        capacity_payments: enabled(streams.capacity_payments, capacity_payments),
        resource_adequacy: enabled(streams.resource_adequacy, resource_adequacy),
    }
}

/// Project the revenue stack over the project life.
///
/// Every stream escalates at `(1 + escalation)^(year-1)`. Streams that scale
/// with installed power or energy also fade with `(1 - degradation)^(year-1)`;
/// capacity payments and resource adequacy are contracted per MW and do not.
pub fn project_revenue(
    config: &ModelConfiguration,
    battery: &BatteryConstants,
    rates: &MarketRateTable,
) -> Vec<RevenueYear> {
    let base = baseline_revenue(config, battery, rates);
    let mut years = Vec::with_capacity(config.project_life_years as usize);

    let mut escalation = Decimal::ONE;
    let mut retention = Decimal::ONE;

    for yr in 1..=config.project_life_years {
        if yr > 1 {
            escalation *= Decimal::ONE + config.revenue_escalation;
            retention *= Decimal::ONE - config.degradation_rate;
        }
        let faded = escalation * retention;

        let energy_arbitrage = base.energy_arbitrage * faded;
        let demand_charge_reduction = base.demand_charge_reduction * faded;
        let frequency_regulation = base.frequency_regulation * faded;
        let spinning_reserve = base.spinning_reserve * faded;
        let capacity_payments = base.capacity_payments * escalation;
        let resource_adequacy = base.resource_adequacy * escalation;

        let total = energy_arbitrage
            + demand_charge_reduction
            + frequency_regulation
            + spinning_reserve
            + capacity_payments
            + resource_adequacy;

        years.push(RevenueYear {
            year: yr as i32,
            energy_arbitrage,
            demand_charge_reduction,
            frequency_regulation,
            spinning_reserve,
            capacity_payments,
            resource_adequacy,
            total,
        });
    }

    years
}

/// Capacity retention factor `(1 - degradation)^(year-1)` for each year.
pub fn retention_curve(degradation_rate: Decimal, years: u32) -> Vec<Decimal> {
    let mut curve = Vec::with_capacity(years as usize);
    let mut retention = Decimal::ONE;
    for yr in 1..=years {
        if yr > 1 {
            retention *= Decimal::ONE - degradation_rate;
        }
        curve.push(retention);
    }
    curve
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::input::{
        AssumptionOverrides, ModelInput, RevenueStreamSelection,
    };
    use crate::assumptions::market_rates::MarketRegion;

    fn config_with(region: MarketRegion, streams: RevenueStreamSelection) -> ModelConfiguration {
        let input = ModelInput {
            project_name: None,
            storage_size_mw: dec!(1),
            duration_hours: dec!(4),
            solar_mw: None,
            wind_mw: None,
            location: "Test".into(),
            region,
            electricity_rate: dec!(0.20),
            demand_charge: Some(dec!(15)),
            revenue_streams: streams,
            assumptions: AssumptionOverrides::default(),
            financial_close_date: None,
        };
        ModelConfiguration::resolve(&input).unwrap()
    }

    fn battery() -> BatteryConstants {
        BatteryConstants {
            round_trip_efficiency: dec!(0.85),
            annual_cycles: dec!(365),
        }
    }

    #[test]
    fn test_arbitrage_baseline() {
        let mut streams = RevenueStreamSelection::none();
        streams.energy_arbitrage = true;
        let config = config_with(MarketRegion::Caiso, streams);
        let base = baseline_revenue(&config, &battery(), &MarketRateTable::default());
        // 4000 kWh * 0.9 DoD * 0.85 * 365 * (0.20 * 0.5)
        assert_eq!(base.energy_arbitrage, dec!(111690));
        assert_eq!(base.demand_charge_reduction, Decimal::ZERO);
    }

    #[test]
    fn test_demand_charge_baseline() {
        let config = config_with(MarketRegion::Caiso, RevenueStreamSelection::all());
        let base = baseline_revenue(&config, &battery(), &MarketRateTable::default());
        // 1000 kW * $15 * 12 * 0.85
        assert_eq!(base.demand_charge_reduction, dec!(153000));
    }

    #[test]
    fn test_ancillary_uses_region_rates() {
        let config = config_with(MarketRegion::Pjm, RevenueStreamSelection::all());
        let base = baseline_revenue(&config, &battery(), &MarketRateTable::default());
        // 1 MW * $20/MW-h * 4 h * 365
        assert_eq!(base.frequency_regulation, dec!(29200));
        // 1 MW * $5/MW-h * 4 h * 365
        assert_eq!(base.spinning_reserve, dec!(7300));
        assert_eq!(base.capacity_payments, dec!(50000));
        assert_eq!(base.resource_adequacy, Decimal::ZERO);
    }

    #[test]
    fn test_resource_adequacy_prorated_by_duration() {
        let mut config = config_with(MarketRegion::Caiso, RevenueStreamSelection::all());
        let rates = MarketRateTable::default();
        let full = baseline_revenue(&config, &battery(), &rates).resource_adequacy;
        assert_eq!(full, dec!(84000));

        config.system.duration_hours = dec!(2);
        config.system.energy_mwh = dec!(2);
        let half = baseline_revenue(&config, &battery(), &rates).resource_adequacy;
        assert_eq!(half, dec!(42000));
    }

    #[test]
    fn test_degradation_skips_contracted_streams() {
        let config = config_with(MarketRegion::Pjm, RevenueStreamSelection::all());
        let years = project_revenue(&config, &battery(), &MarketRateTable::default());
        let y1 = &years[0];
        let y2 = &years[1];
        // Capacity only escalates
        assert_eq!(y2.capacity_payments, y1.capacity_payments * dec!(1.02));
        // Regulation escalates and degrades
        assert_eq!(
            y2.frequency_regulation,
            y1.frequency_regulation * dec!(1.02) * dec!(0.975)
        );
    }

    #[test]
    fn test_total_is_sum_and_length_is_life() {
        let config = config_with(MarketRegion::Caiso, RevenueStreamSelection::all());
        let years = project_revenue(&config, &battery(), &MarketRateTable::default());
        assert_eq!(years.len(), 25);
        for y in &years {
            let sum = y.energy_arbitrage
                + y.demand_charge_reduction
                + y.frequency_regulation
                + y.spinning_reserve
                + y.capacity_payments
                + y.resource_adequacy;
            assert_eq!(y.total, sum);
            assert!(y.total >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_all_streams_disabled() {
        let config = config_with(MarketRegion::Caiso, RevenueStreamSelection::none());
        let years = project_revenue(&config, &battery(), &MarketRateTable::default());
        assert!(years.iter().all(|y| y.total.is_zero()));
    }

    #[test]
    fn test_unknown_region_uses_other_rates() {
        let config = config_with(MarketRegion::from_code("HECO"), RevenueStreamSelection::all());
        let base = baseline_revenue(&config, &battery(), &MarketRateTable::default());
        assert_eq!(base.capacity_payments, dec!(30000));
    }

    #[test]
    fn test_retention_curve() {
        let curve = retention_curve(dec!(0.1), 3);
        assert_eq!(curve, vec![dec!(1), dec!(0.9), dec!(0.81)]);
    }
}
