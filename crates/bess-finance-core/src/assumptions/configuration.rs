use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::assumptions::input::{
    DepreciationMethod, InterestResolution, ItcTiming, ModelInput, RevenueStreamSelection,
};
use crate::assumptions::market_rates::MarketRegion;
use crate::error::BessFinanceError;
use crate::types::{Megawatts, Money, Rate};
use crate::BessFinanceResult;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_PROJECT_LIFE_YEARS: u32 = 25;
pub const DEFAULT_CONSTRUCTION_PERIOD_YEARS: u32 = 1;
pub const MAX_PROJECT_LIFE_YEARS: u32 = 100;
pub const MAX_CONSTRUCTION_PERIOD_YEARS: u32 = 10;
pub const DEFAULT_DEBT_RATIO: Rate = dec!(0.70);
pub const DEFAULT_INTEREST_RATE: Rate = dec!(0.06);
pub const DEFAULT_LOAN_TERM_YEARS: u32 = 15;
pub const DEFAULT_FEDERAL_TAX_RATE: Rate = dec!(0.21);
pub const DEFAULT_STATE_TAX_RATE: Rate = dec!(0.06);
pub const DEFAULT_ITC_RATE: Rate = dec!(0.30);
pub const DEFAULT_DEGRADATION_RATE: Rate = dec!(0.025);
pub const DEFAULT_OM_COST_PCT: Rate = dec!(0.02);
pub const DEFAULT_INSURANCE_PCT: Rate = dec!(0.005);
pub const DEFAULT_LAND_LEASE_PER_MW_YEAR: Money = dec!(10000);
pub const DEFAULT_REVENUE_ESCALATION: Rate = dec!(0.02);
pub const DEFAULT_OM_ESCALATION: Rate = dec!(0.025);
pub const DEFAULT_DISCOUNT_RATE: Rate = dec!(0.08);
pub const DEFAULT_DEMAND_CHARGE: Money = dec!(15);
pub const DEFAULT_DEMAND_CAPTURE_RELIABILITY: Rate = dec!(0.85);
pub const DEFAULT_DEPTH_OF_DISCHARGE: Rate = dec!(0.90);
pub const DEFAULT_ARBITRAGE_SPREAD_FACTOR: Rate = dec!(0.5);
pub const DEFAULT_REGULATION_HOURS_PER_DAY: Decimal = dec!(4);
pub const DEFAULT_SPINNING_RESERVE_HOURS_PER_DAY: Decimal = dec!(4);

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Physical size of the quoted system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSize {
    pub power_mw: Megawatts,
    pub duration_hours: Decimal,
    pub energy_mwh: Decimal,
    pub solar_mw: Megawatts,
    pub wind_mw: Megawatts,
}

/// Input with every default applied. Built once per model run and read by
/// every downstream stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfiguration {
    pub project_name: String,
    pub location: String,
    pub region: MarketRegion,
    pub system: SystemSize,
    pub revenue_streams: RevenueStreamSelection,
    pub electricity_rate: Money,
    pub demand_charge: Money,

    pub project_life_years: u32,
    pub construction_period_years: u32,
    pub debt_ratio: Rate,
    pub interest_rate: Rate,
    pub loan_term_years: u32,
    pub federal_tax_rate: Rate,
    pub state_tax_rate: Rate,
    pub itc_rate: Rate,
    pub itc_timing: ItcTiming,
    pub depreciation_method: DepreciationMethod,
    pub degradation_rate: Rate,
    pub om_cost_pct: Rate,
    pub insurance_pct: Rate,
    pub land_lease_per_mw_year: Money,
    pub revenue_escalation: Rate,
    pub om_escalation: Rate,
    pub discount_rate: Rate,
    pub demand_capture_reliability: Rate,
    pub depth_of_discharge: Rate,
    pub arbitrage_spread_factor: Rate,
    pub regulation_hours_per_day: Decimal,
    pub spinning_reserve_hours_per_day: Decimal,
    pub interest_resolution: InterestResolution,
}

impl ModelConfiguration {
    /// Apply defaults to `input` and reject anything the pipeline cannot model.
    pub fn resolve(input: &ModelInput) -> BessFinanceResult<Self> {
        let a = &input.assumptions;
        let solar_mw = input.solar_mw.unwrap_or(Decimal::ZERO);
        let wind_mw = input.wind_mw.unwrap_or(Decimal::ZERO);

        let config = ModelConfiguration {
            project_name: input
                .project_name
                .clone()
                .unwrap_or_else(|| format!("{} BESS", input.location)),
            location: input.location.clone(),
            region: input.region,
            system: SystemSize {
                power_mw: input.storage_size_mw,
                duration_hours: input.duration_hours,
                energy_mwh: input.storage_size_mw * input.duration_hours,
                solar_mw,
                wind_mw,
            },
            revenue_streams: input.revenue_streams,
            electricity_rate: input.electricity_rate,
            demand_charge: input.demand_charge.unwrap_or(DEFAULT_DEMAND_CHARGE),

            project_life_years: a.project_life_years.unwrap_or(DEFAULT_PROJECT_LIFE_YEARS),
            construction_period_years: a
                .construction_period_years
                .unwrap_or(DEFAULT_CONSTRUCTION_PERIOD_YEARS),
            debt_ratio: a.debt_ratio.unwrap_or(DEFAULT_DEBT_RATIO),
            interest_rate: a.interest_rate.unwrap_or(DEFAULT_INTEREST_RATE),
            loan_term_years: a.loan_term_years.unwrap_or(DEFAULT_LOAN_TERM_YEARS),
            federal_tax_rate: a.federal_tax_rate.unwrap_or(DEFAULT_FEDERAL_TAX_RATE),
            state_tax_rate: a.state_tax_rate.unwrap_or(DEFAULT_STATE_TAX_RATE),
            itc_rate: a.itc_rate.unwrap_or(DEFAULT_ITC_RATE),
            itc_timing: a.itc_timing.unwrap_or_default(),
            depreciation_method: a.depreciation_method.unwrap_or_default(),
            degradation_rate: a.degradation_rate.unwrap_or(DEFAULT_DEGRADATION_RATE),
            om_cost_pct: a.om_cost_pct.unwrap_or(DEFAULT_OM_COST_PCT),
            insurance_pct: a.insurance_pct.unwrap_or(DEFAULT_INSURANCE_PCT),
            land_lease_per_mw_year: a
                .land_lease_per_mw_year
                .unwrap_or(DEFAULT_LAND_LEASE_PER_MW_YEAR),
            revenue_escalation: a.revenue_escalation.unwrap_or(DEFAULT_REVENUE_ESCALATION),
            om_escalation: a.om_escalation.unwrap_or(DEFAULT_OM_ESCALATION),
            discount_rate: a.discount_rate.unwrap_or(DEFAULT_DISCOUNT_RATE),
            demand_capture_reliability: a
                .demand_capture_reliability
                .unwrap_or(DEFAULT_DEMAND_CAPTURE_RELIABILITY),
            depth_of_discharge: a.depth_of_discharge.unwrap_or(DEFAULT_DEPTH_OF_DISCHARGE),
            arbitrage_spread_factor: a
                .arbitrage_spread_factor
                .unwrap_or(DEFAULT_ARBITRAGE_SPREAD_FACTOR),
            regulation_hours_per_day: a
                .regulation_hours_per_day
                .unwrap_or(DEFAULT_REGULATION_HOURS_PER_DAY),
            spinning_reserve_hours_per_day: a
                .spinning_reserve_hours_per_day
                .unwrap_or(DEFAULT_SPINNING_RESERVE_HOURS_PER_DAY),
            interest_resolution: a.interest_resolution.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Combined income tax rate with state tax deductible federally:
    /// `federal + state − federal × state`.
    pub fn combined_tax_rate(&self) -> Rate {
        self.federal_tax_rate + self.state_tax_rate - self.federal_tax_rate * self.state_tax_rate
    }

    /// Whether any share of capex is debt-financed.
    pub fn has_debt(&self) -> bool {
        self.debt_ratio > Decimal::ZERO
    }

    pub(crate) fn validate(&self) -> BessFinanceResult<()> {
        validate_positive("storage_size_mw", self.system.power_mw)?;
        validate_positive("duration_hours", self.system.duration_hours)?;
        validate_non_negative("solar_mw", self.system.solar_mw)?;
        validate_non_negative("wind_mw", self.system.wind_mw)?;
        validate_non_negative("electricity_rate", self.electricity_rate)?;
        validate_non_negative("demand_charge", self.demand_charge)?;
        validate_non_negative("land_lease_per_mw_year", self.land_lease_per_mw_year)?;

        if self.project_life_years == 0 || self.project_life_years > MAX_PROJECT_LIFE_YEARS {
            return Err(BessFinanceError::invalid(
                "project_life_years",
                format!("Project life must be between 1 and {MAX_PROJECT_LIFE_YEARS} years"),
            ));
        }
        if self.construction_period_years > MAX_CONSTRUCTION_PERIOD_YEARS {
            return Err(BessFinanceError::invalid(
                "construction_period_years",
                format!("Construction period must be at most {MAX_CONSTRUCTION_PERIOD_YEARS} years"),
            ));
        }

        validate_rate("debt_ratio", self.debt_ratio)?;
        validate_rate("interest_rate", self.interest_rate)?;
        validate_rate("federal_tax_rate", self.federal_tax_rate)?;
        validate_rate("state_tax_rate", self.state_tax_rate)?;
        validate_rate("itc_rate", self.itc_rate)?;
        validate_rate("degradation_rate", self.degradation_rate)?;
        validate_rate("om_cost_pct", self.om_cost_pct)?;
        validate_rate("insurance_pct", self.insurance_pct)?;
        validate_rate("revenue_escalation", self.revenue_escalation)?;
        validate_rate("om_escalation", self.om_escalation)?;
        validate_rate("discount_rate", self.discount_rate)?;
        validate_rate("demand_capture_reliability", self.demand_capture_reliability)?;
        validate_rate("depth_of_discharge", self.depth_of_discharge)?;
        validate_rate("arbitrage_spread_factor", self.arbitrage_spread_factor)?;

        validate_hours("regulation_hours_per_day", self.regulation_hours_per_day)?;
        validate_hours(
            "spinning_reserve_hours_per_day",
            self.spinning_reserve_hours_per_day,
        )?;

        if self.has_debt() {
            if self.loan_term_years == 0 {
                return Err(BessFinanceError::invalid(
                    "loan_term_years",
                    "Loan term must be at least 1 year when debt is used",
                ));
            }
            if self.loan_term_years > self.project_life_years {
                return Err(BessFinanceError::invalid(
                    "loan_term_years",
                    format!(
                        "Loan term ({}) exceeds project life ({})",
                        self.loan_term_years, self.project_life_years
                    ),
                ));
            }
        }

        if let InterestResolution::Iterative {
            max_passes,
            tolerance,
        } = self.interest_resolution
        {
            if max_passes < 2 {
                return Err(BessFinanceError::invalid(
                    "interest_resolution.max_passes",
                    "Iterative resolution needs at least 2 passes",
                ));
            }
            validate_positive("interest_resolution.tolerance", tolerance)?;
        }

        Ok(())
    }
}

fn validate_rate(field: &str, value: Rate) -> BessFinanceResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(BessFinanceError::invalid(
            field,
            format!("Rate must be between 0 and 1, got {value}"),
        ));
    }
    Ok(())
}

fn validate_positive(field: &str, value: Decimal) -> BessFinanceResult<()> {
    if value <= Decimal::ZERO {
        return Err(BessFinanceError::invalid(
            field,
            format!("Value must be positive, got {value}"),
        ));
    }
    Ok(())
}

fn validate_non_negative(field: &str, value: Decimal) -> BessFinanceResult<()> {
    if value < Decimal::ZERO {
        return Err(BessFinanceError::invalid(
            field,
            format!("Value must be non-negative, got {value}"),
        ));
    }
    Ok(())
}

fn validate_hours(field: &str, value: Decimal) -> BessFinanceResult<()> {
    if value < Decimal::ZERO || value > dec!(24) {
        return Err(BessFinanceError::invalid(
            field,
            format!("Hours per day must be between 0 and 24, got {value}"),
        ));
    }
    Ok(())
}
