//! Interfaces to the upstream quoting services, plus in-process
//! implementations used by the CLI, the bindings and tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::assumptions::configuration::ModelConfiguration;
use crate::assumptions::market_rates::MarketRegion;
use crate::error::BessFinanceError;
use crate::types::{Megawatts, Money, Rate};
use crate::BessFinanceResult;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// What the equipment quote service is asked to price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub power_mw: Megawatts,
    pub energy_mwh: Decimal,
    pub solar_mw: Megawatts,
    pub wind_mw: Megawatts,
    pub location: String,
    pub region: MarketRegion,
}

impl From<&ModelConfiguration> for QuoteRequest {
    fn from(config: &ModelConfiguration) -> Self {
        QuoteRequest {
            power_mw: config.system.power_mw,
            energy_mwh: config.system.energy_mwh,
            solar_mw: config.system.solar_mw,
            wind_mw: config.system.wind_mw,
            location: config.location.clone(),
            region: config.region,
        }
    }
}

/// Priced project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentQuote {
    /// All-in installed capital cost
    pub total_capex: Money,
}

/// Battery performance constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryConstants {
    pub round_trip_efficiency: Rate,
    /// Full equivalent cycles per year
    pub annual_cycles: Decimal,
}

impl Default for BatteryConstants {
    fn default() -> Self {
        BatteryConstants {
            round_trip_efficiency: dec!(0.85),
            annual_cycles: dec!(365),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Equipment/quote service returning total project capital cost.
pub trait QuoteLookup: Send + Sync {
    fn quote(&self, request: &QuoteRequest) -> BessFinanceResult<EquipmentQuote>;
}

/// Constants service returning efficiency and cycling assumptions.
pub trait ConstantsLookup: Send + Sync {
    fn battery_constants(&self) -> BessFinanceResult<BatteryConstants>;
}

/// Any collaborator failure surfaces as `DependencyUnavailable` for `service`.
fn unavailable(service: &str, err: BessFinanceError) -> BessFinanceError {
    match err {
        BessFinanceError::DependencyUnavailable { .. } => err,
        other => BessFinanceError::DependencyUnavailable {
            service: service.into(),
            reason: other.to_string(),
        },
    }
}

/// Call the quote service and refuse anything that is not a usable capex.
pub(crate) fn fetch_quote(
    quotes: &dyn QuoteLookup,
    request: &QuoteRequest,
) -> BessFinanceResult<EquipmentQuote> {
    let quote = quotes
        .quote(request)
        .map_err(|e| unavailable("quote", e))?;
    if quote.total_capex <= Decimal::ZERO {
        return Err(BessFinanceError::DependencyUnavailable {
            service: "quote".into(),
            reason: format!("non-positive total capex {}", quote.total_capex),
        });
    }
    Ok(quote)
}

/// Call the constants service and check the values are physically possible.
pub(crate) fn fetch_constants(
    constants: &dyn ConstantsLookup,
) -> BessFinanceResult<BatteryConstants> {
    let values = constants
        .battery_constants()
        .map_err(|e| unavailable("constants", e))?;
    if values.round_trip_efficiency <= Decimal::ZERO || values.round_trip_efficiency > Decimal::ONE
    {
        return Err(BessFinanceError::DependencyUnavailable {
            service: "constants".into(),
            reason: format!(
                "round-trip efficiency {} outside (0, 1]",
                values.round_trip_efficiency
            ),
        });
    }
    if values.annual_cycles <= Decimal::ZERO {
        return Err(BessFinanceError::DependencyUnavailable {
            service: "constants".into(),
            reason: format!("non-positive annual cycle count {}", values.annual_cycles),
        });
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// Installed-cost unit prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPrices {
    pub storage_per_kwh: Money,
    pub power_conversion_per_kw: Money,
    pub solar_per_w: Money,
    pub wind_per_w: Money,
}

impl Default for UnitPrices {
    fn default() -> Self {
        UnitPrices {
            storage_per_kwh: dec!(350),
            power_conversion_per_kw: dec!(150),
            solar_per_w: dec!(1.0),
            wind_per_w: dec!(1.4),
        }
    }
}

impl UnitPrices {
    fn price(&self, request: &QuoteRequest) -> Money {
        let kwh = request.energy_mwh * dec!(1000);
        let kw = request.power_mw * dec!(1000);
        let solar_w = request.solar_mw * dec!(1000000);
        let wind_w = request.wind_mw * dec!(1000000);
        kwh * self.storage_per_kwh
            + kw * self.power_conversion_per_kw
            + solar_w * self.solar_per_w
            + wind_w * self.wind_per_w
    }
}

/// Where capex comes from when no live quote service is wired in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum QuoteSource {
    /// A capex figure already produced by the quoting step
    Fixed { total_capex: Money },
    /// Price from unit costs
    UnitPrices(UnitPrices),
}

impl Default for QuoteSource {
    fn default() -> Self {
        QuoteSource::UnitPrices(UnitPrices::default())
    }
}

impl QuoteLookup for QuoteSource {
    fn quote(&self, request: &QuoteRequest) -> BessFinanceResult<EquipmentQuote> {
        let total_capex = match self {
            QuoteSource::Fixed { total_capex } => *total_capex,
            QuoteSource::UnitPrices(prices) => prices.price(request),
        };
        Ok(EquipmentQuote { total_capex })
    }
}

impl ConstantsLookup for BatteryConstants {
    fn battery_constants(&self) -> BessFinanceResult<BatteryConstants> {
        Ok(self.clone())
    }
}

/// Wraps a quote service and scales every capex it returns.
pub struct ScaledQuote<'a> {
    pub inner: &'a dyn QuoteLookup,
    pub factor: Decimal,
}

impl QuoteLookup for ScaledQuote<'_> {
    fn quote(&self, request: &QuoteRequest) -> BessFinanceResult<EquipmentQuote> {
        let base = self.inner.quote(request)?;
        Ok(EquipmentQuote {
            total_capex: base.total_capex * self.factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    impl QuoteLookup for Offline {
        fn quote(&self, _request: &QuoteRequest) -> BessFinanceResult<EquipmentQuote> {
            Err(BessFinanceError::DependencyUnavailable {
                service: "quote".into(),
                reason: "timeout".into(),
            })
        }
    }

    struct GarbledQuote;

    impl QuoteLookup for GarbledQuote {
        fn quote(&self, _request: &QuoteRequest) -> BessFinanceResult<EquipmentQuote> {
            Err(BessFinanceError::SerializationError("expected a number".into()))
        }
    }

    struct OverflowingConstants;

    impl ConstantsLookup for OverflowingConstants {
        fn battery_constants(&self) -> BessFinanceResult<BatteryConstants> {
            Err(BessFinanceError::NumericalDegeneracy {
                context: "cycle table".into(),
            })
        }
    }

    fn request() -> QuoteRequest {
        QuoteRequest {
            power_mw: dec!(1),
            energy_mwh: dec!(4),
            solar_mw: dec!(0.5),
            wind_mw: Decimal::ZERO,
            location: "Austin, TX".into(),
            region: MarketRegion::Ercot,
        }
    }

    #[test]
    fn test_unit_price_quote() {
        let quote = QuoteSource::default().quote(&request()).unwrap();
        // 4000 kWh * 350 + 1000 kW * 150 + 500,000 W * 1.0
        assert_eq!(quote.total_capex, dec!(2050000));
    }

    #[test]
    fn test_scaled_quote() {
        let base = QuoteSource::Fixed {
            total_capex: dec!(1000000),
        };
        let scaled = ScaledQuote {
            inner: &base,
            factor: dec!(1.2),
        };
        assert_eq!(scaled.quote(&request()).unwrap().total_capex, dec!(1200000));
    }

    #[test]
    fn test_fetch_quote_propagates_outage() {
        let err = fetch_quote(&Offline, &request()).unwrap_err();
        assert!(matches!(
            err,
            BessFinanceError::DependencyUnavailable { ref reason, .. } if reason == "timeout"
        ));
    }

    #[test]
    fn test_fetch_quote_rejects_zero_capex() {
        let zero = QuoteSource::Fixed {
            total_capex: Decimal::ZERO,
        };
        assert!(matches!(
            fetch_quote(&zero, &request()),
            Err(BessFinanceError::DependencyUnavailable { .. })
        ));
    }

    #[test]
    fn test_fetch_constants_rejects_bad_efficiency() {
        let bad = BatteryConstants {
            round_trip_efficiency: dec!(1.2),
            annual_cycles: dec!(365),
        };
        assert!(fetch_constants(&bad).is_err());
        assert!(fetch_constants(&BatteryConstants::default()).is_ok());
    }

    #[test]
    fn test_quote_errors_become_dependency_unavailable() {
        let err = fetch_quote(&GarbledQuote, &request()).unwrap_err();
        match err {
            BessFinanceError::DependencyUnavailable { service, reason } => {
                assert_eq!(service, "quote");
                assert!(reason.contains("expected a number"), "{reason}");
            }
            other => panic!("expected DependencyUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_constants_errors_become_dependency_unavailable() {
        let err = fetch_constants(&OverflowingConstants).unwrap_err();
        assert!(matches!(
            err,
            BessFinanceError::DependencyUnavailable { ref service, .. } if service == "constants"
        ));
    }
}
