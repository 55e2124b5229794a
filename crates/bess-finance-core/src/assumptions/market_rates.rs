use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Money;

// ---------------------------------------------------------------------------
// Market region
// ---------------------------------------------------------------------------

/// Wholesale market region. Unrecognized codes deserialize to `Other`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MarketRegion {
    Caiso,
    Ercot,
    Pjm,
    Nyiso,
    IsoNe,
    Miso,
    Spp,
    #[default]
    Other,
}

impl MarketRegion {
    pub const ALL: [MarketRegion; 8] = [
        MarketRegion::Caiso,
        MarketRegion::Ercot,
        MarketRegion::Pjm,
        MarketRegion::Nyiso,
        MarketRegion::IsoNe,
        MarketRegion::Miso,
        MarketRegion::Spp,
        MarketRegion::Other,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            MarketRegion::Caiso => "CAISO",
            MarketRegion::Ercot => "ERCOT",
            MarketRegion::Pjm => "PJM",
            MarketRegion::Nyiso => "NYISO",
            MarketRegion::IsoNe => "ISO-NE",
            MarketRegion::Miso => "MISO",
            MarketRegion::Spp => "SPP",
            MarketRegion::Other => "OTHER",
        }
    }

    /// Case-insensitive lookup; separators are ignored so "iso_ne" and
    /// "ISO-NE" both resolve.
    pub fn from_code(code: &str) -> Self {
        let normalized: String = code
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "CAISO" | "CALIFORNIA" => MarketRegion::Caiso,
            "ERCOT" | "TEXAS" => MarketRegion::Ercot,
            "PJM" => MarketRegion::Pjm,
            "NYISO" => MarketRegion::Nyiso,
            "ISONE" => MarketRegion::IsoNe,
            "MISO" => MarketRegion::Miso,
            "SPP" => MarketRegion::Spp,
            _ => MarketRegion::Other,
        }
    }
}

impl From<String> for MarketRegion {
    fn from(code: String) -> Self {
        MarketRegion::from_code(&code)
    }
}

impl From<MarketRegion> for String {
    fn from(region: MarketRegion) -> Self {
        region.code().to_string()
    }
}

impl fmt::Display for MarketRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Rate tables
// ---------------------------------------------------------------------------

/// Ancillary-service and capacity prices for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRates {
    /// Frequency regulation clearing price, $/MW-hour
    pub regulation_per_mw_hour: Money,
    /// Spinning reserve clearing price, $/MW-hour
    pub spinning_reserve_per_mw_hour: Money,
    /// Capacity market payment, $/MW-year
    pub capacity_per_mw_year: Money,
}

/// Resource adequacy contract terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAdequacyTerms {
    /// Contract price, $/MW-month
    pub price_per_mw_month: Money,
    /// Discharge duration needed for full qualifying capacity
    pub qualifying_duration_hours: Decimal,
    /// Regions where RA contracts are available
    pub qualifying_regions: Vec<MarketRegion>,
}

/// Read-only market price configuration, injected into the revenue projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRateTable {
    pub regions: BTreeMap<MarketRegion, RegionRates>,
    pub resource_adequacy: ResourceAdequacyTerms,
}

impl MarketRateTable {
    /// Rates for `region`, falling back to the `Other` row, then to zeros when
    /// a custom table omits both.
    pub fn rates_for(&self, region: MarketRegion) -> RegionRates {
        self.regions
            .get(&region)
            .or_else(|| self.regions.get(&MarketRegion::Other))
            .cloned()
            .unwrap_or(RegionRates {
                regulation_per_mw_hour: Decimal::ZERO,
                spinning_reserve_per_mw_hour: Decimal::ZERO,
                capacity_per_mw_year: Decimal::ZERO,
            })
    }

    pub fn qualifies_for_resource_adequacy(&self, region: MarketRegion) -> bool {
        self.resource_adequacy.qualifying_regions.contains(&region)
    }
}

impl Default for MarketRateTable {
    fn default() -> Self {
        let row = |regulation, spinning, capacity| RegionRates {
            regulation_per_mw_hour: regulation,
            spinning_reserve_per_mw_hour: spinning,
            capacity_per_mw_year: capacity,
        };

        let regions = BTreeMap::from([
            (MarketRegion::Caiso, row(dec!(15), dec!(7), dec!(0))),
            (MarketRegion::Ercot, row(dec!(12), dec!(10), dec!(0))),
            (MarketRegion::Pjm, row(dec!(20), dec!(5), dec!(50000))),
            (MarketRegion::Nyiso, row(dec!(14), dec!(6), dec!(60000))),
            (MarketRegion::IsoNe, row(dec!(16), dec!(5), dec!(45000))),
            (MarketRegion::Miso, row(dec!(10), dec!(4), dec!(25000))),
            (MarketRegion::Spp, row(dec!(8), dec!(4), dec!(15000))),
            (MarketRegion::Other, row(dec!(10), dec!(5), dec!(30000))),
        ]);

        MarketRateTable {
            regions,
            resource_adequacy: ResourceAdequacyTerms {
                price_per_mw_month: dec!(7000),
                qualifying_duration_hours: dec!(4),
                qualifying_regions: vec![MarketRegion::Caiso],
            },
        }
    }
}
