use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::assumptions::input::DepreciationMethod;
use crate::types::{Money, Rate};

/// MACRS 5-year half-year convention percentages.
pub const MACRS_5_YEAR: [Rate; 6] = [
    dec!(0.20),
    dec!(0.32),
    dec!(0.192),
    dec!(0.1152),
    dec!(0.1152),
    dec!(0.0576),
];

/// MACRS 7-year half-year convention percentages.
pub const MACRS_7_YEAR: [Rate; 8] = [
    dec!(0.1429),
    dec!(0.2449),
    dec!(0.1749),
    dec!(0.1249),
    dec!(0.0893),
    dec!(0.0892),
    dec!(0.0893),
    dec!(0.0446),
];

impl DepreciationMethod {
    pub fn schedule(&self) -> &'static [Rate] {
        match self {
            DepreciationMethod::Macrs5 => &MACRS_5_YEAR,
            DepreciationMethod::Macrs7 => &MACRS_7_YEAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationYear {
    pub year: i32,
    pub beginning_basis: Money,
    pub depreciation: Money,
    pub accumulated: Money,
    pub ending_basis: Money,
}

/// Depreciable basis after the ITC haircut: `capex × (1 − itc/2)`.
pub fn depreciable_basis(capex: Money, itc_rate: Rate) -> Money {
    capex * (Decimal::ONE - itc_rate / dec!(2))
}

/// Tax depreciation over `years` operating years.
///
/// The final table year takes whatever basis is left so the schedule sums to
/// the basis exactly. Years past the table, or past a short project life,
/// depreciate nothing.
pub fn depreciation_schedule(
    basis: Money,
    method: DepreciationMethod,
    years: u32,
) -> Vec<DepreciationYear> {
    let table = method.schedule();
    let mut remaining = basis;
    let mut accumulated = Decimal::ZERO;
    let mut out = Vec::with_capacity(years as usize);

    for yr in 1..=years {
        let idx = (yr - 1) as usize;
        let depreciation = match table.get(idx) {
            Some(_) if idx == table.len() - 1 => remaining,
            Some(pct) => (basis * *pct).min(remaining),
            None => Decimal::ZERO,
        };
        let beginning_basis = remaining;
        remaining = (remaining - depreciation).max(Decimal::ZERO);
        accumulated += depreciation;

        out.push(DepreciationYear {
            year: yr as i32,
            beginning_basis,
            depreciation,
            accumulated,
            ending_basis: remaining,
        });
    }

    out
}
