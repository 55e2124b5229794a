use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BessFinanceError;
use crate::types::{Money, Rate};
use crate::BessFinanceResult;

/// Newton-Raphson iteration cap, shared by the bisection fallback.
pub const MAX_IRR_ITERATIONS: u32 = 100;
/// Convergence tolerance on the rate step.
pub const IRR_TOLERANCE: Decimal = dec!(0.0001);

/// Largest |NPV| accepted at a root, relative to the summed |cash flows|.
const NPV_RESIDUAL_TOLERANCE: Decimal = dec!(0.001);
const DERIVATIVE_FLOOR: Decimal = dec!(0.000000000001);
const MIN_RATE: Decimal = dec!(-0.99);
const MAX_RATE: Decimal = dec!(100);

/// Candidate rates scanned for a sign change when Newton-Raphson degenerates.
const BRACKET_GRID: [Decimal; 13] = [
    dec!(-0.9),
    dec!(-0.5),
    dec!(-0.2),
    dec!(0),
    dec!(0.05),
    dec!(0.1),
    dec!(0.2),
    dec!(0.35),
    dec!(0.5),
    dec!(1),
    dec!(2),
    dec!(5),
    dec!(10),
];

/// Outcome of the IRR root search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IrrOutcome {
    /// A rate with NPV = 0 was found within tolerance.
    Converged { rate: Rate, iterations: u32 },
    /// No root found in the search domain; `last_rate` is the final iterate.
    NotConverged { last_rate: Rate, iterations: u32 },
}

impl IrrOutcome {
    /// The rate, only when the solver converged.
    pub fn rate(&self) -> Option<Rate> {
        match self {
            IrrOutcome::Converged { rate, .. } => Some(*rate),
            IrrOutcome::NotConverged { .. } => None,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, IrrOutcome::Converged { .. })
    }
}

/// Net Present Value of a series of cash flows, first flow at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> BessFinanceResult<Money> {
    if rate <= dec!(-1) {
        return Err(BessFinanceError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    npv_with_derivative(rate, cash_flows)
        .map(|(value, _)| value)
        .ok_or_else(|| BessFinanceError::degenerate(format!("NPV at rate {rate}")))
}

/// NPV and dNPV/dr using iterative discount factors with checked arithmetic.
/// Returns `None` when a discount factor underflows or any term overflows.
fn npv_with_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Money, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut value = Decimal::ZERO;
    let mut derivative = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        if discount.is_zero() {
            return None;
        }
        value = value.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let weighted = Decimal::from(t as i64).checked_mul(*cf)?;
            let term = weighted.checked_div(discount.checked_mul(one_plus_r)?)?;
            derivative = derivative.checked_sub(term)?;
        }
    }

    Some((value, derivative))
}

/// Internal Rate of Return.
///
/// Newton-Raphson from `guess`, converging when the rate step falls below
/// [`IRR_TOLERANCE`]. A near-zero derivative, an arithmetic overflow, or a
/// step leaving `[-0.99, 100]` hands over to a bracketing scan plus
/// bisection. A candidate is only reported as converged when NPV there is
/// near zero relative to the flows; otherwise the result is
/// [`IrrOutcome::NotConverged`] rather than an error.
pub fn irr(cash_flows: &[Money], guess: Rate) -> BessFinanceResult<IrrOutcome> {
    if cash_flows.len() < 2 {
        return Err(BessFinanceError::invalid(
            "cash_flows",
            "IRR requires at least 2 cash flows",
        ));
    }

    let fallback = |rate: Rate, iterations: u32| {
        bisect(cash_flows)
            .filter(|outcome| confirms_root(cash_flows, outcome))
            .unwrap_or(IrrOutcome::NotConverged {
                last_rate: rate,
                iterations,
            })
    };

    let mut rate = guess.clamp(MIN_RATE, MAX_RATE);

    for i in 0..MAX_IRR_ITERATIONS {
        let Some((value, derivative)) = npv_with_derivative(rate, cash_flows) else {
            return Ok(fallback(rate, i));
        };
        if derivative.abs() < DERIVATIVE_FLOOR {
            return Ok(fallback(rate, i));
        }
        let Some(step) = value.checked_div(derivative) else {
            return Ok(fallback(rate, i));
        };

        let next = rate - step;
        if next < MIN_RATE || next > MAX_RATE {
            return Ok(fallback(rate, i));
        }

        if (next - rate).abs() < IRR_TOLERANCE {
            let outcome = IrrOutcome::Converged {
                rate: next,
                iterations: i + 1,
            };
            if confirms_root(cash_flows, &outcome) {
                return Ok(outcome);
            }
            return Ok(fallback(next, i + 1));
        }
        rate = next;
    }

    log::warn!("IRR did not converge after {MAX_IRR_ITERATIONS} Newton iterations");
    Ok(fallback(rate, MAX_IRR_ITERATIONS))
}

/// |NPV(rate)| within [`NPV_RESIDUAL_TOLERANCE`] of the summed |cash flows|.
fn confirms_root(cash_flows: &[Money], outcome: &IrrOutcome) -> bool {
    let Some(rate) = outcome.rate() else {
        return false;
    };
    let scale: Money = cash_flows.iter().map(|cf| cf.abs()).sum();
    if scale.is_zero() {
        return false;
    }
    match npv_with_derivative(rate, cash_flows) {
        Some((value, _)) => value.abs() <= scale * NPV_RESIDUAL_TOLERANCE,
        None => false,
    }
}

/// Scan [`BRACKET_GRID`] for a sign change, then bisect to tolerance.
fn bisect(cash_flows: &[Money]) -> Option<IrrOutcome> {
    let evaluate = |r: Rate| npv_with_derivative(r, cash_flows).map(|(v, _)| v);

    let mut bracket = None;
    let mut previous: Option<(Rate, Money)> = None;
    for r in BRACKET_GRID {
        let Some(v) = evaluate(r) else {
            previous = None;
            continue;
        };
        if v.is_zero() {
            return Some(IrrOutcome::Converged {
                rate: r,
                iterations: 0,
            });
        }
        if let Some((lo, lo_v)) = previous {
            if lo_v.is_sign_negative() != v.is_sign_negative() {
                bracket = Some((lo, lo_v, r));
                break;
            }
        }
        previous = Some((r, v));
    }

    let (mut lo, mut lo_v, mut hi) = bracket?;
    for i in 0..MAX_IRR_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let mid_v = evaluate(mid)?;
        if (hi - lo) < IRR_TOLERANCE || mid_v.is_zero() {
            return Some(IrrOutcome::Converged {
                rate: mid,
                iterations: i + 1,
            });
        }
        if mid_v.is_sign_negative() == lo_v.is_sign_negative() {
            lo = mid;
            lo_v = mid_v;
        } else {
            hi = mid;
        }
    }

    None
}

/// Level payment per period for a fully amortizing loan (positive number).
/// A zero rate degrades to straight-line `principal / nper`.
pub fn level_payment(rate: Rate, nper: u32, principal: Money) -> BessFinanceResult<Money> {
    if nper == 0 {
        return Err(BessFinanceError::invalid(
            "nper",
            "Number of periods must be > 0",
        ));
    }

    if rate.is_zero() {
        return Ok(principal / Decimal::from(nper));
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..nper {
        factor = factor
            .checked_mul(one_plus_r)
            .ok_or_else(|| BessFinanceError::degenerate("PMT compounding factor"))?;
    }

    let annuity_factor = (factor - Decimal::ONE) / rate;
    if annuity_factor.is_zero() {
        return Err(BessFinanceError::degenerate("PMT annuity factor"));
    }

    Ok(principal * factor / annuity_factor)
}

/// `(1 + rate)^periods` by repeated multiplication.
pub fn growth_factor(rate: Rate, periods: u32) -> Decimal {
    let base = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor *= base;
    }
    factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(dec!(0.0), &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_one() {
        assert!(npv(dec!(-1), &[dec!(-1), dec!(2)]).is_err());
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let outcome = irr(&cfs, dec!(0.10)).unwrap();
        let rate = outcome.rate().expect("should converge");
        // ~9.7%
        assert!((rate - dec!(0.0970)).abs() < dec!(0.001));
        assert!(npv(rate, &cfs).unwrap().abs() < dec!(0.1));
    }

    #[test]
    fn test_irr_requires_two_flows() {
        assert!(irr(&[dec!(-100)], dec!(0.1)).is_err());
    }

    #[test]
    fn test_irr_without_sign_change_does_not_converge() {
        let cfs = vec![dec!(100), dec!(100), dec!(100)];
        let outcome = irr(&cfs, dec!(0.10)).unwrap();
        assert!(!outcome.is_converged());
        assert_eq!(outcome.rate(), None);
    }

    #[test]
    fn test_irr_root_below_rate_floor_is_not_converged() {
        // Root at -99.5%, below the -99% floor
        let cfs = vec![dec!(-100), dec!(0.5)];
        let outcome = irr(&cfs, dec!(0.10)).unwrap();
        assert!(!outcome.is_converged(), "{outcome:?}");
    }

    #[test]
    fn test_irr_root_above_rate_cap_is_not_converged() {
        // Root at 99,900%, above the 10,000% cap
        let cfs = vec![dec!(-1), dec!(1000)];
        let outcome = irr(&cfs, dec!(0.10)).unwrap();
        assert!(!outcome.is_converged(), "{outcome:?}");
    }

    #[test]
    fn test_irr_converged_rates_zero_npv() {
        for cfs in [
            vec![dec!(-1000), dec!(400), dec!(400), dec!(400)],
            vec![dec!(-100), dec!(110)],
            vec![dec!(-100), dec!(20)],
            vec![dec!(-500), dec!(100), dec!(100), dec!(100), dec!(100), dec!(100), dec!(100)],
        ] {
            let outcome = irr(&cfs, dec!(0.10)).unwrap();
            let rate = outcome.rate().expect("conventional flows have a root");
            let scale: Decimal = cfs.iter().map(|cf| cf.abs()).sum();
            assert!(
                npv(rate, &cfs).unwrap().abs() <= scale * dec!(0.001),
                "NPV at {rate} too large for {cfs:?}"
            );
        }
    }

    #[test]
    fn test_irr_flat_start_uses_bisection() {
        // A far-off guess leaves a vanishing derivative
        let cfs = vec![dec!(-100), dec!(0), dec!(0), dec!(0), dec!(0), dec!(0), dec!(0), dec!(0), dec!(0), dec!(0), dec!(300)];
        let outcome = irr(&cfs, dec!(99)).unwrap();
        let rate = outcome.rate().expect("bisection should recover a root");
        // 3^(1/10) - 1 ≈ 0.1161
        assert!((rate - dec!(0.1161)).abs() < dec!(0.001));
    }

    #[test]
    fn test_level_payment() {
        // 100,000 over 10 years at 5% ≈ 12,950.46
        let p = level_payment(dec!(0.05), 10, dec!(100000)).unwrap();
        assert!((p - dec!(12950.46)).abs() < dec!(0.01));
    }

    #[test]
    fn test_level_payment_zero_rate() {
        let p = level_payment(dec!(0), 4, dec!(1000)).unwrap();
        assert_eq!(p, dec!(250));
    }

    #[test]
    fn test_growth_factor() {
        assert_eq!(growth_factor(dec!(0.1), 2), dec!(1.21));
        assert_eq!(growth_factor(dec!(0.1), 0), Decimal::ONE);
    }
}
