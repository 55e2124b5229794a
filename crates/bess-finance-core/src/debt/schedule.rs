use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::time_value::level_payment;
use crate::types::{Money, Multiple, Rate};
use crate::BessFinanceResult;

const MONTHS_PER_YEAR: u32 = 12;

/// One year of the senior debt amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtScheduleYear {
    pub year: i32,
    pub beginning_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub debt_service: Money,
    pub ending_balance: Money,
    /// CADS ÷ debt service; `None` once the loan is retired
    pub dscr: Option<Multiple>,
}

/// Level-payment amortization computed monthly and rolled up to years.
///
/// `cads` supplies cash available for debt service per operating year for
/// the coverage ratio. The last month of the term repays whatever balance is
/// left so the loan closes at exactly zero.
pub fn build_debt_schedule(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    life_years: u32,
    cads: &[Money],
) -> BessFinanceResult<Vec<DebtScheduleYear>> {
    let mut schedule = Vec::with_capacity(life_years as usize);

    if principal <= Decimal::ZERO || term_years == 0 {
        for yr in 1..=life_years {
            schedule.push(retired_year(yr));
        }
        return Ok(schedule);
    }

    let monthly_rate = annual_rate / dec!(12);
    let months = term_years * MONTHS_PER_YEAR;
    let payment = level_payment(monthly_rate, months, principal)?;

    let mut balance = principal;
    for yr in 1..=life_years {
        if yr > term_years {
            schedule.push(retired_year(yr));
            continue;
        }

        let beginning_balance = balance;
        let mut interest = Decimal::ZERO;
        let mut repaid = Decimal::ZERO;

        for month in 1..=MONTHS_PER_YEAR {
            let month_interest = balance * monthly_rate;
            let final_month = yr == term_years && month == MONTHS_PER_YEAR;
            let month_principal = if final_month {
                balance
            } else {
                (payment - month_interest).min(balance)
            };
            balance -= month_principal;
            interest += month_interest;
            repaid += month_principal;
        }

        let debt_service = interest + repaid;
        let cash_available = cads.get((yr - 1) as usize).copied().unwrap_or(Decimal::ZERO);
        schedule.push(DebtScheduleYear {
            year: yr as i32,
            beginning_balance,
            interest,
            principal: repaid,
            debt_service,
            ending_balance: balance,
            dscr: coverage(cash_available, debt_service),
        });
    }

    Ok(schedule)
}

fn coverage(cash_available: Money, debt_service: Money) -> Option<Multiple> {
    if debt_service > Decimal::ZERO {
        cash_available.checked_div(debt_service)
    } else {
        None
    }
}

fn retired_year(yr: u32) -> DebtScheduleYear {
    DebtScheduleYear {
        year: yr as i32,
        beginning_balance: Decimal::ZERO,
        interest: Decimal::ZERO,
        principal: Decimal::ZERO,
        debt_service: Decimal::ZERO,
        ending_balance: Decimal::ZERO,
        dscr: None,
    }
}

/// Average and minimum DSCR across years where a ratio exists.
pub fn dscr_statistics(schedule: &[DebtScheduleYear]) -> (Option<Multiple>, Option<Multiple>) {
    let ratios: Vec<Multiple> = schedule.iter().filter_map(|y| y.dscr).collect();
    if ratios.is_empty() {
        return (None, None);
    }
    let sum: Decimal = ratios.iter().sum();
    let average = sum / Decimal::from(ratios.len() as i64);
    let minimum = ratios.iter().copied().min();
    (Some(average), minimum)
}
