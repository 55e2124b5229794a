use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::debt::schedule::DebtScheduleYear;
use crate::statements::income::IncomeStatement;
use crate::types::Money;

/// Cash flow statement for a single operating year (indirect method).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowYear {
    pub year: i32,
    pub net_income: Money,
    pub depreciation: Money,
    pub operating_cash_flow: Money,
    /// Investment tax credit realized as cash this year
    pub tax_credit_proceeds: Money,
    pub financing_cash_flow: Money,
    pub net_cash_flow: Money,
    pub cumulative_cash: Money,
    pub free_cash_flow_to_equity: Money,
    pub free_cash_flow_to_firm: Money,
}

/// Derive cash flows from the final income statements and debt schedule.
///
/// `tax_credit_proceeds` is the ITC booked in year 1; pass zero when the
/// credit is realized up front at financial close.
pub fn build_cash_flows(
    income: &[IncomeStatement],
    schedule: &[DebtScheduleYear],
    tax_credit_proceeds: Money,
) -> Vec<CashFlowYear> {
    let mut cumulative_cash = Decimal::ZERO;

    income
        .iter()
        .enumerate()
        .map(|(i, is)| {
            let principal = schedule.get(i).map_or(Decimal::ZERO, |d| d.principal);
            let credit = if i == 0 {
                tax_credit_proceeds
            } else {
                Decimal::ZERO
            };

            let operating_cash_flow = is.net_income + is.depreciation;
            let financing_cash_flow = -principal;
            let net_cash_flow = operating_cash_flow + credit + financing_cash_flow;
            cumulative_cash += net_cash_flow;

            CashFlowYear {
                year: is.year,
                net_income: is.net_income,
                depreciation: is.depreciation,
                operating_cash_flow,
                tax_credit_proceeds: credit,
                financing_cash_flow,
                net_cash_flow,
                cumulative_cash,
                free_cash_flow_to_equity: is.net_income + is.depreciation - principal + credit,
                free_cash_flow_to_firm: is.ebitda - is.taxes + credit,
            }
        })
        .collect()
}
