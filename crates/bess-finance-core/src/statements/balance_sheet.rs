use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::debt::schedule::DebtScheduleYear;
use crate::statements::cash_flow::CashFlowYear;
use crate::types::Money;

/// Year-end balance sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetYear {
    pub year: i32,
    pub cash: Money,
    pub gross_fixed_assets: Money,
    pub accumulated_depreciation: Money,
    pub net_fixed_assets: Money,
    pub total_assets: Money,
    pub debt_balance: Money,
    pub total_liabilities: Money,
    pub contributed_equity: Money,
    pub retained_earnings: Money,
    pub total_equity: Money,
    pub total_liabilities_and_equity: Money,
    /// Difference between the cash plug and cash rolled forward from the
    /// cash flow statement; zero when the statements tie out
    pub balance_check: Money,
}

/// Opening position at financial close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalStructure {
    pub total_capex: Money,
    pub debt_amount: Money,
    pub equity_amount: Money,
    /// Total investment tax credit
    pub itc_amount: Money,
    /// Portion of the ITC received in cash at close
    pub itc_up_front: Money,
}

/// Roll the balance sheet forward from the close.
///
/// Retained earnings accumulate net income plus any tax credit realized in
/// cash; cash is the balancing item.
pub fn build_balance_sheets(
    capital: &CapitalStructure,
    cash_flows: &[CashFlowYear],
    schedule: &[DebtScheduleYear],
) -> Vec<BalanceSheetYear> {
    let mut accumulated_depreciation = Decimal::ZERO;
    let mut retained_earnings = capital.itc_up_front;

    cash_flows
        .iter()
        .enumerate()
        .map(|(i, cf)| {
            accumulated_depreciation += cf.depreciation;
            retained_earnings += cf.net_income + cf.tax_credit_proceeds;

            let gross_fixed_assets = capital.total_capex;
            let net_fixed_assets = gross_fixed_assets - accumulated_depreciation;
            let debt_balance = schedule.get(i).map_or(Decimal::ZERO, |d| d.ending_balance);

            let total_liabilities = debt_balance;
            let contributed_equity = capital.equity_amount;
            let total_equity = contributed_equity + retained_earnings;
            let total_liabilities_and_equity = total_liabilities + total_equity;

            let rolled_cash = capital.itc_up_front + cf.cumulative_cash;
            let cash = total_liabilities_and_equity - net_fixed_assets;
            let balance_check = cash - rolled_cash;

            BalanceSheetYear {
                year: cf.year,
                cash,
                gross_fixed_assets,
                accumulated_depreciation,
                net_fixed_assets,
                total_assets: cash + net_fixed_assets,
                debt_balance,
                total_liabilities,
                contributed_equity,
                retained_earnings,
                total_equity,
                total_liabilities_and_equity,
                balance_check,
            }
        })
        .collect()
}
