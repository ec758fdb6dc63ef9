//! Per-employee totals of advanced, repaid and outstanding amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::advance_payment;

/// Running totals over an employee's advances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdvanceSummary {
    pub total_advanced: Decimal,
    pub total_repaid: Decimal,
    pub remaining_balance: Decimal,
}

/// Totals every non-deleted advance regardless of status.
pub fn summarize<'a, I>(advances: I) -> AdvanceSummary
where
    I: IntoIterator<Item = &'a advance_payment::Model>,
{
    let (total_advanced, total_repaid) = advances
        .into_iter()
        .filter(|a| !a.is_deleted())
        .fold((Decimal::ZERO, Decimal::ZERO), |(adv, rep), a| {
            (adv + a.amount, rep + a.repaid_amount)
        });

    AdvanceSummary {
        total_advanced,
        total_repaid,
        remaining_balance: total_advanced - total_repaid,
    }
}
