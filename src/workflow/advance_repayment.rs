//! Smallest-first repayment allocation across an employee's advances.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{WorkflowError, WorkflowResult};
use crate::entities::{advance_payment, AdvanceStatus};

/// Decimal places stored for money columns
pub const MONEY_SCALE: u32 = 2;

/// One repayment as requested by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct RepaymentRequest {
    pub employee_id: Uuid,
    pub amount: Decimal,
    /// Advance the repayment was made against; its deduction sets the minimum
    pub advance_id: Option<Uuid>,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
}

/// Share of the repayment applied to a single advance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvanceAllocation {
    pub advance_id: Uuid,
    pub expected_status: AdvanceStatus,
    pub expected_repaid: Decimal,
    pub applied: Decimal,
    pub repaid_amount: Decimal,
    pub status: AdvanceStatus,
    pub repayment_date: NaiveDate,
}

/// Audit row to append for an allocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub advance_payment_id: Uuid,
    pub employee_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepaymentPlan {
    pub employee_id: Uuid,
    pub requested: Decimal,
    pub outstanding_before: Decimal,
    pub allocations: Vec<AdvanceAllocation>,
    pub history: Vec<HistoryEntry>,
}

impl RepaymentPlan {
    pub fn total_applied(&self) -> Decimal {
        self.allocations.iter().map(|a| a.applied).sum()
    }

    pub fn outstanding_after(&self) -> Decimal {
        self.outstanding_before - self.total_applied()
    }
}

/// Eligible advances in the order repayments are applied to them:
/// original amount ascending, then creation time, then id.
pub fn allocation_order(
    employee_id: Uuid,
    advances: &[advance_payment::Model],
) -> Vec<&advance_payment::Model> {
    let mut eligible: Vec<_> = advances
        .iter()
        .filter(|a| {
            a.employee_id == employee_id
                && !a.is_deleted()
                && a.status.is_eligible_for_repayment()
                && a.remaining_balance() > Decimal::ZERO
        })
        .collect();
    eligible.sort_by(|a, b| {
        a.amount
            .cmp(&b.amount)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    eligible
}

/// Spreads `request.amount` over the employee's eligible advances.
///
/// Checks run in order and the first failure wins: a positive amount with at
/// most two decimal places, the targeted advance's monthly deduction, then the
/// outstanding total.
pub fn allocate_repayment(
    request: &RepaymentRequest,
    advances: &[advance_payment::Model],
    now: DateTime<Utc>,
) -> WorkflowResult<RepaymentPlan> {
    let requested = request.amount;
    if requested <= Decimal::ZERO || requested.normalize().scale() > MONEY_SCALE {
        return Err(WorkflowError::InvalidAmount(requested));
    }

    let ordered = allocation_order(request.employee_id, advances);
    let outstanding: Decimal = ordered.iter().map(|a| a.remaining_balance()).sum();

    let target = match request.advance_id {
        Some(id) => Some(
            ordered
                .iter()
                .copied()
                .find(|a| a.id == id)
                .ok_or(WorkflowError::AdvanceNotEligible(id))?,
        ),
        None => ordered.first().copied(),
    };

    if let Some(deduction) = target.and_then(|a| a.monthly_deduction) {
        // Settling everything is always allowed, even below one deduction.
        let minimum = deduction.min(outstanding);
        if deduction > Decimal::ZERO && requested < minimum {
            return Err(WorkflowError::BelowMinimumRepayment { requested, minimum });
        }
    }

    if requested > outstanding {
        return Err(WorkflowError::ExceedsOutstandingBalance {
            requested,
            outstanding,
        });
    }

    let today = now.date_naive();
    let mut pool = requested;
    let mut allocations = Vec::new();
    let mut history = Vec::new();

    for advance in ordered {
        if pool.is_zero() {
            break;
        }
        let applied = pool.min(advance.remaining_balance());
        pool -= applied;

        let repaid_amount = advance.repaid_amount + applied;
        let status = if repaid_amount >= advance.amount {
            AdvanceStatus::FullyRepaid
        } else {
            AdvanceStatus::PartiallyRepaid
        };

        allocations.push(AdvanceAllocation {
            advance_id: advance.id,
            expected_status: advance.status,
            expected_repaid: advance.repaid_amount,
            applied,
            repaid_amount,
            status,
            repayment_date: today,
        });
        history.push(HistoryEntry {
            advance_payment_id: advance.id,
            employee_id: request.employee_id,
            amount: applied,
            payment_date: today,
            notes: request.notes.clone(),
            recorded_by: request.recorded_by.clone(),
            created_at: now,
        });
    }

    Ok(RepaymentPlan {
        employee_id: request.employee_id,
        requested,
        outstanding_before: outstanding,
        allocations,
        history,
    })
}
