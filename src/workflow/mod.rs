//! Pure workflow engines for timesheet approval and advance repayment.
//!
//! Nothing in here touches the database. Each engine takes immutable
//! snapshots plus the current time and hands back an explicit mutation set
//! that the service layer persists inside a transaction.

pub mod advance_ledger;
pub mod advance_repayment;
pub mod timesheet_approval;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::TimesheetStatus;

pub use advance_ledger::{summarize, AdvanceSummary};
pub use advance_repayment::{
    allocate_repayment, AdvanceAllocation, HistoryEntry, RepaymentPlan, RepaymentRequest,
};
pub use timesheet_approval::{
    approve_next, next_stage, reject, submit, ApprovalStage, TimesheetTransition, TransitionKind,
};

/// Rule violations raised by the workflow engines
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("timesheet cannot {action} from status '{from}'")]
    InvalidTransition {
        from: TimesheetStatus,
        action: &'static str,
    },

    #[error("requested stage '{requested}' does not match next stage '{expected}'")]
    StageMismatch {
        requested: ApprovalStage,
        expected: ApprovalStage,
    },

    #[error("repayment amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    #[error("repayment of {requested} is below the minimum of {minimum}")]
    BelowMinimumRepayment { requested: Decimal, minimum: Decimal },

    #[error("repayment of {requested} exceeds outstanding balance of {outstanding}")]
    ExceedsOutstandingBalance {
        requested: Decimal,
        outstanding: Decimal,
    },

    #[error("a rejection reason is required")]
    MissingRejectionReason,

    #[error("advance {0} is not eligible for repayment")]
    AdvanceNotEligible(Uuid),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Source of the current time for workflow decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for tests and replays
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_returns_pinned_instant() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
        assert_eq!(FixedClock(at).now(), at);
    }

    #[test]
    fn invalid_transition_names_current_status() {
        let err = WorkflowError::InvalidTransition {
            from: TimesheetStatus::ManagerApproved,
            action: "approve",
        };
        assert_eq!(
            err.to_string(),
            "timesheet cannot approve from status 'manager_approved'"
        );
    }
}
