//! Timesheet stage machine.
//!
//! Approval walks `foreman -> incharge -> checking -> manager`, one stage per
//! call. Submit and reject are the only other ways a status can change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use super::{WorkflowError, WorkflowResult};
use crate::entities::{timesheet, TimesheetStatus};

/// Named approval stage in the chain
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalStage {
    Foreman,
    Incharge,
    Checking,
    Manager,
}

impl ApprovalStage {
    /// Status a timesheet lands in once this stage signs off
    pub fn resulting_status(self) -> TimesheetStatus {
        match self {
            ApprovalStage::Foreman => TimesheetStatus::ForemanApproved,
            ApprovalStage::Incharge => TimesheetStatus::InchargeApproved,
            ApprovalStage::Checking => TimesheetStatus::CheckingApproved,
            ApprovalStage::Manager => TimesheetStatus::ManagerApproved,
        }
    }
}

/// Resolves the stage that approves a timesheet in `status`, if any.
pub fn next_stage(status: TimesheetStatus) -> Option<ApprovalStage> {
    match status {
        TimesheetStatus::Draft | TimesheetStatus::Pending | TimesheetStatus::Submitted => {
            Some(ApprovalStage::Foreman)
        }
        TimesheetStatus::ForemanApproved => Some(ApprovalStage::Incharge),
        TimesheetStatus::InchargeApproved => Some(ApprovalStage::Checking),
        TimesheetStatus::CheckingApproved => Some(ApprovalStage::Manager),
        TimesheetStatus::ManagerApproved | TimesheetStatus::Rejected => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransitionKind {
    Submitted,
    Approved(ApprovalStage),
    Rejected,
}

/// Mutation produced by the stage machine.
///
/// `expected_status` is the status the record must still hold when the
/// update is written; `timesheet` is the full post-transition snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TimesheetTransition {
    pub timesheet_id: Uuid,
    pub expected_status: TimesheetStatus,
    pub kind: TransitionKind,
    pub timesheet: timesheet::Model,
}

impl TimesheetTransition {
    pub fn new_status(&self) -> TimesheetStatus {
        self.timesheet.status
    }
}

/// Advances `current` by exactly one approval stage.
///
/// When `requested` is given it must equal the resolved stage, so a caller
/// acting on a stale view cannot approve the wrong stage.
pub fn approve_next(
    current: &timesheet::Model,
    actor_id: &str,
    requested: Option<ApprovalStage>,
    now: DateTime<Utc>,
) -> WorkflowResult<TimesheetTransition> {
    let stage = next_stage(current.status).ok_or(WorkflowError::InvalidTransition {
        from: current.status,
        action: "approve",
    })?;

    if let Some(requested) = requested {
        if requested != stage {
            return Err(WorkflowError::StageMismatch {
                requested,
                expected: stage,
            });
        }
    }

    let mut next = current.clone();
    next.status = stage.resulting_status();
    next.approved_by = Some(actor_id.to_string());
    next.approved_at = Some(now.date_naive());
    next.updated_at = now;

    Ok(TimesheetTransition {
        timesheet_id: current.id,
        expected_status: current.status,
        kind: TransitionKind::Approved(stage),
        timesheet: next,
    })
}

/// Submits a draft, or resubmits a rejected timesheet.
pub fn submit(current: &timesheet::Model, now: DateTime<Utc>) -> WorkflowResult<TimesheetTransition> {
    if !matches!(
        current.status,
        TimesheetStatus::Draft | TimesheetStatus::Rejected
    ) {
        return Err(WorkflowError::InvalidTransition {
            from: current.status,
            action: "submit",
        });
    }

    let mut next = current.clone();
    next.status = TimesheetStatus::Submitted;
    next.submitted_at = Some(now);
    next.rejected_by = None;
    next.rejected_at = None;
    next.rejection_reason = None;
    next.rejection_stage = None;
    next.updated_at = now;

    Ok(TimesheetTransition {
        timesheet_id: current.id,
        expected_status: current.status,
        kind: TransitionKind::Submitted,
        timesheet: next,
    })
}

/// Rejects a timesheet that is still somewhere in the approval chain.
pub fn reject(
    current: &timesheet::Model,
    actor_id: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> WorkflowResult<TimesheetTransition> {
    let rejectable = matches!(
        current.status,
        TimesheetStatus::Pending
            | TimesheetStatus::Submitted
            | TimesheetStatus::ForemanApproved
            | TimesheetStatus::InchargeApproved
            | TimesheetStatus::CheckingApproved
    );
    if !rejectable {
        return Err(WorkflowError::InvalidTransition {
            from: current.status,
            action: "reject",
        });
    }

    let reason = reason.trim();
    if reason.is_empty() {
        return Err(WorkflowError::MissingRejectionReason);
    }

    let mut next = current.clone();
    next.status = TimesheetStatus::Rejected;
    next.rejected_by = Some(actor_id.to_string());
    next.rejected_at = Some(now.date_naive());
    next.rejection_reason = Some(reason.to_string());
    next.rejection_stage = Some(current.status.to_string());
    next.updated_at = now;

    Ok(TimesheetTransition {
        timesheet_id: current.id,
        expected_status: current.status,
        kind: TransitionKind::Rejected,
        timesheet: next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeZone};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 14, 5, 0).unwrap()
    }

    fn sheet(status: TimesheetStatus) -> timesheet::Model {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        timesheet::Model {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            hours_worked: dec!(8),
            overtime_hours: dec!(1.5),
            status,
            approved_by: None,
            approved_at: None,
            submitted_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            rejection_stage: None,
            notes: None,
            created_at: created,
            updated_at: created,
            deleted_at: None,
        }
    }

    #[rstest]
    #[case(TimesheetStatus::Draft, TimesheetStatus::ForemanApproved)]
    #[case(TimesheetStatus::Pending, TimesheetStatus::ForemanApproved)]
    #[case(TimesheetStatus::Submitted, TimesheetStatus::ForemanApproved)]
    #[case(TimesheetStatus::ForemanApproved, TimesheetStatus::InchargeApproved)]
    #[case(TimesheetStatus::InchargeApproved, TimesheetStatus::CheckingApproved)]
    #[case(TimesheetStatus::CheckingApproved, TimesheetStatus::ManagerApproved)]
    fn approve_advances_one_stage(#[case] from: TimesheetStatus, #[case] to: TimesheetStatus) {
        let current = sheet(from);
        let transition = approve_next(&current, "emp-7", None, now()).unwrap();

        assert_eq!(transition.expected_status, from);
        assert_eq!(transition.new_status(), to);
        assert_eq!(transition.timesheet.approved_by.as_deref(), Some("emp-7"));
        assert_eq!(transition.timesheet.approved_at, Some(now().date_naive()));
    }

    #[rstest]
    #[case(TimesheetStatus::ManagerApproved)]
    #[case(TimesheetStatus::Rejected)]
    fn approve_from_end_states_fails(#[case] from: TimesheetStatus) {
        let current = sheet(from);
        assert_matches!(
            approve_next(&current, "emp-7", None, now()),
            Err(WorkflowError::InvalidTransition { from: f, .. }) if f == from
        );
    }

    #[test]
    fn submitted_sheet_is_foreman_approved_on_call_date() {
        let current = sheet(TimesheetStatus::Submitted);
        let transition = approve_next(&current, "foreman-1", None, now()).unwrap();

        assert_eq!(transition.kind, TransitionKind::Approved(ApprovalStage::Foreman));
        assert_eq!(
            transition.timesheet.approved_at,
            NaiveDate::from_ymd_opt(2024, 5, 20)
        );
        assert_eq!(transition.timesheet.hours_worked, current.hours_worked);
    }

    #[test]
    fn repeated_approval_walks_the_whole_chain() {
        let mut current = sheet(TimesheetStatus::Pending);
        let mut seen = Vec::new();
        while let Ok(transition) = approve_next(&current, "mgr", None, now()) {
            seen.push(transition.new_status());
            current = transition.timesheet;
        }
        assert_eq!(
            seen,
            vec![
                TimesheetStatus::ForemanApproved,
                TimesheetStatus::InchargeApproved,
                TimesheetStatus::CheckingApproved,
                TimesheetStatus::ManagerApproved,
            ]
        );
    }

    #[test]
    fn stage_mismatch_is_rejected() {
        let current = sheet(TimesheetStatus::ForemanApproved);
        assert_matches!(
            approve_next(&current, "emp", Some(ApprovalStage::Manager), now()),
            Err(WorkflowError::StageMismatch {
                requested: ApprovalStage::Manager,
                expected: ApprovalStage::Incharge,
            })
        );
        assert!(approve_next(&current, "emp", Some(ApprovalStage::Incharge), now()).is_ok());
    }

    #[test]
    fn submit_clears_previous_rejection() {
        let mut current = sheet(TimesheetStatus::Rejected);
        current.rejection_reason = Some("missing hours".into());
        current.rejected_by = Some("checker".into());
        current.rejection_stage = Some("incharge_approved".into());

        let transition = submit(&current, now()).unwrap();
        assert_eq!(transition.new_status(), TimesheetStatus::Submitted);
        assert_eq!(transition.timesheet.submitted_at, Some(now()));
        assert!(transition.timesheet.rejection_reason.is_none());
        assert!(transition.timesheet.rejected_by.is_none());
        assert!(transition.timesheet.rejection_stage.is_none());
    }

    #[rstest]
    #[case(TimesheetStatus::Pending)]
    #[case(TimesheetStatus::ForemanApproved)]
    #[case(TimesheetStatus::ManagerApproved)]
    fn submit_only_from_draft_or_rejected(#[case] from: TimesheetStatus) {
        assert_matches!(
            submit(&sheet(from), now()),
            Err(WorkflowError::InvalidTransition { action: "submit", .. })
        );
    }

    #[test]
    fn reject_records_stage_and_reason() {
        let current = sheet(TimesheetStatus::InchargeApproved);
        let transition = reject(&current, "checker-2", "  overtime not justified ", now()).unwrap();

        assert_eq!(transition.new_status(), TimesheetStatus::Rejected);
        assert_eq!(
            transition.timesheet.rejection_reason.as_deref(),
            Some("overtime not justified")
        );
        assert_eq!(
            transition.timesheet.rejection_stage.as_deref(),
            Some("incharge_approved")
        );
        assert_eq!(transition.timesheet.rejected_by.as_deref(), Some("checker-2"));
    }

    #[test]
    fn reject_requires_reason() {
        let current = sheet(TimesheetStatus::Submitted);
        assert_matches!(
            reject(&current, "x", "   ", now()),
            Err(WorkflowError::MissingRejectionReason)
        );
    }

    #[rstest]
    #[case(TimesheetStatus::Draft)]
    #[case(TimesheetStatus::ManagerApproved)]
    #[case(TimesheetStatus::Rejected)]
    fn reject_outside_chain_fails(#[case] from: TimesheetStatus) {
        assert_matches!(
            reject(&sheet(from), "x", "bad", now()),
            Err(WorkflowError::InvalidTransition { action: "reject", .. })
        );
    }
}
