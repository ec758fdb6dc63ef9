use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::DatabaseTransaction;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{Actor, PermissionChecker},
    db::DatabaseAccess,
    entities::timesheet::Model as TimesheetModel,
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::{Repository, TimesheetRepository},
    workflow::{self, ApprovalStage, Clock, TimesheetTransition, TransitionKind},
};

/// What a bulk request does to every listed timesheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemError {
    pub timesheet_id: Uuid,
    pub error: String,
}

/// Per-item outcome counts of a bulk request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkApprovalResult {
    pub approved: usize,
    pub rejected: usize,
    pub errors: Vec<BulkItemError>,
}

/// Drives timesheets through submit, approve and reject.
///
/// Each call loads the row inside a transaction, asks the stage machine for
/// the transition and writes it back with a status guard.
#[derive(Clone)]
pub struct TimesheetService {
    db: DatabaseAccess,
    repo: TimesheetRepository,
    events: EventSender,
    clock: Arc<dyn Clock>,
    permissions: Arc<dyn PermissionChecker>,
}

impl TimesheetService {
    pub fn new(
        db: DatabaseAccess,
        repo: TimesheetRepository,
        events: EventSender,
        clock: Arc<dyn Clock>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        Self {
            db,
            repo,
            events,
            clock,
            permissions,
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<TimesheetModel, ServiceError> {
        self.repo
            .find_by_id(self.repo.get_db(), id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.actor_id))]
    pub async fn submit(&self, id: Uuid, actor: &Actor) -> Result<TimesheetModel, ServiceError> {
        let transition = self
            .run_transition(id, |current, now| Ok(workflow::submit(current, now)?))
            .await?;

        self.record(&transition, actor).await;
        Ok(transition.timesheet)
    }

    /// Approves the next stage after checking the actor may sign it off.
    ///
    /// The permission check runs against the status loaded inside the
    /// transaction, so a concurrent approval cannot shift the stage under it.
    #[instrument(skip(self, actor, notes), fields(actor_id = %actor.actor_id))]
    pub async fn approve(
        &self,
        id: Uuid,
        actor: &Actor,
        requested: Option<ApprovalStage>,
        notes: Option<String>,
    ) -> Result<TimesheetModel, ServiceError> {
        let transition = self
            .run_transition(id, |current, now| {
                self.authorize(actor, current)?;
                let mut transition =
                    workflow::approve_next(current, &actor.actor_id, requested, now)?;
                if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
                    transition.timesheet.notes = Some(notes);
                }
                Ok(transition)
            })
            .await?;

        self.record(&transition, actor).await;
        Ok(transition.timesheet)
    }

    #[instrument(skip(self, actor, reason), fields(actor_id = %actor.actor_id))]
    pub async fn reject(
        &self,
        id: Uuid,
        actor: &Actor,
        reason: &str,
    ) -> Result<TimesheetModel, ServiceError> {
        let transition = self
            .run_transition(id, |current, now| {
                self.authorize(actor, current)?;
                Ok(workflow::reject(current, &actor.actor_id, reason, now)?)
            })
            .await?;

        self.record(&transition, actor).await;
        Ok(transition.timesheet)
    }

    /// Applies one action to many timesheets, each in its own transaction.
    ///
    /// Failures are collected per id and never abort the rest of the batch.
    #[instrument(skip(self, ids, actor, notes), fields(count = ids.len(), actor_id = %actor.actor_id))]
    pub async fn bulk(
        &self,
        ids: &[Uuid],
        action: BulkAction,
        actor: &Actor,
        notes: Option<String>,
    ) -> Result<BulkApprovalResult, ServiceError> {
        if ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "timesheet_ids must not be empty".to_string(),
            ));
        }
        let reason = notes.as_deref().map(str::trim).unwrap_or_default();
        if action == BulkAction::Reject && reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "a rejection reason is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut result = BulkApprovalResult::default();

        for &id in ids.iter().filter(|id| seen.insert(**id)) {
            let outcome = match action {
                BulkAction::Approve => self.approve(id, actor, None, notes.clone()).await,
                BulkAction::Reject => self.reject(id, actor, reason).await,
            };
            match outcome {
                Ok(_) if action == BulkAction::Approve => result.approved += 1,
                Ok(_) => result.rejected += 1,
                Err(e) => {
                    warn!(timesheet_id = %id, error = %e, "Bulk timesheet action failed");
                    result.errors.push(BulkItemError {
                        timesheet_id: id,
                        error: e.response_message(),
                    });
                }
            }
        }

        info!(
            approved = result.approved,
            rejected = result.rejected,
            failed = result.errors.len(),
            "Bulk timesheet action finished"
        );
        Ok(result)
    }

    fn authorize(&self, actor: &Actor, current: &TimesheetModel) -> Result<(), ServiceError> {
        match workflow::next_stage(current.status) {
            Some(stage) if !self.permissions.can_approve(actor, stage) => {
                counter!("workforce.timesheets.forbidden", 1, "stage" => stage.to_string());
                Err(ServiceError::Forbidden(format!(
                    "actor {} may not act at the {} stage",
                    actor.actor_id, stage
                )))
            }
            _ => Ok(()),
        }
    }

    async fn run_transition<F>(
        &self,
        id: Uuid,
        decide: F,
    ) -> Result<TimesheetTransition, ServiceError>
    where
        F: FnOnce(&TimesheetModel, DateTime<Utc>) -> Result<TimesheetTransition, ServiceError>
            + Send,
    {
        let started = Instant::now();
        let txn = self.db.begin().await?;
        match self.transition_in(&txn, id, decide).await {
            Ok(transition) => {
                self.db.commit(txn, started).await?;
                Ok(transition)
            }
            Err(e) => {
                self.db.rollback(txn, &e).await;
                Err(e)
            }
        }
    }

    async fn transition_in<F>(
        &self,
        txn: &DatabaseTransaction,
        id: Uuid,
        decide: F,
    ) -> Result<TimesheetTransition, ServiceError>
    where
        F: FnOnce(&TimesheetModel, DateTime<Utc>) -> Result<TimesheetTransition, ServiceError>
            + Send,
    {
        let current = self
            .repo
            .find_by_id(txn, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        let transition = decide(&current, self.clock.now())?;
        self.repo.apply_transition(txn, &transition).await?;
        Ok(transition)
    }

    async fn record(&self, transition: &TimesheetTransition, actor: &Actor) {
        let ts = &transition.timesheet;
        let event = match transition.kind {
            TransitionKind::Submitted => {
                counter!("workforce.timesheets.submitted", 1);
                Event::TimesheetSubmitted {
                    timesheet_id: ts.id,
                    employee_id: ts.employee_id,
                    submitted_at: ts.submitted_at.unwrap_or(ts.updated_at),
                }
            }
            TransitionKind::Approved(stage) => {
                counter!("workforce.timesheets.approved", 1, "stage" => stage.to_string());
                Event::TimesheetApproved {
                    timesheet_id: ts.id,
                    employee_id: ts.employee_id,
                    from_status: transition.expected_status,
                    to_status: ts.status,
                    approved_by: actor.actor_id.clone(),
                    approved_at: ts.approved_at.unwrap_or_else(|| ts.updated_at.date_naive()),
                }
            }
            TransitionKind::Rejected => {
                counter!("workforce.timesheets.rejected", 1);
                Event::TimesheetRejected {
                    timesheet_id: ts.id,
                    employee_id: ts.employee_id,
                    from_status: transition.expected_status,
                    rejected_by: actor.actor_id.clone(),
                    reason: ts.rejection_reason.clone().unwrap_or_default(),
                }
            }
        };

        info!(
            timesheet_id = %ts.id,
            from = %transition.expected_status,
            to = %ts.status,
            "Timesheet transition committed"
        );
        self.events.send_or_log(event).await;
    }
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Timesheet {} not found", id))
}
