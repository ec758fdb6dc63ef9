use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::DatabaseTransaction;
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    db::DatabaseAccess,
    entities::{
        advance_payment::Model as AdvanceModel, advance_payment_history::Model as HistoryModel,
        AdvanceStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::{AdvanceRepository, Repository},
    workflow::{self, AdvanceAllocation, AdvanceSummary, Clock, RepaymentRequest},
};

/// Committed result of one repayment
#[derive(Debug, Clone, Serialize)]
pub struct RepaymentOutcome {
    pub employee_id: Uuid,
    pub amount: Decimal,
    pub allocations: Vec<AdvanceAllocation>,
    pub history: Vec<HistoryModel>,
    pub summary: AdvanceSummary,
}

/// Reads an employee's advances and records repayments against them
#[derive(Clone)]
pub struct AdvanceService {
    db: DatabaseAccess,
    repo: AdvanceRepository,
    events: EventSender,
    clock: Arc<dyn Clock>,
}

impl AdvanceService {
    pub fn new(
        db: DatabaseAccess,
        repo: AdvanceRepository,
        events: EventSender,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            repo,
            events,
            clock,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, employee_id: Uuid) -> Result<Vec<AdvanceModel>, ServiceError> {
        self.repo
            .find_for_employee(self.repo.get_db(), employee_id)
            .await
    }

    #[instrument(skip(self))]
    pub async fn summary(&self, employee_id: Uuid) -> Result<AdvanceSummary, ServiceError> {
        let advances = self.list(employee_id).await?;
        Ok(workflow::summarize(&advances))
    }

    #[instrument(skip(self))]
    pub async fn history(
        &self,
        employee_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<HistoryModel>, u64), ServiceError> {
        self.repo
            .history_page(self.repo.get_db(), employee_id, page, per_page)
            .await
    }

    /// Spreads a repayment across the employee's open advances.
    ///
    /// Loading, allocation and every write share one transaction; each
    /// advance update is guarded on the state it was allocated from.
    #[instrument(skip(self, actor, notes), fields(actor_id = %actor.actor_id))]
    pub async fn repay(
        &self,
        employee_id: Uuid,
        amount: Decimal,
        advance_id: Option<Uuid>,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<RepaymentOutcome, ServiceError> {
        let request = RepaymentRequest {
            employee_id,
            amount,
            advance_id,
            notes: notes.filter(|n| !n.trim().is_empty()),
            recorded_by: Some(actor.actor_id.clone()),
        };

        let started = Instant::now();
        let txn = self.db.begin().await?;
        let outcome = match self.repay_in(&txn, &request).await {
            Ok(outcome) => {
                self.db.commit(txn, started).await?;
                outcome
            }
            Err(e) => {
                counter!("workforce.advances.repayment_rejected", 1);
                self.db.rollback(txn, &e).await;
                return Err(e);
            }
        };

        counter!("workforce.advances.repayments", 1);
        info!(
            %employee_id,
            %amount,
            advances = outcome.allocations.len(),
            remaining = %outcome.summary.remaining_balance,
            "Advance repayment recorded"
        );

        for allocation in &outcome.allocations {
            if allocation.status == AdvanceStatus::FullyRepaid {
                self.events
                    .send_or_log(Event::AdvanceFullyRepaid {
                        advance_id: allocation.advance_id,
                        employee_id,
                    })
                    .await;
            }
        }
        self.events
            .send_or_log(Event::AdvanceRepaymentRecorded {
                employee_id,
                amount,
                advances: outcome.allocations.iter().map(|a| a.advance_id).collect(),
                remaining_balance: outcome.summary.remaining_balance,
            })
            .await;

        Ok(outcome)
    }

    async fn repay_in(
        &self,
        txn: &DatabaseTransaction,
        request: &RepaymentRequest,
    ) -> Result<RepaymentOutcome, ServiceError> {
        let advances = self.repo.find_for_employee(txn, request.employee_id).await?;
        if advances.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No advances found for employee {}",
                request.employee_id
            )));
        }

        let now = self.clock.now();
        let plan = workflow::allocate_repayment(request, &advances, now)?;

        for allocation in &plan.allocations {
            self.repo.apply_allocation(txn, allocation, now).await?;
        }

        let mut history = Vec::with_capacity(plan.history.len());
        for entry in &plan.history {
            history.push(self.repo.append_history(txn, entry).await?);
        }

        let refreshed = self.repo.find_for_employee(txn, request.employee_id).await?;

        Ok(RepaymentOutcome {
            employee_id: request.employee_id,
            amount: plan.requested,
            allocations: plan.allocations,
            history,
            summary: workflow::summarize(&refreshed),
        })
    }
}
