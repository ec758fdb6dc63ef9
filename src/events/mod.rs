use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::TimesheetStatus;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    ///
    /// Used after a transaction commits: the write already happened, so a
    /// dropped notification must not turn the request into an error.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping workflow event");
        }
    }
}

/// Domain events emitted after a workflow change is committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimesheetSubmitted {
        timesheet_id: Uuid,
        employee_id: Uuid,
        submitted_at: DateTime<Utc>,
    },
    TimesheetApproved {
        timesheet_id: Uuid,
        employee_id: Uuid,
        from_status: TimesheetStatus,
        to_status: TimesheetStatus,
        approved_by: String,
        approved_at: NaiveDate,
    },
    TimesheetRejected {
        timesheet_id: Uuid,
        employee_id: Uuid,
        from_status: TimesheetStatus,
        rejected_by: String,
        reason: String,
    },
    AdvanceRepaymentRecorded {
        employee_id: Uuid,
        amount: Decimal,
        advances: Vec<Uuid>,
        remaining_balance: Decimal,
    },
    AdvanceFullyRepaid {
        advance_id: Uuid,
        employee_id: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::TimesheetSubmitted { .. } => "timesheet_submitted",
            Event::TimesheetApproved { .. } => "timesheet_approved",
            Event::TimesheetRejected { .. } => "timesheet_rejected",
            Event::AdvanceRepaymentRecorded { .. } => "advance_repayment_recorded",
            Event::AdvanceFullyRepaid { .. } => "advance_fully_repaid",
        }
    }
}

/// Builds a bounded event channel
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        metrics::counter!("workforce.events.processed", 1, "event" => event.name());

        match &event {
            Event::TimesheetApproved {
                timesheet_id,
                to_status,
                approved_by,
                ..
            } => {
                info!(%timesheet_id, status = %to_status, %approved_by, "Timesheet approved");
            }
            Event::TimesheetRejected {
                timesheet_id,
                from_status,
                reason,
                ..
            } => {
                warn!(%timesheet_id, stage = %from_status, %reason, "Timesheet rejected");
            }
            Event::AdvanceRepaymentRecorded {
                employee_id,
                amount,
                remaining_balance,
                ..
            } => {
                info!(%employee_id, %amount, %remaining_balance, "Advance repayment recorded");
            }
            _ => {
                info!(event = event.name(), "Workflow event");
            }
        }
    }

    warn!("Event processing loop has ended");
}
