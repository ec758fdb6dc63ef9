use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::timesheet::{
    ActiveModel as TimesheetActiveModel, Column, Entity as Timesheet, Model as TimesheetModel,
};
use crate::errors::ServiceError;
use crate::repositories::Repository;
use crate::workflow::TimesheetTransition;

use super::BaseRepository;

/// Loads and conditionally writes timesheets.
///
/// Every method takes the connection to run on so callers can pass either
/// the pool or an open transaction.
#[derive(Debug, Clone)]
pub struct TimesheetRepository {
    base: BaseRepository,
}

impl TimesheetRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a live (not soft-deleted) timesheet by ID
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
    ) -> Result<Option<TimesheetModel>, ServiceError> {
        Ok(Timesheet::find_by_id(id)
            .filter(Column::DeletedAt.is_null())
            .one(conn)
            .await?)
    }

    /// Insert a new timesheet row
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        timesheet: TimesheetModel,
    ) -> Result<TimesheetModel, ServiceError> {
        let active: TimesheetActiveModel = timesheet.into();
        Ok(active.reset_all().insert(conn).await?)
    }

    /// Writes a transition only if the row still holds the expected status.
    pub async fn apply_transition<C: ConnectionTrait>(
        &self,
        conn: &C,
        transition: &TimesheetTransition,
    ) -> Result<TimesheetModel, ServiceError> {
        let next = &transition.timesheet;
        let changes = TimesheetActiveModel {
            status: Set(next.status),
            approved_by: Set(next.approved_by.clone()),
            approved_at: Set(next.approved_at),
            submitted_at: Set(next.submitted_at),
            rejected_by: Set(next.rejected_by.clone()),
            rejected_at: Set(next.rejected_at),
            rejection_reason: Set(next.rejection_reason.clone()),
            rejection_stage: Set(next.rejection_stage.clone()),
            notes: Set(next.notes.clone()),
            updated_at: Set(next.updated_at),
            ..Default::default()
        };

        let result = Timesheet::update_many()
            .set(changes)
            .filter(Column::Id.eq(transition.timesheet_id))
            .filter(Column::Status.eq(transition.expected_status))
            .filter(Column::DeletedAt.is_null())
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(transition.timesheet_id));
        }

        Ok(next.clone())
    }
}

impl Repository for TimesheetRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
