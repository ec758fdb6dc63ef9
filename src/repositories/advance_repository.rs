use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::advance_payment::{
    ActiveModel as AdvanceActiveModel, Column, Entity as AdvancePayment, Model as AdvanceModel,
};
use crate::entities::advance_payment_history::{
    self, ActiveModel as HistoryActiveModel, Entity as AdvancePaymentHistory,
    Model as HistoryModel,
};
use crate::errors::ServiceError;
use crate::repositories::Repository;
use crate::workflow::{AdvanceAllocation, HistoryEntry};

use super::BaseRepository;

/// Loads advances and persists repayment allocations plus their audit rows
#[derive(Debug, Clone)]
pub struct AdvanceRepository {
    base: BaseRepository,
}

impl AdvanceRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// All live advances for an employee, oldest first
    pub async fn find_for_employee<C: ConnectionTrait>(
        &self,
        conn: &C,
        employee_id: Uuid,
    ) -> Result<Vec<AdvanceModel>, ServiceError> {
        Ok(AdvancePayment::find()
            .filter(Column::EmployeeId.eq(employee_id))
            .filter(Column::DeletedAt.is_null())
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(conn)
            .await?)
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
    ) -> Result<Option<AdvanceModel>, ServiceError> {
        Ok(AdvancePayment::find_by_id(id)
            .filter(Column::DeletedAt.is_null())
            .one(conn)
            .await?)
    }

    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        advance: AdvanceModel,
    ) -> Result<AdvanceModel, ServiceError> {
        let active: AdvanceActiveModel = advance.into();
        Ok(active.reset_all().insert(conn).await?)
    }

    /// Applies one allocation, guarded on the status and repaid amount it was
    /// computed from.
    pub async fn apply_allocation<C: ConnectionTrait>(
        &self,
        conn: &C,
        allocation: &AdvanceAllocation,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let changes = AdvanceActiveModel {
            repaid_amount: Set(allocation.repaid_amount),
            status: Set(allocation.status),
            repayment_date: Set(Some(allocation.repayment_date)),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = AdvancePayment::update_many()
            .set(changes)
            .filter(Column::Id.eq(allocation.advance_id))
            .filter(Column::Status.eq(allocation.expected_status))
            .filter(Column::RepaidAmount.eq(allocation.expected_repaid))
            .filter(Column::DeletedAt.is_null())
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(allocation.advance_id));
        }
        Ok(())
    }

    pub async fn append_history<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: &HistoryEntry,
    ) -> Result<HistoryModel, ServiceError> {
        let row = HistoryActiveModel {
            id: Set(Uuid::new_v4()),
            advance_payment_id: Set(entry.advance_payment_id),
            employee_id: Set(entry.employee_id),
            amount: Set(entry.amount),
            payment_date: Set(entry.payment_date),
            notes: Set(entry.notes.clone()),
            recorded_by: Set(entry.recorded_by.clone()),
            created_at: Set(entry.created_at),
        };
        Ok(row.insert(conn).await?)
    }

    /// One page of an employee's repayment history, newest first.
    ///
    /// `page` is 1-based. Returns the rows and the total row count.
    pub async fn history_page<C: ConnectionTrait>(
        &self,
        conn: &C,
        employee_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<HistoryModel>, u64), ServiceError> {
        let paginator = AdvancePaymentHistory::find()
            .filter(advance_payment_history::Column::EmployeeId.eq(employee_id))
            .order_by_desc(advance_payment_history::Column::PaymentDate)
            .order_by_desc(advance_payment_history::Column::CreatedAt)
            .paginate(conn, per_page.max(1));

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }
}

impl Repository for AdvanceRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
