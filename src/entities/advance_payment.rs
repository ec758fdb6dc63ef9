use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdvanceStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "partially_repaid")]
    PartiallyRepaid,
    #[sea_orm(string_value = "fully_repaid")]
    FullyRepaid,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl AdvanceStatus {
    /// Statuses that still accept repayments
    pub const ELIGIBLE: [AdvanceStatus; 2] = [AdvanceStatus::Approved, AdvanceStatus::PartiallyRepaid];

    pub fn is_eligible_for_repayment(&self) -> bool {
        Self::ELIGIBLE.contains(self)
    }
}

/// Cash advance paid to an employee ahead of payroll
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "advance_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub employee_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub repaid_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub monthly_deduction: Option<Decimal>,
    pub status: AdvanceStatus,
    pub purpose: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub repayment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::advance_payment_history::Entity")]
    History,
}

impl Related<super::advance_payment_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Amount still owed on this advance
    pub fn remaining_balance(&self) -> Decimal {
        self.amount - self.repaid_amount
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
