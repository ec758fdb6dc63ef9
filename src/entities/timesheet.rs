use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Timesheet approval status
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
pub enum TimesheetStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "foreman_approved")]
    ForemanApproved,
    #[sea_orm(string_value = "incharge_approved")]
    InchargeApproved,
    #[sea_orm(string_value = "checking_approved")]
    CheckingApproved,
    #[sea_orm(string_value = "manager_approved")]
    ManagerApproved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// A single day of work for one employee
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "timesheets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub hours_worked: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub overtime_hours: Decimal,
    pub status: TimesheetStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<NaiveDate>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<NaiveDate>,
    pub rejection_reason: Option<String>,
    pub rejection_stage: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
