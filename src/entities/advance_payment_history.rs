use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Immutable audit row: one per advance touched by a repayment
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "advance_payment_histories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub advance_payment_id: Uuid,
    pub employee_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::advance_payment::Entity",
        from = "Column::AdvancePaymentId",
        to = "super::advance_payment::Column::Id"
    )]
    AdvancePayment,
}

impl Related<super::advance_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvancePayment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
