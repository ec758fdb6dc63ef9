use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_timesheets_table::Migration),
            Box::new(m20240101_000002_create_advance_payments_table::Migration),
            Box::new(m20240101_000003_create_advance_payment_histories_table::Migration),
        ]
    }
}

mod m20240101_000001_create_timesheets_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_timesheets_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Timesheets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Timesheets::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Timesheets::EmployeeId).uuid().not_null())
                        .col(ColumnDef::new(Timesheets::Date).date().not_null())
                        .col(
                            ColumnDef::new(Timesheets::HoursWorked)
                                .decimal_len(5, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Timesheets::OvertimeHours)
                                .decimal_len(5, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Timesheets::Status)
                                .string_len(32)
                                .not_null()
                                .default("draft"),
                        )
                        .col(ColumnDef::new(Timesheets::ApprovedBy).string().null())
                        .col(ColumnDef::new(Timesheets::ApprovedAt).date().null())
                        .col(
                            ColumnDef::new(Timesheets::SubmittedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Timesheets::RejectedBy).string().null())
                        .col(ColumnDef::new(Timesheets::RejectedAt).date().null())
                        .col(ColumnDef::new(Timesheets::RejectionReason).text().null())
                        .col(ColumnDef::new(Timesheets::RejectionStage).string_len(32).null())
                        .col(ColumnDef::new(Timesheets::Notes).text().null())
                        .col(
                            ColumnDef::new(Timesheets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Timesheets::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Timesheets::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_timesheets_employee_date")
                        .table(Timesheets::Table)
                        .col(Timesheets::EmployeeId)
                        .col(Timesheets::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_timesheets_status")
                        .table(Timesheets::Table)
                        .col(Timesheets::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Timesheets::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Timesheets {
        Table,
        Id,
        EmployeeId,
        Date,
        HoursWorked,
        OvertimeHours,
        Status,
        ApprovedBy,
        ApprovedAt,
        SubmittedAt,
        RejectedBy,
        RejectedAt,
        RejectionReason,
        RejectionStage,
        Notes,
        CreatedAt,
        UpdatedAt,
        DeletedAt,
    }
}

mod m20240101_000002_create_advance_payments_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_advance_payments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AdvancePayments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AdvancePayments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AdvancePayments::EmployeeId).uuid().not_null())
                        .col(
                            ColumnDef::new(AdvancePayments::Amount)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AdvancePayments::RepaidAmount)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(AdvancePayments::MonthlyDeduction)
                                .decimal_len(10, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AdvancePayments::Status)
                                .string_len(32)
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(AdvancePayments::Purpose).string().not_null())
                        .col(ColumnDef::new(AdvancePayments::Reason).text().null())
                        .col(ColumnDef::new(AdvancePayments::Notes).text().null())
                        .col(ColumnDef::new(AdvancePayments::RepaymentDate).date().null())
                        .col(
                            ColumnDef::new(AdvancePayments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AdvancePayments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AdvancePayments::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_advance_payments_employee_id")
                        .table(AdvancePayments::Table)
                        .col(AdvancePayments::EmployeeId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AdvancePayments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum AdvancePayments {
        Table,
        Id,
        EmployeeId,
        Amount,
        RepaidAmount,
        MonthlyDeduction,
        Status,
        Purpose,
        Reason,
        Notes,
        RepaymentDate,
        CreatedAt,
        UpdatedAt,
        DeletedAt,
    }
}

mod m20240101_000003_create_advance_payment_histories_table {
    use super::m20240101_000002_create_advance_payments_table::AdvancePayments;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_advance_payment_histories_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AdvancePaymentHistories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AdvancePaymentHistories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AdvancePaymentHistories::AdvancePaymentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AdvancePaymentHistories::EmployeeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AdvancePaymentHistories::Amount)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AdvancePaymentHistories::PaymentDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AdvancePaymentHistories::Notes).text().null())
                        .col(
                            ColumnDef::new(AdvancePaymentHistories::RecordedBy)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AdvancePaymentHistories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_advance_payment_histories_advance_payment_id")
                                .from(
                                    AdvancePaymentHistories::Table,
                                    AdvancePaymentHistories::AdvancePaymentId,
                                )
                                .to(AdvancePayments::Table, AdvancePayments::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_advance_payment_histories_employee_id")
                        .table(AdvancePaymentHistories::Table)
                        .col(AdvancePaymentHistories::EmployeeId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AdvancePaymentHistories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AdvancePaymentHistories {
        Table,
        Id,
        AdvancePaymentId,
        EmployeeId,
        Amount,
        PaymentDate,
        Notes,
        RecordedBy,
        CreatedAt,
    }
}

/// Connects to `db_url` and applies every pending migration
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(5)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");
    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}

/// Rolls back the most recent `steps` migrations
pub async fn rollback_migration(db_url: &str, steps: u32) -> Result<()> {
    let db = Database::connect(db_url).await?;
    info!(steps, "Rolling back migrations");
    Migrator::down(&db, Some(steps)).await?;
    Ok(())
}
