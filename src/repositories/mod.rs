use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod advance_repository;
pub mod timesheet_repository;

pub use advance_repository::AdvanceRepository;
pub use timesheet_repository::TimesheetRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
