pub mod advances;
pub mod timesheets;

use std::sync::Arc;

use crate::{
    auth::PermissionChecker,
    db::{DatabaseAccess, DbPool},
    events::EventSender,
    repositories::{AdvanceRepository, TimesheetRepository},
    services::{AdvanceService, TimesheetService},
    workflow::Clock,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub timesheets: Arc<TimesheetService>,
    pub advances: Arc<AdvanceService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        clock: Arc<dyn Clock>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        let db = DatabaseAccess::new(db_pool.clone());

        let timesheets = Arc::new(TimesheetService::new(
            db.clone(),
            TimesheetRepository::new(db_pool.clone()),
            event_sender.clone(),
            clock.clone(),
            permissions,
        ));
        let advances = Arc::new(AdvanceService::new(
            db,
            AdvanceRepository::new(db_pool),
            event_sender,
            clock,
        ));

        Self {
            timesheets,
            advances,
        }
    }
}

/// Flattens validator output into `field: message` strings
pub(crate) fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string())
                )
            })
        })
        .collect()
}
