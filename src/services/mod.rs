pub mod advances;
pub mod timesheets;

pub use advances::{AdvanceService, RepaymentOutcome};
pub use timesheets::{BulkAction, BulkApprovalResult, BulkItemError, TimesheetService};
