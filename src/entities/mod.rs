pub mod advance_payment;
pub mod advance_payment_history;
pub mod timesheet;

pub use advance_payment::{AdvanceStatus, Entity as AdvancePayment};
pub use advance_payment_history::Entity as AdvancePaymentHistory;
pub use timesheet::{Entity as Timesheet, TimesheetStatus};
