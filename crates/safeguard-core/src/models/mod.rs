//! Data models for Safeguard

mod alert;
mod report;
mod user;

pub use alert::{AlertId, AlertStatus, Priority, SosAlert};
pub use report::{IncidentReport, IncidentType, ReportId, ReportStatus, Severity};
pub use user::{Role, User, UserId};

/// Current time as Unix milliseconds, the timestamp unit used throughout
/// models and storage.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
