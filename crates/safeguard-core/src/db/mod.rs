//! Database layer for Safeguard

mod alert_repository;
mod connection;
mod migrations;
mod report_repository;
mod user_repository;

pub use alert_repository::{AlertFilter, AlertRepository, LibSqlAlertRepository};
pub use connection::Database;
pub use report_repository::{LibSqlReportRepository, ReportRepository};
pub use user_repository::{LibSqlUserRepository, UserRepository};
