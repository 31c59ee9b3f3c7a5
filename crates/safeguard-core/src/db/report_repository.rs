//! Incident report repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{IncidentReport, IncidentType, ReportId, ReportStatus, Severity, UserId};

/// Trait for incident report storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ReportRepository {
    /// Insert a new report
    async fn insert(&self, report: &IncidentReport) -> Result<()>;

    /// List reports filed by the given user, newest first
    async fn list_for_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<IncidentReport>>;

    /// List all reports, newest first
    async fn list_all(&self, limit: usize) -> Result<Vec<IncidentReport>>;

    /// Count all reports
    async fn count(&self) -> Result<u64>;

    /// Count reports filed by the given user
    async fn count_for_user(&self, user_id: &UserId) -> Result<u64>;
}

/// libSQL implementation of `ReportRepository`
pub struct LibSqlReportRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlReportRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

const REPORT_COLUMNS: &str = "id, user_id, incident_type, severity, latitude, longitude, \
     address, description, incident_time, is_anonymous, status, created_at, updated_at";

/// Parse a report from a database row (column order per `REPORT_COLUMNS`)
fn parse_report(row: &libsql::Row) -> Result<IncidentReport> {
    let id: String = row.get(0)?;
    let user_id: Option<String> = row.get(1)?;
    let incident_type: String = row.get(2)?;
    let severity: String = row.get(3)?;
    let status: String = row.get(10)?;

    let user_id = match user_id {
        Some(raw) => Some(
            raw.parse()
                .map_err(|_| Error::Database(format!("Invalid user id: {raw}")))?,
        ),
        None => None,
    };

    Ok(IncidentReport {
        id: id
            .parse()
            .map_err(|_| Error::Database(format!("Invalid report id: {id}")))?,
        user_id,
        incident_type: incident_type.parse::<IncidentType>()?,
        severity: severity.parse::<Severity>()?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        address: row.get(6)?,
        description: row.get(7)?,
        incident_time: row.get(8)?,
        is_anonymous: row.get::<i64>(9)? != 0,
        status: status.parse::<ReportStatus>()?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

impl ReportRepository for LibSqlReportRepository<'_> {
    async fn insert(&self, report: &IncidentReport) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO incident_reports (id, user_id, incident_type, severity, latitude, \
                 longitude, address, description, incident_time, is_anonymous, status, \
                 created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    report.id.as_str(),
                    report.user_id.as_ref().map(UserId::as_str),
                    report.incident_type.as_str(),
                    report.severity.as_str(),
                    report.latitude,
                    report.longitude,
                    report.address.clone(),
                    report.description.clone(),
                    report.incident_time,
                    i64::from(report.is_anonymous),
                    report.status.as_str(),
                    report.created_at,
                    report.updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<IncidentReport>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {REPORT_COLUMNS} FROM incident_reports WHERE user_id = ? \
                     ORDER BY created_at DESC LIMIT ?"
                ),
                params![user_id.as_str(), limit as i64],
            )
            .await?;

        let mut reports = Vec::new();
        while let Some(row) = rows.next().await? {
            reports.push(parse_report(&row)?);
        }
        Ok(reports)
    }

    async fn list_all(&self, limit: usize) -> Result<Vec<IncidentReport>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {REPORT_COLUMNS} FROM incident_reports \
                     ORDER BY created_at DESC LIMIT ?"
                ),
                params![limit as i64],
            )
            .await?;

        let mut reports = Vec::new();
        while let Some(row) = rows.next().await? {
            reports.push(parse_report(&row)?);
        }
        Ok(reports)
    }

    async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM incident_reports", ())
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn count_for_user(&self, user_id: &UserId) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM incident_reports WHERE user_id = ?",
                params![user_id.as_str()],
            )
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
