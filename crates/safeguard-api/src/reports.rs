use axum::extract::State;
use axum::{Extension, Json};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use safeguard_core::db::{LibSqlReportRepository, ReportRepository};
use safeguard_core::models::{now_millis, IncidentReport, IncidentType, Role, Severity};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct ReportSnapshot {
    pub id: String,
    pub user_id: Option<String>,
    pub incident_type: String,
    pub severity: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub description: String,
    pub incident_time: String,
    pub is_anonymous: bool,
    pub status: String,
    pub created_at: String,
}

impl From<&IncidentReport> for ReportSnapshot {
    fn from(report: &IncidentReport) -> Self {
        Self {
            id: report.id.as_str(),
            user_id: report.user_id.as_ref().map(|id| id.as_str()),
            incident_type: report.incident_type.to_string(),
            severity: report.severity.to_string(),
            latitude: report.latitude,
            longitude: report.longitude,
            address: report.address.clone(),
            description: report.description.clone(),
            incident_time: rfc3339(report.incident_time),
            is_anonymous: report.is_anonymous,
            status: report.status.to_string(),
            created_at: rfc3339(report.created_at),
        }
    }
}

fn rfc3339(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub incident_type: String,
    pub severity: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub description: String,
    /// RFC 3339; defaults to now when absent
    pub incident_time: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// `POST /v1/reports` — file an incident report.
///
/// An anonymous report keeps the record but drops the link to the account
/// that filed it.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateReportRequest>,
) -> Result<Json<ReportSnapshot>, AppError> {
    let incident_type: IncidentType = request
        .incident_type
        .parse()
        .map_err(|_| AppError::validation(format!("Unknown incident type: {}", request.incident_type)))?;
    let severity = match request.severity.as_deref() {
        None => Severity::Medium,
        Some(value) => value
            .parse()
            .map_err(|_| AppError::validation(format!("Unknown severity: {value}")))?,
    };
    let description = request.description.trim();
    if description.is_empty() {
        return Err(AppError::validation("Description is required"));
    }
    if !(-90.0..=90.0).contains(&request.latitude)
        || !(-180.0..=180.0).contains(&request.longitude)
    {
        return Err(AppError::validation("Coordinates out of range"));
    }
    let incident_time = match request.incident_time.as_deref() {
        None => now_millis(),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.timestamp_millis())
            .map_err(|_| AppError::validation(format!("Invalid RFC 3339 timestamp: {value}")))?,
    };

    let reporter = if request.is_anonymous {
        None
    } else {
        Some(user.user_id)
    };
    let mut report = IncidentReport::new(
        reporter,
        incident_type,
        severity,
        request.latitude,
        request.longitude,
        description,
        incident_time,
    );
    if let Some(address) = request.address {
        report = report.with_address(address);
    }

    let repo = LibSqlReportRepository::new(state.database.connection());
    repo.insert(&report).await?;
    tracing::info!(report = %report.id.as_str(), anonymous = report.is_anonymous, "Incident report filed");

    Ok(Json(ReportSnapshot::from(&report)))
}

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<ReportSnapshot>,
}

/// `GET /v1/reports` — own reports; admins see everything
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ReportListResponse>, AppError> {
    let repo = LibSqlReportRepository::new(state.database.connection());
    let reports = if user.role == Role::Admin {
        repo.list_all(state.config.list_page_size).await?
    } else {
        repo.list_for_user(&user.user_id, state.config.list_page_size)
            .await?
    };

    Ok(Json(ReportListResponse {
        reports: reports.iter().map(ReportSnapshot::from).collect(),
    }))
}
