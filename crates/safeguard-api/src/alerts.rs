use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use safeguard_core::db::{AlertFilter, AlertRepository, LibSqlAlertRepository, LibSqlUserRepository, UserRepository};
use safeguard_core::lifecycle::{AlertLifecycle, NewAlert};
use safeguard_core::models::{now_millis, AlertId, AlertStatus, Role, SosAlert};
use safeguard_core::poller::{wait_for_alerts, PollConfig};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::routes::AppState;

/// Wire representation of an alert; timestamps leave as RFC 3339
#[derive(Debug, Serialize)]
pub struct AlertSnapshot {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub status: String,
    pub priority: String,
    pub message: Option<String>,
    pub responders: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub resolved_at: Option<String>,
}

impl From<&SosAlert> for AlertSnapshot {
    fn from(alert: &SosAlert) -> Self {
        Self {
            id: alert.id.as_str(),
            user_id: alert.user_id.as_str(),
            user_name: alert.user_name.clone(),
            latitude: alert.latitude,
            longitude: alert.longitude,
            address: alert.address.clone(),
            status: alert.status.to_string(),
            priority: alert.priority.to_string(),
            message: alert.message.clone(),
            responders: alert.responders.iter().map(|id| id.as_str()).collect(),
            created_at: rfc3339(alert.created_at),
            updated_at: rfc3339(alert.updated_at),
            resolved_at: alert.resolved_at.map(rfc3339),
        }
    }
}

fn rfc3339(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_rfc3339(value: &str) -> Result<i64, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| AppError::validation(format!("Invalid RFC 3339 timestamp: {value}")))
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub message: Option<String>,
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::validation(format!(
            "Latitude out of range: {latitude}"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::validation(format!(
            "Longitude out of range: {longitude}"
        )));
    }
    Ok(())
}

/// `POST /v1/sos/alerts` — raise an SOS alert.
///
/// Also stores the coordinates as the reporter's last known location, so
/// responders see where the reporter was even after the alert is resolved.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateAlertRequest>,
) -> Result<Json<AlertSnapshot>, AppError> {
    validate_coordinates(request.latitude, request.longitude)?;

    let conn = state.database.connection();
    let user_repo = LibSqlUserRepository::new(conn);
    let reporter = user_repo
        .get(&user.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Account no longer exists"))?;

    let alert_repo = LibSqlAlertRepository::new(conn);
    let alert = AlertLifecycle::new(&alert_repo)
        .create(
            &reporter,
            NewAlert {
                latitude: request.latitude,
                longitude: request.longitude,
                address: request.address,
                message: request.message,
            },
        )
        .await?;

    user_repo
        .update_location(&reporter.id, request.latitude, request.longitude, now_millis())
        .await?;

    Ok(Json(AlertSnapshot::from(&alert)))
}

#[derive(Debug, Serialize)]
pub struct AlertListResponse {
    pub alerts: Vec<AlertSnapshot>,
}

/// `GET /v1/sos/alerts` — volunteers and admins see the open board
/// (`active` and `responded`, newest first); everyone else sees only
/// their own alerts, whatever the state.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<AlertListResponse>, AppError> {
    let repo = LibSqlAlertRepository::new(state.database.connection());
    let filter = if user.role.can_monitor_alerts() {
        AlertFilter::default()
            .with_statuses(&[AlertStatus::Active, AlertStatus::Responded])
            .with_limit(state.config.list_page_size)
    } else {
        AlertFilter::default()
            .for_user(user.user_id)
            .with_limit(state.config.list_page_size)
    };

    let alerts = repo.find(&filter).await?;
    Ok(Json(AlertListResponse {
        alerts: alerts.iter().map(AlertSnapshot::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub since: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub alerts: Vec<AlertSnapshot>,
    pub timestamp: String,
}

/// `GET /v1/sos/alerts/poll?since=<RFC 3339>` — bounded-wait poll.
///
/// Holds the request open until an `active` or `responded` alert has an
/// update at or after `since`, or the configured timeout passes. With no
/// `since`, the window starts a configured lookback behind now, so a
/// monitor that just connected still sees recent activity. The timestamp
/// in the response is the client's natural `since` for its next call.
pub async fn poll(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PollResponse>, AppError> {
    if !user.role.can_monitor_alerts() {
        return Err(AppError::forbidden(
            "Only volunteers and admins may monitor the alert feed",
        ));
    }

    let config = PollConfig {
        timeout: state.config.long_poll_timeout,
        check_interval: state.config.long_poll_check_interval,
        lookback: state.config.long_poll_lookback,
    };
    let since = match query.since.as_deref() {
        Some(value) => parse_rfc3339(value)?,
        None => {
            now_millis() - i64::try_from(config.lookback.as_millis()).unwrap_or(i64::MAX)
        }
    };

    let repo = LibSqlAlertRepository::new(state.database.connection());
    let alerts = wait_for_alerts(&repo, since, &config).await?;

    Ok(Json(PollResponse {
        alerts: alerts.iter().map(AlertSnapshot::from).collect(),
        timestamp: rfc3339(now_millis()),
    }))
}

/// `POST /v1/sos/alerts/{id}/respond` — volunteer marks themselves en route
pub async fn respond(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<AlertSnapshot>, AppError> {
    if user.role != Role::Volunteer {
        return Err(AppError::forbidden("Only volunteers may respond to alerts"));
    }
    let alert_id = parse_alert_id(&id)?;

    let repo = LibSqlAlertRepository::new(state.database.connection());
    let alert = AlertLifecycle::new(&repo)
        .respond(&alert_id, user.user_id)
        .await?;
    Ok(Json(AlertSnapshot::from(&alert)))
}

/// `POST /v1/sos/alerts/{id}/resolve` — close out an alert.
///
/// The reporter may resolve their own alert; volunteers and admins may
/// resolve anyone's.
pub async fn resolve(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<AlertSnapshot>, AppError> {
    let alert_id = parse_alert_id(&id)?;

    let repo = LibSqlAlertRepository::new(state.database.connection());
    let existing = repo
        .get(&alert_id)
        .await?
        .ok_or_else(|| AppError::not_found("SOS alert not found"))?;

    if existing.user_id != user.user_id && !user.role.can_monitor_alerts() {
        return Err(AppError::forbidden(
            "Only the reporter, volunteers, or admins may resolve this alert",
        ));
    }

    let alert = AlertLifecycle::new(&repo).resolve(&alert_id).await?;
    Ok(Json(AlertSnapshot::from(&alert)))
}

fn parse_alert_id(value: &str) -> Result<AlertId, AppError> {
    value
        .parse()
        .map_err(|_| AppError::validation(format!("Invalid alert id: {value}")))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn rfc3339_round_trip() {
        let millis = 1_700_000_123_456;
        let text = rfc3339(millis);
        assert_eq!(parse_rfc3339(&text).unwrap(), millis);
    }

    #[test]
    fn rfc3339_rejects_garbage() {
        assert!(parse_rfc3339("yesterday").is_err());
    }

    #[test]
    fn coordinates_validated_against_wgs84_bounds() {
        assert!(validate_coordinates(40.7, -73.9).is_ok());
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(90.1, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn snapshot_serializes_timestamps_as_strings() {
        let alert = SosAlert::new(
            safeguard_core::models::UserId::new(),
            "Rey",
            40.7,
            -73.9,
        );
        let snapshot = AlertSnapshot::from(&alert);

        assert_eq!(snapshot.status, "active");
        assert!(snapshot.created_at.ends_with('Z'));
        assert_eq!(snapshot.resolved_at, None);
    }
}
