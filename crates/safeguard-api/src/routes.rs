use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use safeguard_core::db::{
    AlertFilter, AlertRepository, Database, LibSqlAlertRepository, LibSqlReportRepository,
    LibSqlUserRepository, ReportRepository, UserRepository,
};
use safeguard_core::models::{AlertStatus, Role};

use crate::accounts;
use crate::alerts;
use crate::auth::{extract_bearer_token, AuthenticatedUser, TokenService};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::reports;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub database: Arc<Database>,
    tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, database: Arc<Database>) -> Self {
        Self {
            tokens: Arc::new(TokenService::new(config.clone())),
            config,
            database,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/me", get(accounts::me))
        .route("/sos/alerts", post(alerts::create).get(alerts::list))
        .route("/sos/alerts/poll", get(alerts::poll))
        .route("/sos/alerts/{id}/respond", post(alerts::respond))
        .route("/sos/alerts/{id}/resolve", post(alerts::resolve))
        .route("/reports", post(reports::create).get(reports::list))
        .route("/stats", get(stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public_routes = Router::new()
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", public_routes.merge(protected_routes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.tokens.verify(token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    my_alerts: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    my_reports: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_alerts: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alerts_responded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_alerts: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_reports: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_users: Option<u64>,
}

/// Role-dependent counters: users see their own footprint, volunteers see
/// the live workload, admins see system totals.
async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<StatsResponse>, AppError> {
    let conn = state.database.connection();
    let alert_repo = LibSqlAlertRepository::new(conn);
    let report_repo = LibSqlReportRepository::new(conn);
    let user_repo = LibSqlUserRepository::new(conn);

    let mut response = StatsResponse {
        my_alerts: None,
        my_reports: None,
        active_alerts: None,
        alerts_responded: None,
        total_alerts: None,
        total_reports: None,
        active_users: None,
    };

    match user.role {
        Role::User => {
            response.my_alerts = Some(
                alert_repo
                    .count(&AlertFilter::default().for_user(user.user_id))
                    .await?,
            );
            response.my_reports = Some(report_repo.count_for_user(&user.user_id).await?);
        }
        Role::Volunteer => {
            response.active_alerts = Some(
                alert_repo
                    .count(&AlertFilter::default().with_statuses(&[AlertStatus::Active]))
                    .await?,
            );
            response.alerts_responded = Some(alert_repo.count_responded_by(&user.user_id).await?);
        }
        Role::Admin => {
            response.total_alerts = Some(alert_repo.count(&AlertFilter::default()).await?);
            response.total_reports = Some(report_repo.count().await?);
            response.active_alerts = Some(
                alert_repo
                    .count(&AlertFilter::default().with_statuses(&[AlertStatus::Active]))
                    .await?,
            );
            response.active_users = Some(user_repo.count_active().await?);
        }
    }

    Ok(Json(response))
}
