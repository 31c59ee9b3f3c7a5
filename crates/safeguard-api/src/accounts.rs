use axum::extract::State;
use axum::{Extension, Json};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use safeguard_core::db::{LibSqlUserRepository, UserRepository};
use safeguard_core::models::{Role, User};

use crate::auth::{generate_salt, hash_password, verify_password, AuthenticatedUser, IssuedToken};
use crate::error::AppError;
use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileSnapshot {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
}

impl From<&User> for ProfileSnapshot {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_str(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.as_str().to_string(),
            phone: user.phone.clone(),
            is_verified: user.is_verified,
            created_at: DateTime::from_timestamp_millis(user.created_at)
                .unwrap_or_default()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub expires_at: i64,
    pub user: ProfileSnapshot,
}

impl SessionResponse {
    fn new(token: IssuedToken, user: &User) -> Self {
        Self {
            access_token: token.access_token,
            expires_at: token.expires_at,
            user: ProfileSnapshot::from(user),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Option<String>,
    pub phone: Option<String>,
}

/// `POST /v1/auth/register` — create an account and hand back a session.
///
/// Accounts self-register as `user` or `volunteer`; `admin` is granted
/// out of band.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let email = request.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::validation("A valid email address is required"));
    }
    if request.password.len() < 8 {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }

    let role = match request.role.as_deref() {
        None => Role::User,
        Some(value) => {
            let role: Role = value
                .parse()
                .map_err(|_| AppError::validation(format!("Unknown role: {value}")))?;
            if role == Role::Admin {
                return Err(AppError::validation(
                    "Admin accounts cannot be self-registered",
                ));
            }
            role
        }
    };

    let repo = LibSqlUserRepository::new(state.database.connection());
    if repo.find_by_email(&email).await?.is_some() {
        return Err(AppError::conflict("An account with this email already exists"));
    }

    let salt = generate_salt();
    let password_hash = hash_password(&request.password, &salt);
    let mut user = User::new(email, name, role, password_hash, salt);
    if let Some(phone) = request.phone {
        user = user.with_phone(phone);
    }
    repo.insert(&user).await?;
    tracing::info!(user = %user.id, role = %user.role, "Account registered");

    let token = state.tokens().issue(&user)?;
    Ok(Json(SessionResponse::new(token, &user)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /v1/auth/login` — verify credentials and mint a session.
///
/// Bad email and bad password produce the same response, so the endpoint
/// cannot be used to probe which addresses have accounts.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let repo = LibSqlUserRepository::new(state.database.connection());
    let user = repo
        .find_by_email(request.email.trim())
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    if !verify_password(&request.password, &user.salt, &user.password_hash) {
        return Err(AppError::unauthorized("Invalid email or password"));
    }
    if !user.is_active {
        return Err(AppError::forbidden("This account has been deactivated"));
    }

    let token = state.tokens().issue(&user)?;
    Ok(Json(SessionResponse::new(token, &user)))
}

/// `GET /v1/auth/me` — the authenticated user's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ProfileSnapshot>, AppError> {
    let repo = LibSqlUserRepository::new(state.database.connection());
    let profile = repo
        .get(&user.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Account no longer exists"))?;

    Ok(Json(ProfileSnapshot::from(&profile)))
}
