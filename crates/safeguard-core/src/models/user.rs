//! User model
//!
//! Registration, login, and password hashing live in the API layer; the
//! core only stores the account record the safety endpoints need for
//! role checks and location updates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::now_millis;
use crate::error::Error;

/// A unique identifier for a user, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new unique user ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Account role, controlling which safety endpoints a user may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Volunteer,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Volunteer => "volunteer",
            Self::Admin => "admin",
        }
    }

    /// Volunteers and admins may watch the full alert feed (list +
    /// long-poll); plain users only see their own alerts.
    #[must_use]
    pub const fn can_monitor_alerts(self) -> bool {
        matches!(self, Self::Volunteer | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "volunteer" => Ok(Self::Volunteer),
            "admin" => Ok(Self::Admin),
            other => Err(Error::InvalidInput(format!("Unknown role: {other}"))),
        }
    }
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Salted password digest; opaque to the core
    pub password_hash: String,
    pub salt: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    /// Last reported location, updated when the user raises an SOS alert
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub last_location_update: Option<i64>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last-update timestamp (Unix ms)
    pub updated_at: i64,
}

impl User {
    /// Create a new active, unverified account
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        password_hash: impl Into<String>,
        salt: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: UserId::new(),
            email: email.into(),
            password_hash: password_hash.into(),
            salt: salt.into(),
            name: name.into(),
            role,
            phone: None,
            is_verified: false,
            is_active: true,
            latitude: None,
            longitude: None,
            last_location_update: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a phone number
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("ana@example.com", "Ana", Role::User, "hash", "salt");
        assert!(user.is_active);
        assert!(!user.is_verified);
        assert!(user.latitude.is_none());
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::User, Role::Volunteer, Role::Admin] {
            let parsed: Role = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn test_monitor_permission() {
        assert!(!Role::User.can_monitor_alerts());
        assert!(Role::Volunteer.can_monitor_alerts());
        assert!(Role::Admin.can_monitor_alerts());
    }
}
