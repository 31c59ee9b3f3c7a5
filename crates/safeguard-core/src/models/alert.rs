//! SOS alert model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{now_millis, UserId};
use crate::error::Error;

/// A unique identifier for an SOS alert, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Create a new unique alert ID using UUID v7
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

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlertId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle state of an SOS alert
///
/// Alerts move `active` -> `responded` -> `resolved`; `cancelled` is a
/// second terminal state. Terminal alerts reject further mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Responded,
    Resolved,
    Cancelled,
}

impl AlertStatus {
    /// Storage/wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Responded => "responded",
            Self::Resolved => "resolved",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states admit no further transitions
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "responded" => Ok(Self::Responded),
            "resolved" => Ok(Self::Resolved),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::InvalidInput(format!("Unknown alert status: {other}"))),
        }
    }
}

/// Alert priority; SOS alerts are created `high`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(Error::InvalidInput(format!("Unknown priority: {other}"))),
        }
    }
}

/// An SOS alert raised by a user, watched by the change poller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosAlert {
    /// Unique identifier
    pub id: AlertId,
    /// Reporting user
    pub user_id: UserId,
    /// Reporter display name, denormalized for responder views
    pub user_name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Optional free-text address
    pub address: Option<String>,
    pub status: AlertStatus,
    pub priority: Priority,
    /// Optional free-text message from the reporter
    pub message: Option<String>,
    /// Volunteer user IDs that responded; duplicate-free
    pub responders: Vec<UserId>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last-update timestamp (Unix ms); bumped on every mutation
    pub updated_at: i64,
    /// Set if and only if status is `resolved`
    pub resolved_at: Option<i64>,
}

impl SosAlert {
    /// Create a new active alert at the given location
    #[must_use]
    pub fn new(user_id: UserId, user_name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        let now = now_millis();
        Self {
            id: AlertId::new(),
            user_id,
            user_name: user_name.into(),
            latitude,
            longitude,
            address: None,
            status: AlertStatus::Active,
            priority: Priority::High,
            message: None,
            responders: Vec::new(),
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    /// Attach a free-text address
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Attach a free-text message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Bump `updated_at` to now; call after any mutation
    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }

    /// Whether this alert has reached a terminal state
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the given user already responded to this alert
    #[must_use]
    pub fn has_responder(&self, user_id: &UserId) -> bool {
        self.responders.contains(user_id)
    }

    /// Add a responder, preserving the duplicate-free invariant.
    ///
    /// Returns `false` if the user was already present.
    pub fn add_responder(&mut self, user_id: UserId) -> bool {
        if self.has_responder(&user_id) {
            return false;
        }
        self.responders.push(user_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_alert_id_unique() {
        let id1 = AlertId::new();
        let id2 = AlertId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_alert_id_parse() {
        let id = AlertId::new();
        let parsed: AlertId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_new_alert_defaults() {
        let alert = SosAlert::new(UserId::new(), "Ana", 40.0, -73.0);
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.priority, Priority::High);
        assert!(alert.responders.is_empty());
        assert!(alert.resolved_at.is_none());
        assert_eq!(alert.created_at, alert.updated_at);
    }

    #[test]
    fn test_touch_never_decreases_updated_at() {
        let mut alert = SosAlert::new(UserId::new(), "Ana", 40.0, -73.0);
        let created = alert.created_at;
        alert.touch();
        assert!(alert.updated_at >= created);
    }

    #[test]
    fn test_add_responder_deduplicates() {
        let mut alert = SosAlert::new(UserId::new(), "Ana", 40.0, -73.0);
        let volunteer = UserId::new();
        assert!(alert.add_responder(volunteer));
        assert!(!alert.add_responder(volunteer));
        assert_eq!(alert.responders.len(), 1);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            AlertStatus::Active,
            AlertStatus::Responded,
            AlertStatus::Resolved,
            AlertStatus::Cancelled,
        ] {
            let parsed: AlertStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("escalated".parse::<AlertStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AlertStatus::Active.is_terminal());
        assert!(!AlertStatus::Responded.is_terminal());
        assert!(AlertStatus::Resolved.is_terminal());
        assert!(AlertStatus::Cancelled.is_terminal());
    }
}
