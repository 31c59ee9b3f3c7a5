//! Incident report model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{now_millis, UserId};
use crate::error::Error;

/// A unique identifier for an incident report, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(Uuid);

impl ReportId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReportId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Category of a reported incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Harassment,
    SuspiciousActivity,
    UnsafeArea,
    PoorLighting,
    Other,
}

impl IncidentType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Harassment => "harassment",
            Self::SuspiciousActivity => "suspicious_activity",
            Self::UnsafeArea => "unsafe_area",
            Self::PoorLighting => "poor_lighting",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "harassment" => Ok(Self::Harassment),
            "suspicious_activity" => Ok(Self::SuspiciousActivity),
            "unsafe_area" => Ok(Self::UnsafeArea),
            "poor_lighting" => Ok(Self::PoorLighting),
            "other" => Ok(Self::Other),
            other => Err(Error::InvalidInput(format!(
                "Unknown incident type: {other}"
            ))),
        }
    }
}

/// Reporter-assessed severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
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

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(Error::InvalidInput(format!("Unknown severity: {other}"))),
        }
    }
}

/// Triage state of an incident report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Investigating,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "investigating" => Ok(Self::Investigating),
            "resolved" => Ok(Self::Resolved),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(Error::InvalidInput(format!(
                "Unknown report status: {other}"
            ))),
        }
    }
}

/// A (possibly anonymous) incident report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub id: ReportId,
    /// None for anonymous reports
    pub user_id: Option<UserId>,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub description: String,
    /// When the incident occurred (Unix ms), reporter-supplied
    pub incident_time: i64,
    pub is_anonymous: bool,
    pub status: ReportStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl IncidentReport {
    /// Create a new pending report
    #[must_use]
    pub fn new(
        user_id: Option<UserId>,
        incident_type: IncidentType,
        severity: Severity,
        latitude: f64,
        longitude: f64,
        description: impl Into<String>,
        incident_time: i64,
    ) -> Self {
        let now = now_millis();
        let is_anonymous = user_id.is_none();
        Self {
            id: ReportId::new(),
            user_id,
            incident_type,
            severity,
            latitude,
            longitude,
            address: None,
            description: description.into(),
            incident_time,
            is_anonymous,
            status: ReportStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a free-text address
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}
