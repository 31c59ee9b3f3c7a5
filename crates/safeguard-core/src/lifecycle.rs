//! SOS alert lifecycle manager
//!
//! Enforces the alert state machine (`active` -> `responded` ->
//! `resolved`/`cancelled`) and the one-active-alert-per-reporter rule.
//! Role checks (who may call respond/resolve) belong to the API layer;
//! this module only guards state transitions.

use crate::db::{AlertFilter, AlertRepository};
use crate::error::{Error, Result};
use crate::models::{now_millis, AlertId, AlertStatus, SosAlert, User, UserId};

/// Parameters for raising a new alert
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub message: Option<String>,
}

/// Guarded mutations over the alert store
pub struct AlertLifecycle<'a, R: AlertRepository> {
    repo: &'a R,
}

impl<'a, R: AlertRepository> AlertLifecycle<'a, R> {
    pub const fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Raise a new SOS alert for the reporter.
    ///
    /// Rejects with [`Error::Conflict`] if the reporter already has an
    /// `active` alert. The check-then-insert sequence leaves a narrow race
    /// window between concurrent creates for the same reporter; the worst
    /// outcome is a duplicate active alert, which responders can resolve.
    pub async fn create(&self, reporter: &User, request: NewAlert) -> Result<SosAlert> {
        let existing = self
            .repo
            .find(
                &AlertFilter::default()
                    .for_user(reporter.id)
                    .with_statuses(&[AlertStatus::Active])
                    .with_limit(1),
            )
            .await?;
        if !existing.is_empty() {
            return Err(Error::Conflict(
                "You already have an active SOS alert".to_string(),
            ));
        }

        let mut alert = SosAlert::new(
            reporter.id,
            reporter.name.clone(),
            request.latitude,
            request.longitude,
        );
        alert.address = request.address;
        alert.message = request.message;

        self.repo.insert(&alert).await?;
        tracing::info!(alert = %alert.id, reporter = %reporter.id, "SOS alert created");
        Ok(alert)
    }

    /// Record a volunteer response.
    ///
    /// Allowed only while the alert is `active`; flips it to `responded`
    /// and appends the volunteer to the responder set. Responding again
    /// once already recorded is an idempotent no-op. Any other respond
    /// attempt on a non-`active` alert is a conflict.
    pub async fn respond(&self, alert_id: &AlertId, volunteer: UserId) -> Result<SosAlert> {
        let mut alert = self
            .repo
            .get(alert_id)
            .await?
            .ok_or_else(|| Error::NotFound(alert_id.to_string()))?;

        match alert.status {
            AlertStatus::Active => {
                alert.add_responder(volunteer);
                alert.status = AlertStatus::Responded;
                alert.touch();
                self.repo.update(&alert).await?;
                tracing::info!(alert = %alert.id, volunteer = %volunteer, "SOS alert responded");
                Ok(alert)
            }
            AlertStatus::Responded if alert.has_responder(&volunteer) => Ok(alert),
            _ => Err(Error::Conflict(
                "SOS alert is no longer active".to_string(),
            )),
        }
    }

    /// Resolve an alert from any non-terminal state.
    ///
    /// An alert never has to pass through `responded` first; a reporter may
    /// stand down an alert nobody answered. Terminal alerts reject the
    /// attempt.
    pub async fn resolve(&self, alert_id: &AlertId) -> Result<SosAlert> {
        let mut alert = self
            .repo
            .get(alert_id)
            .await?
            .ok_or_else(|| Error::NotFound(alert_id.to_string()))?;

        if alert.is_terminal() {
            return Err(Error::Conflict(format!(
                "SOS alert is already {}",
                alert.status
            )));
        }

        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(now_millis());
        alert.touch();
        self.repo.update(&alert).await?;
        tracing::info!(alert = %alert.id, "SOS alert resolved");
        Ok(alert)
    }
}
