//! Bounded-wait change poller for the SOS alert feed
//!
//! Gives a caller a way to block (up to a configured timeout) until alerts
//! appear or change, instead of busy-polling the API. The loop is
//! level-triggered: each attempt reports the full matching set, so a caller
//! repeating a call with the same `since` may see the same alerts again.
//! Callers advance `since` to the timestamp of the most recent response.

use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::db::{AlertFilter, AlertRepository};
use crate::error::Result;
use crate::models::{AlertStatus, SosAlert};

/// Alerts in these states are visible to watchers
const WATCHED_STATUSES: [AlertStatus; 2] = [AlertStatus::Active, AlertStatus::Responded];

/// Tuning for the long-poll wait loop
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Maximum total wait before returning an empty set
    pub timeout: Duration,
    /// Pause between store queries
    pub check_interval: Duration,
    /// How far back a caller's default `since` reaches when none is given
    pub lookback: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            check_interval: Duration::from_secs(2),
            lookback: Duration::from_secs(300),
        }
    }
}

/// Wait for alerts updated at or after `since` (Unix ms).
///
/// Queries the store at `check_interval` cadence until a watched alert
/// matches or `timeout` elapses, then returns (possibly empty). Each query
/// is an isolated read; nothing is locked across the sleeps, so writers
/// proceed freely while a caller waits. Because the final sleep may start
/// just inside the deadline, return can lag `timeout` by up to one
/// `check_interval`; that slack is accepted rather than engineered away.
///
/// A zero `timeout` degenerates to a single immediate query. Store errors
/// propagate to the caller; they are never reported as an empty feed.
///
/// Cancellation: this is an ordinary future. Dropping it (as axum does when
/// the requesting client disconnects) abandons the wait mid-sleep.
pub async fn wait_for_alerts<R: AlertRepository>(
    repo: &R,
    since: i64,
    config: &PollConfig,
) -> Result<Vec<SosAlert>> {
    let deadline = Instant::now() + config.timeout;
    let filter = AlertFilter::default()
        .with_statuses(&WATCHED_STATUSES)
        .updated_since(since);

    loop {
        let alerts = repo.find(&filter).await?;
        if !alerts.is_empty() {
            return Ok(alerts);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(since, "Long-poll timed out with no alert changes");
            return Ok(Vec::new());
        }
        sleep(config.check_interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlAlertRepository};
    use crate::error::Error;
    use crate::models::{now_millis, SosAlert, UserId};

    fn test_config() -> PollConfig {
        PollConfig {
            timeout: Duration::from_secs(10),
            check_interval: Duration::from_secs(2),
            lookback: Duration::from_secs(300),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_immediately_when_alert_matches() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlAlertRepository::new(db.connection());

        let alert = SosAlert::new(UserId::new(), "Ana", 40.0, -73.0);
        repo.insert(&alert).await.unwrap();

        let started = Instant::now();
        let found = wait_for_alerts(&repo, alert.updated_at - 10_000, &test_config())
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, alert.id);
        // No sleep cycle was needed
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_empty_when_nothing_matches() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlAlertRepository::new(db.connection());
        let config = test_config();

        let started = Instant::now();
        let found = wait_for_alerts(&repo, now_millis() + 60_000, &config)
            .await
            .unwrap();

        assert!(found.is_empty());
        let elapsed = started.elapsed();
        assert!(elapsed >= config.timeout);
        assert!(elapsed <= config.timeout + config.check_interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolved_alerts_are_not_watched() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlAlertRepository::new(db.connection());

        let mut alert = SosAlert::new(UserId::new(), "Ana", 40.0, -73.0);
        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(alert.updated_at);
        repo.insert(&alert).await.unwrap();

        let config = PollConfig {
            timeout: Duration::ZERO,
            ..test_config()
        };
        let found = wait_for_alerts(&repo, alert.updated_at - 10_000, &config)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_polls_once_without_sleeping() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlAlertRepository::new(db.connection());

        let config = PollConfig {
            timeout: Duration::ZERO,
            ..test_config()
        };
        let started = Instant::now();
        let found = wait_for_alerts(&repo, now_millis(), &config).await.unwrap();

        assert!(found.is_empty());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wakes_up_for_alert_created_mid_wait() {
        let db = Database::open_in_memory().await.unwrap();
        let conn = db.connection().clone();
        let since = now_millis();

        let waiter = tokio::spawn(async move {
            let repo = LibSqlAlertRepository::new(&conn);
            wait_for_alerts(&repo, since, &test_config()).await
        });

        // Let the first (empty) poll happen, then raise an alert
        tokio::time::sleep(Duration::from_millis(500)).await;
        let repo = LibSqlAlertRepository::new(db.connection());
        let alert = SosAlert::new(UserId::new(), "Ana", 40.0, -73.0);
        repo.insert(&alert).await.unwrap();

        let found = waiter.await.unwrap().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, alert.id);
    }

    /// Store whose reads always fail, for error-propagation tests
    struct FailingStore;

    impl AlertRepository for FailingStore {
        async fn insert(&self, _alert: &SosAlert) -> crate::Result<()> {
            Err(Error::Database("store offline".to_string()))
        }
        async fn get(&self, _id: &crate::AlertId) -> crate::Result<Option<SosAlert>> {
            Err(Error::Database("store offline".to_string()))
        }
        async fn update(&self, _alert: &SosAlert) -> crate::Result<()> {
            Err(Error::Database("store offline".to_string()))
        }
        async fn find(&self, _filter: &AlertFilter) -> crate::Result<Vec<SosAlert>> {
            Err(Error::Database("store offline".to_string()))
        }
        async fn count(&self, _filter: &AlertFilter) -> crate::Result<u64> {
            Err(Error::Database("store offline".to_string()))
        }
        async fn count_responded_by(&self, _user_id: &UserId) -> crate::Result<u64> {
            Err(Error::Database("store offline".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_propagates_instead_of_empty_set() {
        let err = wait_for_alerts(&FailingStore, now_millis(), &test_config())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }
}
