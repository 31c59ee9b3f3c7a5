//! SOS alert repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use libsql::{params, Connection, Value};

use crate::error::{Error, Result};
use crate::models::{AlertId, AlertStatus, Priority, SosAlert, UserId};

/// Query filter for alert lookups
///
/// Results are always ordered by `created_at` descending, the ordering the
/// long-poll contract guarantees.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    statuses: Option<Vec<AlertStatus>>,
    updated_since: Option<i64>,
    user_id: Option<UserId>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl AlertFilter {
    /// Restrict to alerts in any of the given states
    #[must_use]
    pub fn with_statuses(mut self, statuses: &[AlertStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    /// Restrict to alerts with `updated_at >=` the given Unix-ms timestamp
    #[must_use]
    pub const fn updated_since(mut self, since: i64) -> Self {
        self.updated_since = Some(since);
        self
    }

    /// Restrict to alerts raised by the given user
    #[must_use]
    pub const fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Build the WHERE clause and its positional parameters
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(statuses) = &self.statuses {
            let placeholders = vec!["?"; statuses.len()].join(", ");
            clauses.push(format!("status IN ({placeholders})"));
            for status in statuses {
                values.push(Value::Text(status.as_str().to_string()));
            }
        }
        if let Some(since) = self.updated_since {
            clauses.push("updated_at >= ?".to_string());
            values.push(Value::Integer(since));
        }
        if let Some(user_id) = &self.user_id {
            clauses.push("user_id = ?".to_string());
            values.push(Value::Text(user_id.as_str()));
        }

        let sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        (sql, values)
    }
}

/// Trait for alert storage operations (async)
#[allow(async_fn_in_trait)]
pub trait AlertRepository {
    /// Insert a new alert
    async fn insert(&self, alert: &SosAlert) -> Result<()>;

    /// Get an alert by ID
    async fn get(&self, id: &AlertId) -> Result<Option<SosAlert>>;

    /// Rewrite the mutable fields of an existing alert
    async fn update(&self, alert: &SosAlert) -> Result<()>;

    /// List alerts matching the filter, newest-created first
    async fn find(&self, filter: &AlertFilter) -> Result<Vec<SosAlert>>;

    /// Count alerts matching the filter
    async fn count(&self, filter: &AlertFilter) -> Result<u64>;

    /// Count alerts the given user responded to
    async fn count_responded_by(&self, user_id: &UserId) -> Result<u64>;
}

/// libSQL implementation of `AlertRepository`
pub struct LibSqlAlertRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlAlertRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

const ALERT_COLUMNS: &str = "id, user_id, user_name, latitude, longitude, address, status, \
     priority, message, responders, created_at, updated_at, resolved_at";

/// Parse an alert from a database row (column order per `ALERT_COLUMNS`)
fn parse_alert(row: &libsql::Row) -> Result<SosAlert> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let status: String = row.get(6)?;
    let priority: String = row.get(7)?;
    let responders: String = row.get(9)?;

    Ok(SosAlert {
        id: id
            .parse()
            .map_err(|_| Error::Database(format!("Invalid alert id: {id}")))?,
        user_id: user_id
            .parse()
            .map_err(|_| Error::Database(format!("Invalid user id: {user_id}")))?,
        user_name: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        address: row.get(5)?,
        status: status.parse::<AlertStatus>()?,
        priority: priority.parse::<Priority>()?,
        message: row.get(8)?,
        responders: serde_json::from_str(&responders)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        resolved_at: row.get(12)?,
    })
}

impl AlertRepository for LibSqlAlertRepository<'_> {
    async fn insert(&self, alert: &SosAlert) -> Result<()> {
        let responders = serde_json::to_string(&alert.responders)?;
        self.conn
            .execute(
                "INSERT INTO sos_alerts (id, user_id, user_name, latitude, longitude, address, \
                 status, priority, message, responders, created_at, updated_at, resolved_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    alert.id.as_str(),
                    alert.user_id.as_str(),
                    alert.user_name.clone(),
                    alert.latitude,
                    alert.longitude,
                    alert.address.clone(),
                    alert.status.as_str(),
                    alert.priority.as_str(),
                    alert.message.clone(),
                    responders,
                    alert.created_at,
                    alert.updated_at,
                    alert.resolved_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &AlertId) -> Result<Option<SosAlert>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {ALERT_COLUMNS} FROM sos_alerts WHERE id = ?"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_alert(&row)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, alert: &SosAlert) -> Result<()> {
        let responders = serde_json::to_string(&alert.responders)?;
        let rows = self
            .conn
            .execute(
                "UPDATE sos_alerts SET user_name = ?, latitude = ?, longitude = ?, address = ?, \
                 status = ?, priority = ?, message = ?, responders = ?, updated_at = ?, \
                 resolved_at = ? WHERE id = ?",
                params![
                    alert.user_name.clone(),
                    alert.latitude,
                    alert.longitude,
                    alert.address.clone(),
                    alert.status.as_str(),
                    alert.priority.as_str(),
                    alert.message.clone(),
                    responders,
                    alert.updated_at,
                    alert.resolved_at,
                    alert.id.as_str(),
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(alert.id.to_string()));
        }
        Ok(())
    }

    async fn find(&self, filter: &AlertFilter) -> Result<Vec<SosAlert>> {
        let (where_sql, mut values) = filter.where_clause();
        let mut sql =
            format!("SELECT {ALERT_COLUMNS} FROM sos_alerts{where_sql} ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit as i64));
            if let Some(offset) = filter.offset {
                sql.push_str(" OFFSET ?");
                values.push(Value::Integer(offset as i64));
            }
        }

        let mut rows = self.conn.query(&sql, values).await?;
        let mut alerts = Vec::new();
        while let Some(row) = rows.next().await? {
            alerts.push(parse_alert(&row)?);
        }
        Ok(alerts)
    }

    async fn count(&self, filter: &AlertFilter) -> Result<u64> {
        let (where_sql, values) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM sos_alerts{where_sql}");

        let mut rows = self.conn.query(&sql, values).await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn count_responded_by(&self, user_id: &UserId) -> Result<u64> {
        // Responders are stored as a JSON array, so match the quoted id
        let pattern = format!("%\"{user_id}\"%");
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM sos_alerts WHERE responders LIKE ?",
                params![pattern],
            )
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn sample_alert() -> SosAlert {
        SosAlert::new(UserId::new(), "Ana", 40.0, -73.0)
            .with_address("5th Ave & 42nd St")
            .with_message("Need help")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = LibSqlAlertRepository::new(db.connection());

        let alert = sample_alert();
        repo.insert(&alert).await.unwrap();

        let fetched = repo.get(&alert.id).await.unwrap().unwrap();
        assert_eq!(fetched, alert);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_missing_returns_none() {
        let db = setup().await;
        let repo = LibSqlAlertRepository::new(db.connection());

        assert!(repo.get(&AlertId::new()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_round_trips_responders() {
        let db = setup().await;
        let repo = LibSqlAlertRepository::new(db.connection());

        let mut alert = sample_alert();
        repo.insert(&alert).await.unwrap();

        let volunteer = UserId::new();
        alert.add_responder(volunteer);
        alert.status = AlertStatus::Responded;
        alert.touch();
        repo.update(&alert).await.unwrap();

        let fetched = repo.get(&alert.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, AlertStatus::Responded);
        assert_eq!(fetched.responders, vec![volunteer]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_is_not_found() {
        let db = setup().await;
        let repo = LibSqlAlertRepository::new(db.connection());

        let err = repo.update(&sample_alert()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_find_filters_status_and_updated_since() {
        let db = setup().await;
        let repo = LibSqlAlertRepository::new(db.connection());

        let active = sample_alert();
        repo.insert(&active).await.unwrap();

        let mut resolved = sample_alert();
        resolved.status = AlertStatus::Resolved;
        resolved.resolved_at = Some(resolved.updated_at);
        repo.insert(&resolved).await.unwrap();

        let watched = AlertFilter::default()
            .with_statuses(&[AlertStatus::Active, AlertStatus::Responded])
            .updated_since(active.updated_at - 1_000);
        let found = repo.find(&watched).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, active.id);

        // A cutoff in the future matches nothing
        let future = AlertFilter::default().updated_since(active.updated_at + 60_000);
        assert!(repo.find(&future).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_find_orders_newest_created_first() {
        let db = setup().await;
        let repo = LibSqlAlertRepository::new(db.connection());

        let mut first = sample_alert();
        first.created_at -= 10_000;
        repo.insert(&first).await.unwrap();
        let second = sample_alert();
        repo.insert(&second).await.unwrap();

        let found = repo.find(&AlertFilter::default()).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].created_at >= found[1].created_at);
        assert_eq!(found[0].id, second.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_find_for_user() {
        let db = setup().await;
        let repo = LibSqlAlertRepository::new(db.connection());

        let mine = sample_alert();
        repo.insert(&mine).await.unwrap();
        repo.insert(&sample_alert()).await.unwrap();

        let found = repo
            .find(&AlertFilter::default().for_user(mine.user_id))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id, mine.user_id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_count_responded_by() {
        let db = setup().await;
        let repo = LibSqlAlertRepository::new(db.connection());

        let volunteer = UserId::new();
        let mut alert = sample_alert();
        alert.add_responder(volunteer);
        repo.insert(&alert).await.unwrap();
        repo.insert(&sample_alert()).await.unwrap();

        assert_eq!(repo.count_responded_by(&volunteer).await.unwrap(), 1);
        assert_eq!(repo.count_responded_by(&UserId::new()).await.unwrap(), 0);
    }
}
