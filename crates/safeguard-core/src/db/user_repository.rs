//! User repository implementation

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{Role, User, UserId};

/// Trait for account storage operations (async)
#[allow(async_fn_in_trait)]
pub trait UserRepository {
    /// Insert a new account
    async fn insert(&self, user: &User) -> Result<()>;

    /// Get an account by ID
    async fn get(&self, id: &UserId) -> Result<Option<User>>;

    /// Look up an account by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Record the user's current location
    async fn update_location(&self, id: &UserId, latitude: f64, longitude: f64, at: i64)
        -> Result<()>;

    /// Count active accounts
    async fn count_active(&self) -> Result<u64>;
}

/// libSQL implementation of `UserRepository`
pub struct LibSqlUserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlUserRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, salt, name, role, phone, is_verified, \
     is_active, latitude, longitude, last_location_update, created_at, updated_at";

/// Parse a user from a database row (column order per `USER_COLUMNS`)
fn parse_user(row: &libsql::Row) -> Result<User> {
    let id: String = row.get(0)?;
    let role: String = row.get(5)?;

    Ok(User {
        id: id
            .parse()
            .map_err(|_| Error::Database(format!("Invalid user id: {id}")))?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        salt: row.get(3)?,
        name: row.get(4)?,
        role: role.parse::<Role>()?,
        phone: row.get(6)?,
        is_verified: row.get::<i64>(7)? != 0,
        is_active: row.get::<i64>(8)? != 0,
        latitude: row.get(9)?,
        longitude: row.get(10)?,
        last_location_update: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

impl UserRepository for LibSqlUserRepository<'_> {
    async fn insert(&self, user: &User) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, email, password_hash, salt, name, role, phone, \
                 is_verified, is_active, latitude, longitude, last_location_update, \
                 created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    user.id.as_str(),
                    user.email.clone(),
                    user.password_hash.clone(),
                    user.salt.clone(),
                    user.name.clone(),
                    user.role.as_str(),
                    user.phone.clone(),
                    i64::from(user.is_verified),
                    i64::from(user.is_active),
                    user.latitude,
                    user.longitude,
                    user.last_location_update,
                    user.created_at,
                    user.updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &UserId) -> Result<Option<User>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE"),
                params![email],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_location(
        &self,
        id: &UserId,
        latitude: f64,
        longitude: f64,
        at: i64,
    ) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE users SET latitude = ?, longitude = ?, last_location_update = ?, \
                 updated_at = ? WHERE id = ?",
                params![latitude, longitude, at, at, id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn count_active(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM users WHERE is_active = 1", ())
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

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = LibSqlUserRepository::new(db.connection());

        let user = User::new("ana@example.com", "Ana", Role::User, "hash", "salt");
        repo.insert(&user).await.unwrap();

        let fetched = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched, user);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_find_by_email_case_insensitive() {
        let db = setup().await;
        let repo = LibSqlUserRepository::new(db.connection());

        let user = User::new("ana@example.com", "Ana", Role::Volunteer, "hash", "salt");
        repo.insert(&user).await.unwrap();

        let fetched = repo.find_by_email("Ana@Example.COM").await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        assert!(repo.find_by_email("nope@example.com").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_email_rejected() {
        let db = setup().await;
        let repo = LibSqlUserRepository::new(db.connection());

        let user = User::new("ana@example.com", "Ana", Role::User, "hash", "salt");
        repo.insert(&user).await.unwrap();

        let dup = User::new("ANA@example.com", "Other Ana", Role::User, "hash", "salt");
        assert!(repo.insert(&dup).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_location() {
        let db = setup().await;
        let repo = LibSqlUserRepository::new(db.connection());

        let user = User::new("ana@example.com", "Ana", Role::User, "hash", "salt");
        repo.insert(&user).await.unwrap();

        repo.update_location(&user.id, 40.0, -73.0, user.created_at + 5_000)
            .await
            .unwrap();

        let fetched = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.latitude, Some(40.0));
        assert_eq!(fetched.longitude, Some(-73.0));
        assert_eq!(fetched.last_location_update, Some(user.created_at + 5_000));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_count_active() {
        let db = setup().await;
        let repo = LibSqlUserRepository::new(db.connection());

        repo.insert(&User::new("a@example.com", "A", Role::User, "h", "s"))
            .await
            .unwrap();
        let mut inactive = User::new("b@example.com", "B", Role::User, "h", "s");
        inactive.is_active = false;
        repo.insert(&inactive).await.unwrap();

        assert_eq!(repo.count_active().await.unwrap(), 1);
    }
}
