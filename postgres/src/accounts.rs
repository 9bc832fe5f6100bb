//! `users` and `sessions` tables for the local identity provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotel_booking_auth::{AuthError, NewUser, Result, Session, SessionStore, User, UserStore};
use hotel_booking_core::UserId;
use sqlx::PgPool;

fn auth_store_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AuthError {
    move |err| {
        tracing::error!(operation, error = %err, "Database operation failed");
        metrics::counter!("db_errors_total", "operation" => operation).increment(1);
        AuthError::Store(format!("{operation}: {err}"))
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    name: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

/// `PostgreSQL` account store.
#[derive(Clone, Debug)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Create a store over `pool`
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO users (email, name, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, password_hash, created_at
            ",
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AuthError::EmailTaken;
                }
            }
            auth_store_error("users.create")(e)
        })?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(auth_store_error("users.find_by_email"))?;
        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(auth_store_error("users.find_by_id"))?;
        Ok(row.map(User::from))
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    token_hash: String,
    user_id: i64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// `PostgreSQL` session store.
#[derive(Clone, Debug)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Create a store over `pool`
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete sessions that expired before `now`, returning how many went.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the delete fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(auth_store_error("sessions.purge_expired"))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn insert(&self, session: Session) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&session.token_hash)
        .bind(session.user_id.get())
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(auth_store_error("sessions.insert"))?;
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> Result<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT token_hash, user_id, created_at, expires_at FROM sessions WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(auth_store_error("sessions.find"))?;

        Ok(row.map(|row| Session {
            token_hash: row.token_hash,
            user_id: UserId::new(row.user_id),
            created_at: row.created_at,
            expires_at: row.expires_at,
        }))
    }

    async fn revoke(&self, token_hash: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(auth_store_error("sessions.revoke"))?;
        Ok(())
    }
}
