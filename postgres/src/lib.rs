//! `PostgreSQL` persistence for the hotel booking services.
//!
//! Implements every repository trait from `hotel-booking-core` plus the
//! account and session stores of the local identity provider. All queries
//! are runtime-checked `sqlx` queries against the schema in `migrations/`.
//!
//! # Example
//!
//! ```ignore
//! use hotel_booking_postgres::{connect, migrate, PoolSettings, PostgresBookingRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect("postgres://localhost/hotels", &PoolSettings::default()).await?;
//!     migrate(&pool).await?;
//!     let bookings = PostgresBookingRepository::new(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod accounts;
mod bookings;
mod error;
mod hotels;
mod ledger;
mod payments;
mod reviews;

pub use accounts::{PostgresSessionStore, PostgresUserStore};
pub use bookings::PostgresBookingRepository;
pub use hotels::PostgresHotelRepository;
pub use ledger::PostgresCheckoutLedger;
pub use payments::PostgresPaymentRepository;
pub use reviews::PostgresReviewRepository;

pub use sqlx::PgPool;

use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Connection pool sizing and timeouts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// How long to wait for a connection before failing
    pub connect_timeout: Duration,
    /// How long an idle connection is kept
    pub idle_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns the driver error if the database cannot be reached.
pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.connect_timeout)
        .idle_timeout(settings.idle_timeout)
        .connect(database_url)
        .await?;

    tracing::info!(
        max_connections = settings.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Apply the embedded migrations.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Round-trip a trivial query, for readiness probes.
///
/// # Errors
///
/// Returns the driver error if the database is unreachable.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
