//! Operational endpoints.
//!
//! `/health` and `/ready` come from the web crate; this module supplies the
//! database probe behind `/ready` and the plain-text banner served at `/`.

use crate::config::ServicesConfig;
use async_trait::async_trait;
use hotel_booking_postgres::PgPool;
use hotel_booking_web::handlers::ReadinessCheck;

/// Readiness probe for the `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct DatabaseCheck {
    pool: PgPool,
}

impl DatabaseCheck {
    /// Probe `pool` on every readiness request
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadinessCheck for DatabaseCheck {
    fn component(&self) -> &'static str {
        "database"
    }

    async fn check(&self) -> Result<(), String> {
        hotel_booking_postgres::ping(&self.pool)
            .await
            .map_err(|err| err.to_string())
    }
}

/// Banner text naming the services this instance serves.
///
/// ```text
/// Hotel booking platform running: hotels, reviews
/// ```
#[must_use]
pub fn banner(services: &ServicesConfig) -> String {
    let names: Vec<&str> = services.iter().map(|service| service.name()).collect();
    format!("Hotel booking platform running: {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Service;

    #[test]
    fn test_banner_lists_enabled_services() {
        let services = ServicesConfig::only([Service::Reviews, Service::Hotels]);
        assert_eq!(
            banner(&services),
            "Hotel booking platform running: hotels, reviews"
        );
    }
}
