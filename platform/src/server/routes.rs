//! Router configuration for the booking platform.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::banner;
use super::state::AppState;
use crate::api::{bookings, checkout, hotels, payments, reviews};
use crate::config::{Service, ServicesConfig};
use axum::{Router, routing::get};
use hotel_booking_auth::auth_router;
use hotel_booking_web::handlers::{ReadinessCheck, health_check, readiness_check};
use hotel_booking_web::{correlation_id_layer, cors_layer};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Everything the router needs besides the application state.
#[derive(Clone, Default)]
pub struct RouterConfig {
    /// Resource roots to mount under `/api`
    pub services: ServicesConfig,
    /// Dependencies probed by `/ready`
    pub readiness: Vec<Arc<dyn ReadinessCheck>>,
    /// Prometheus handle; `/metrics` is mounted when present
    pub metrics: Option<PrometheusHandle>,
    /// Origins allowed by CORS; empty allows any origin
    pub cors_allowed_origins: Vec<String>,
}

/// Build the complete Axum router.
///
/// Configures:
/// - `GET /` banner naming the enabled services
/// - Health and readiness checks
/// - `/metrics` when a Prometheus handle is supplied
/// - Every enabled service under `/api`
///
/// Requests are traced, tagged with a correlation id and subject to CORS.
pub fn build_router(state: AppState, config: RouterConfig) -> Router {
    let services = config.services;

    let mut api: Router<AppState> = Router::new();
    for service in services.iter() {
        api = match service {
            Service::Hotels => api.nest("/hotels", hotels::router()),
            Service::Bookings => api.nest("/bookings", bookings::router()),
            Service::Payments => api.nest("/payments", payments::router()),
            Service::Reviews => api.nest("/reviews", reviews::router()),
            Service::Checkout => api.nest("/checkout", checkout::router()),
            // Carries its own state
            Service::Auth => api,
        };
    }
    let mut api: Router = api.with_state(state.clone());
    if services.is_enabled(Service::Auth) {
        api = api.nest("/auth", auth_router(state.identity.clone()));
    }

    let readiness = Router::new()
        .route("/ready", get(readiness_check))
        .with_state(Arc::new(config.readiness));

    let banner = banner(&services);
    let mut app = Router::new()
        .route("/", get(move || async move { banner }))
        .route("/health", get(health_check))
        .merge(readiness)
        .nest("/api", api);

    if let Some(handle) = config.metrics {
        app = app.route("/metrics", get(move || async move { handle.render() }));
    }

    tracing::info!(services = ?services.iter().map(Service::name).collect::<Vec<_>>(), "Router built");

    app.layer(cors_layer(&config.cors_allowed_origins))
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
}
