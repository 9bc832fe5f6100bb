//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use async_trait::async_trait;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;

/// A dependency the service needs before it can take traffic.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Component name reported in the readiness body
    fn component(&self) -> &'static str;

    /// Probe the dependency
    ///
    /// # Errors
    ///
    /// Returns a description of the failure when the dependency is unusable.
    async fn check(&self) -> Result<(), String>;
}

/// Liveness response body
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Readiness response body
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// `"ready"` or `"unavailable"`
    pub status: &'static str,
    /// Component that failed, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<&'static str>,
    /// Failure description, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Simple health check endpoint (for basic liveness).
///
/// Does NOT check dependencies (database, etc.).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// { "status": "ok", "version": "0.1.0" }
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check: probes every registered dependency in order.
///
/// # Status Codes
///
/// - 200 OK: all dependencies answered
/// - 503 Service Unavailable: the first failing dependency is reported
pub async fn readiness_check(
    State(checks): State<Arc<Vec<Arc<dyn ReadinessCheck>>>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    for check in checks.iter() {
        if let Err(message) = check.check().await {
            tracing::warn!(component = check.component(), error = %message, "Readiness check failed");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "unavailable",
                    component: Some(check.component()),
                    message: Some(message),
                }),
            );
        }
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            component: None,
            message: None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe(Result<(), String>);

    #[async_trait]
    impl ReadinessCheck for Probe {
        fn component(&self) -> &'static str {
            "database"
        }

        async fn check(&self) -> Result<(), String> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_simple_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_ready_when_all_checks_pass() {
        let checks: Vec<Arc<dyn ReadinessCheck>> = vec![Arc::new(Probe(Ok(())))];
        let (status, Json(body)) = readiness_check(State(Arc::new(checks))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ready");
    }

    #[tokio::test]
    async fn test_unavailable_names_failing_component() {
        let checks: Vec<Arc<dyn ReadinessCheck>> =
            vec![Arc::new(Probe(Err("connection refused".to_string())))];
        let (status, Json(body)) = readiness_check(State(Arc::new(checks))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.component, Some("database"));
        assert_eq!(body.message.as_deref(), Some("connection refused"));
    }
}
