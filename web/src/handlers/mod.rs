//! HTTP request handlers shared by every service.

pub mod health;

pub use health::{ReadinessCheck, health_check, readiness_check};
