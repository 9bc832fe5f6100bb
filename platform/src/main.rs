//! Hotel booking platform HTTP server.
//!
//! Serves every enabled service from one process; `SERVICES` narrows the
//! set so the same binary can run as any single service.

use anyhow::Context;
use hotel_booking::config::{Config, PaymentConfig, ProviderKind};
use hotel_booking::server::health::DatabaseCheck;
use hotel_booking::server::shutdown_signal;
use hotel_booking::{
    AppState, MockPaymentProvider, RouterConfig, Service, SharedPaymentProvider, StripeProvider,
    build_router, metrics,
};
use hotel_booking_auth::LocalIdentityProvider;
use hotel_booking_core::{Clock, SystemClock};
use hotel_booking_postgres::{
    PostgresBookingRepository, PostgresCheckoutLedger, PostgresHotelRepository,
    PostgresPaymentRepository, PostgresReviewRepository, PostgresSessionStore, PostgresUserStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions are deleted
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hotel_booking=debug,sqlx=warn,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hotel booking platform");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        services = %config.services.iter().map(Service::name).collect::<Vec<_>>().join(","),
        payment_provider = ?config.payment.provider,
        "Configuration loaded"
    );

    let metrics_handle = metrics::install_recorder().context("failed to install metrics recorder")?;

    // Setup database
    info!("Connecting to database...");
    let pool = hotel_booking_postgres::connect(&config.database.url, &config.database.pool_settings())
        .await
        .context("failed to connect to PostgreSQL")?;
    if config.database.run_migrations {
        hotel_booking_postgres::migrate(&pool)
            .await
            .context("failed to run migrations")?;
        info!("Database migrations applied");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Setup identity provider
    let session_ttl = i64::try_from(config.auth.session_ttl)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .context("AUTH_SESSION_TTL is out of range")?;
    let sessions = Arc::new(PostgresSessionStore::new(pool.clone()));
    let identity = LocalIdentityProvider::new(
        Arc::new(PostgresUserStore::new(pool.clone())),
        sessions.clone(),
        clock.clone(),
    )
    .with_session_ttl(session_ttl)
    .with_registration(config.auth.allow_registration);

    spawn_session_purge(sessions, clock.clone());

    let checkout_lease = i64::try_from(config.payment.checkout_lease)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .context("CHECKOUT_LEASE is out of range")?;

    let state = AppState {
        hotels: Arc::new(PostgresHotelRepository::new(pool.clone())),
        bookings: Arc::new(PostgresBookingRepository::new(pool.clone())),
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        reviews: Arc::new(PostgresReviewRepository::new(pool.clone())),
        checkouts: Arc::new(PostgresCheckoutLedger::new(pool.clone())),
        provider: payment_provider(&config.payment)?,
        identity: Arc::new(identity),
        clock,
        default_currency: config.payment.default_currency,
        checkout_lease,
    };

    let app = build_router(
        state,
        RouterConfig {
            services: config.services.clone(),
            readiness: vec![Arc::new(DatabaseCheck::new(pool))],
            metrics: Some(metrics_handle),
            cors_allowed_origins: config.server.cors_allowed_origins.clone(),
        },
    );

    // Bind and serve
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "HTTP server listening");

    let stop = Arc::new(Notify::new());
    let stopped = stop.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stopped.notified().await })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            info!("Server stopped");
            return Ok(());
        },
        () = shutdown_signal() => {},
    }

    info!("Shutting down gracefully...");
    stop.notify_one();

    let grace = Duration::from_secs(config.server.shutdown_timeout);
    match tokio::time::timeout(grace, server).await {
        Ok(result) => result??,
        Err(_) => warn!(timeout_secs = grace.as_secs(), "Shutdown timed out with requests in flight"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Build the configured card processor.
fn payment_provider(config: &PaymentConfig) -> anyhow::Result<SharedPaymentProvider> {
    match config.provider {
        ProviderKind::Stripe => {
            let secret_key = config
                .stripe_secret_key
                .clone()
                .context("STRIPE_SECRET_KEY is required for the stripe provider")?;
            let provider = StripeProvider::new(
                secret_key,
                config.stripe_api_base.clone(),
                Duration::from_secs(config.timeout),
            )?
            .with_return_url(config.return_url.clone());
            info!(api_base = %config.stripe_api_base, "Using Stripe payment provider");
            Ok(Arc::new(provider))
        },
        ProviderKind::Mock => {
            warn!("Using the mock payment provider: no card will be charged");
            Ok(Arc::new(MockPaymentProvider::new()))
        },
    }
}

/// Delete expired sessions periodically.
fn spawn_session_purge(sessions: Arc<PostgresSessionStore>, clock: Arc<dyn Clock>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.purge_expired(clock.now()).await {
                Ok(0) => {},
                Ok(purged) => info!(purged, "Expired sessions purged"),
                Err(err) => error!(error = %err, "Failed to purge expired sessions"),
            }
        }
    });
}
