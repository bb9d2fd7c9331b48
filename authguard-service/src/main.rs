use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;

use authguard_service::{
    build_router,
    config::GuardConfig,
    error::AuthError,
    observability::init_tracing,
    services::{
        AuditTrail, AuthOrchestrator, BreachChecker, HttpBreachCorpus, InMemoryAdminDirectory,
        InMemoryAuditStore, InMemoryIdentityStore, InMemoryOverrideStore, InMemoryRateLimitStore,
        InMemorySessionStore, RateLimitPolicy, RateLimiter, RbacEvaluator, SecurityMonitor,
        SessionGuard, TracingAlertSink,
    },
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), AuthError> {
    // Load configuration - fail fast if invalid
    dotenvy::dotenv().ok();
    let config = GuardConfig::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting authentication security core"
    );

    // Storage adapters. The in-memory set suits a single-node deployment;
    // swapping in database-backed stores only touches this wiring.
    let rate_limit_store = Arc::new(InMemoryRateLimitStore::new());
    let audit_store = Arc::new(InMemoryAuditStore::new());
    let identity = Arc::new(InMemoryIdentityStore::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let overrides = Arc::new(InMemoryOverrideStore::new());
    let directory = Arc::new(InMemoryAdminDirectory::new());

    let limiter = RateLimiter::new(
        rate_limit_store,
        RateLimitPolicy::from(&config.rate_limit),
    );
    let breach = BreachChecker::new(
        Box::new(HttpBreachCorpus::new(&config.breach)?),
        &config.breach,
    );
    let rbac = RbacEvaluator::new(overrides);
    let audit = AuditTrail::new(audit_store);
    let monitor = SecurityMonitor::new(directory, Arc::new(TracingAlertSink));

    let orchestrator = Arc::new(AuthOrchestrator::new(
        &config,
        limiter,
        breach,
        rbac,
        audit.clone(),
        monitor.clone(),
        identity.clone(),
        sessions.clone(),
    ));
    let session_guard = SessionGuard::new(identity, sessions, audit, monitor);

    let state = AppState {
        config: config.clone(),
        orchestrator,
        session_guard,
    };

    let app = build_router(state);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|e| AuthError::Config(anyhow::anyhow!("Invalid BIND_ADDR: {}", e)))?;

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AuthError::Internal(e.into()))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AuthError::Internal(e.into()))?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
