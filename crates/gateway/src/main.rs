//! Casebook API Gateway
//!
//! The entry point for all external API requests.
//! Handles:
//! - Bearer-token authentication
//! - Request routing to the repositories
//! - Observability (logging, metrics, request ids)

mod extract;
mod handlers;
mod middleware;


use axum::{
    extract::FromRef,
    routing::{delete, get, post},
    Router,
};
use casebook_common::{
    auth::{JwtManager, PasswordPolicy, TokenService},
    cache::Cache,
    config::{AppConfig, ObservabilityConfig},
    db::{schema, DbPool},
    identity::{DbIdentityStore, IdentityStore, Role},
    metrics, AccountService, API_PREFIX,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub cache: Cache,
    pub tokens: Arc<dyn TokenService>,
    pub identity: Arc<dyn IdentityStore>,
    pub default_role: Role,
}

impl AppState {
    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.identity.clone(), self.tokens.clone(), self.default_role)
    }
}

impl FromRef<AppState> for Arc<dyn TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config.observability);
    info!("Starting Casebook API Gateway v{}", casebook_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.create_schema {
        schema::create_schema(db.write()).await?;
    }

    let cache = Cache::from_config(&config.cache).await?;

    let tokens: Arc<dyn TokenService> = Arc::new(JwtManager::from_config(&config.auth)?);
    let identity: Arc<dyn IdentityStore> = Arc::new(DbIdentityStore::new(
        db.clone(),
        PasswordPolicy::from(&config.password),
    ));
    let default_role: Role = config.auth.default_role.parse()?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        cache,
        tokens,
        identity,
        default_role,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing. `RUST_LOG` takes precedence over the configured level.
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Serve Prometheus metrics on their own port
fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Account endpoints (login and register need no token)
        .route("/login", post(handlers::account::login))
        .route("/register", post(handlers::account::register))
        .route("/account/me", get(handlers::account::me))

        // User endpoints
        .route("/users/{id}", delete(handlers::users::delete_user))
        .route("/users/{id}/notifications", get(handlers::notifications::list_for_user))

        // Case endpoints
        .route(
            "/cases",
            get(handlers::cases::list_cases).post(handlers::cases::create_case),
        )
        .route(
            "/cases/{id}",
            get(handlers::cases::get_case)
                .put(handlers::cases::update_case)
                .delete(handlers::cases::delete_case),
        )
        .route("/cases/{id}/documents", get(handlers::documents::list_for_case))
        .route("/cases/{id}/messages", get(handlers::messages::list_for_case))

        // Document endpoints
        .route(
            "/documents",
            get(handlers::documents::list_documents).post(handlers::documents::create_document),
        )
        .route(
            "/documents/{id}",
            get(handlers::documents::get_document)
                .put(handlers::documents::update_document)
                .delete(handlers::documents::delete_document),
        )

        // Message endpoints
        .route(
            "/messages",
            get(handlers::messages::list_messages).post(handlers::messages::create_message),
        )
        .route(
            "/messages/{id}",
            get(handlers::messages::get_message)
                .put(handlers::messages::update_message)
                .delete(handlers::messages::delete_message),
        )

        // Notification endpoints
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications)
                .post(handlers::notifications::create_notification),
        )
        .route(
            "/notifications/{id}",
            get(handlers::notifications::get_notification)
                .put(handlers::notifications::update_notification)
                .delete(handlers::notifications::delete_notification),
        )
        .route("/notifications/{id}/read", post(handlers::notifications::mark_read));

    let request_timeout = state.config.request_timeout();

    // Compose the app
    Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest(API_PREFIX, api_routes)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
