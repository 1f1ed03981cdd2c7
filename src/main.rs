//! Community Hub Backend
//!
//! REST backend for a community directory: public submissions, admin review,
//! and a listing kept live by the submission-sync engine even when the
//! authoritative store lags or denies a write.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod sync;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use sync::{
    spawn_refresher, ApprovalOrchestrator, BroadcastStore, DurableCache, EventBus,
    ListingRefresher,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub orchestrator: Arc<ApprovalOrchestrator>,
    pub refresher: Arc<ListingRefresher>,
    pub events: EventBus,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Community Hub Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Cache dir: {:?}", config.cache_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.admin_psk.is_none() {
        tracing::warn!("No admin PSK configured (HUB_ADMIN_PSK). Admin routes are open!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Build the sync engine
    let cache = Arc::new(DurableCache::open(&config.cache_dir)?);
    let broadcast = Arc::new(BroadcastStore::new());
    let events = EventBus::new();

    let orchestrator = Arc::new(ApprovalOrchestrator::new(
        repo.clone(),
        cache.clone(),
        broadcast.clone(),
        events.clone(),
        config.fetch_timeout,
    ));

    let refresher = Arc::new(ListingRefresher::new(
        repo.clone(),
        cache,
        broadcast,
        config.fetch_timeout,
    ));

    // Background merge loop; the handle keeps it alive for the server's
    // lifetime and aborts it on the way out.
    let _refresher_handle = spawn_refresher(refresher.clone(), events.clone(), config.refresh_interval);

    // Create application state
    let state = AppState {
        repo,
        orchestrator,
        refresher,
        events,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.admin_psk.clone();

    // Admin routes: review dashboard surface, PSK-gated
    let admin_routes = Router::new()
        .route("/submissions", get(api::list_submissions))
        .route("/submissions/{id}", get(api::get_submission))
        .route("/submissions/{id}", delete(api::delete_submission))
        .route("/submissions/{id}/approve", post(api::approve_submission))
        .route("/submissions/{id}/reject", post(api::reject_submission))
        .route("/communities/refresh", post(api::request_refresh))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Public routes: submission form, listing, paid-access flow
    let public_routes = Router::new()
        .route("/submissions", post(api::create_submission))
        .route("/communities", get(api::list_communities))
        .route("/communities/{id}/join", post(api::join_community))
        .route("/payments/confirm", post(api::confirm_payment));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", admin_routes.merge(public_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
