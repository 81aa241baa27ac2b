use std::net::SocketAddr;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod middleware;
mod routes;
mod services;
#[cfg(test)]
mod test_support;

use services::{credentials, sessions::SessionStore, storage::StorageService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lms_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env();

    // Ensure upload directory exists
    let storage = StorageService::new(&config.upload_path);
    storage.init().await?;

    // Initialize database
    let db = db::Database::connect(&config.database_url).await?;
    db.run_migrations().await?;

    // Bootstrap the admin account
    if config.admin_password == config::DEFAULT_ADMIN_PASSWORD {
        tracing::warn!("ADMIN_PASSWORD is not set, using the default admin password");
    }
    credentials::ensure_admin(
        &db.pool,
        &config.admin_username,
        &config.admin_email,
        &config.admin_password,
    )
    .await?;

    let state = AppState {
        db,
        sessions: SessionStore::new(config.session_ttl()),
        storage,
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn app(state: AppState) -> Router {
    // Uploaded resources, only for logged-in users
    let uploads: Router<AppState> = Router::new()
        .nest_service("/uploads", ServeDir::new(state.storage.root()))
        .route_layer(axum_middleware::from_fn(middleware::auth::require_session));

    Router::new()
        .route("/health", get(health_check))
        .merge(routes::auth::router())
        .merge(routes::courses::router())
        .merge(routes::dashboard::router())
        .merge(routes::admin::router(state.max_upload_bytes))
        .merge(uploads)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::session_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub sessions: SessionStore,
    pub storage: StorageService,
    pub max_upload_bytes: usize,
}
