mod config;
mod db;
mod error;
mod models;
mod providers;
mod routes;
mod search;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::providers::ProviderRegistry;
use crate::routes::AppState;
use crate::search::aggregator::Aggregator;

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(pool: PgPool) -> impl IntoResponse {
    let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(&pool).await;
    match result {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jobhub=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;
        tracing::info!("Migrations complete");
    }

    let registry = Arc::new(ProviderRegistry::from_config(&config)?);
    for provider in registry.providers() {
        if !provider.is_configured() {
            tracing::warn!(
                provider = provider.kind().as_str(),
                "missing credentials, provider disabled"
            );
        }
    }

    let aggregator = Arc::new(Aggregator::new(
        pool.clone(),
        registry,
        Duration::from_secs(config.provider_timeout_secs),
    ));
    let state = AppState {
        aggregator,
        default_location: config.default_location.clone(),
    };

    let readyz_pool = pool;
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(move || readyz(readyz_pool.clone())))
        .merge(routes::ui::router())
        .merge(routes::api::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
