use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, level_filters::LevelFilter};

mod api;
mod config;
mod generators;
mod jobs;
mod orchestrator;
mod pipeline;
mod render;
mod store;

#[cfg(test)]
mod testutil;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    let config = config::Config::from_env();

    let store = Arc::new(store::ProjectStore::new(
        &config.db_path,
        &config.storage_dir,
    )?);
    info!("project store initialized at {:?}", config.db_path);

    let client = reqwest::Client::new();
    let generators = generators::Generators::google(client, config.google_api_key.clone());
    let renderer = Arc::new(render::FfmpegRenderer);
    let tracker = Arc::new(jobs::RunTracker::new());
    let orchestrator = Arc::new(orchestrator::Orchestrator::new(
        store.clone(),
        generators,
        renderer,
    ));

    let state = api::AppState {
        store,
        tracker,
        orchestrator,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", api::router(state))
        .nest_service("/static", ServeDir::new(&config.storage_dir))
        .layer(cors);

    info!("starting daemon server on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
