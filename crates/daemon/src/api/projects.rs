use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use engine::script::{Memory, Script};
use serde::Deserialize;
use tracing::error;

use super::AppState;
use crate::store::{Mode, Project};

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    name: String,
    topic: String,
    #[serde(default)]
    mode: Option<Mode>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_projects))
        .route("/", post(create_project))
        .route("/:id", get(get_project))
        .route("/:id/script", put(put_script))
        .route("/:id/memory", put(put_memory))
        .with_state(state)
}

fn internal(e: anyhow::Error) -> StatusCode {
    error!("store error: {:#}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, StatusCode> {
    let projects = state.store.list().map_err(internal)?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), StatusCode> {
    if req.name.trim().is_empty() || req.topic.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mode = req.mode.unwrap_or(Mode::TextToVideo);
    let project = state
        .store
        .create(&req.name, &req.topic, mode)
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, StatusCode> {
    let project = state
        .store
        .get(&id)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(project))
}

/// Replaces the project's script. Rejected scripts never reach storage.
async fn put_script(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(script): Json<Script>,
) -> Result<Json<Project>, (StatusCode, String)> {
    script
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let project = state
        .store
        .update_script(&id, script)
        .map_err(|e| (internal(e), String::new()))?
        .ok_or((StatusCode::NOT_FOUND, String::new()))?;
    Ok(Json(project))
}

/// Replaces the project's memory. Takes effect from the next generated scene.
async fn put_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(memory): Json<Memory>,
) -> Result<Json<Project>, StatusCode> {
    let project = state
        .store
        .update_memory(&id, memory)
        .map_err(internal)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(project))
}
