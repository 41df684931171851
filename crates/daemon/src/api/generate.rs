use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Serialize;
use tracing::error;

use super::AppState;

#[derive(Serialize)]
pub struct TriggerResponse {
    project_id: String,
    status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/:id/generate", post(trigger_generation))
        .route("/:id/cancel", post(cancel_generation))
        .with_state(state)
}

/// Kicks off a background generation run. One run per project: a trigger
/// while a run is active is refused with 409.
async fn trigger_generation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TriggerResponse>, StatusCode> {
    let exists = state
        .store
        .get(&id)
        .map_err(|e| {
            error!("store error: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .is_some();
    if !exists {
        return Err(StatusCode::NOT_FOUND);
    }

    let Some(cancel) = state.tracker.try_begin(&id) else {
        return Err(StatusCode::CONFLICT);
    };

    let orchestrator = state.orchestrator.clone();
    let tracker = state.tracker.clone();
    let project_id = id.clone();
    tokio::spawn(async move {
        orchestrator.run(&project_id, cancel).await;
        tracker.finish(&project_id);
    });

    Ok(Json(TriggerResponse {
        project_id: id,
        status: "queued",
    }))
}

/// Requests cancellation of the active run. The run notices at its next
/// checkpoint and lands in `failed`; 404 if nothing is running.
async fn cancel_generation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TriggerResponse>, StatusCode> {
    if !state.tracker.cancel(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(TriggerResponse {
        project_id: id,
        status: "cancelling",
    }))
}
