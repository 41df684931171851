use axum::Router;
use std::sync::Arc;

use crate::jobs::RunTracker;
use crate::orchestrator::Orchestrator;
use crate::store::ProjectStore;

pub mod generate;
pub mod projects;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ProjectStore>,
    pub tracker: Arc<RunTracker>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(state: AppState) -> Router {
    Router::new().nest("/projects", {
        Router::new()
            .merge(projects::router(state.clone()))
            .merge(generate::router(state))
    })
}
