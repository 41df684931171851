use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Tracks the generation run in flight per project. At most one run per
/// project: `try_begin` hands out a cancellation token or refuses while a
/// previous run is still registered.
#[derive(Default)]
pub struct RunTracker {
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl RunTracker {
    pub fn new() -> Self {
        RunTracker::default()
    }

    /// Registers a run for the project. Returns `None` if one is already
    /// active.
    pub fn try_begin(&self, project_id: &str) -> Option<CancellationToken> {
        let mut active = self.active.lock().unwrap();
        if active.contains_key(project_id) {
            return None;
        }
        let token = CancellationToken::new();
        active.insert(project_id.to_string(), token.clone());
        Some(token)
    }

    /// Fires the cancellation token for an active run. Returns whether a run
    /// was there to cancel. The run itself calls `finish` when it unwinds.
    pub fn cancel(&self, project_id: &str) -> bool {
        let active = self.active.lock().unwrap();
        match active.get(project_id) {
            Some(token) => {
                info!("cancelling run for project {}", project_id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn finish(&self, project_id: &str) {
        self.active.lock().unwrap().remove(project_id);
    }
}
