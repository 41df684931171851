use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::generators::Generators;
use crate::pipeline;
use crate::render::RenderBackend;
use crate::store::{Mode, Project, ProjectStore, Status};

/// Drives one project through the generation state machine:
/// created → scripting → script_ready → generating_assets → rendering →
/// completed, with `failed` absorbing any fatal error. Every transition
/// persists the whole record, so a restart observes the last completed phase
/// and a re-trigger resumes through per-scene asset idempotency.
pub struct Orchestrator {
    store: Arc<ProjectStore>,
    generators: Generators,
    renderer: Arc<dyn RenderBackend>,
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        anyhow::bail!("generation cancelled");
    }
    Ok(())
}

impl Orchestrator {
    pub fn new(
        store: Arc<ProjectStore>,
        generators: Generators,
        renderer: Arc<dyn RenderBackend>,
    ) -> Self {
        Orchestrator {
            store,
            generators,
            renderer,
        }
    }

    /// Entry point for a triggered run. Never leaves the project in a
    /// non-terminal status: any error escaping the phases lands here and is
    /// persisted as `failed` with the error message.
    pub async fn run(&self, project_id: &str, cancel: CancellationToken) {
        info!("generation run starting for project {}", project_id);
        if let Err(e) = self.execute(project_id, &cancel).await {
            error!("run failed for project {}: {:#}", project_id, e);
            self.mark_failed(project_id, &format!("{:#}", e));
        }
    }

    fn mark_failed(&self, project_id: &str, message: &str) {
        match self.store.get(project_id) {
            Ok(Some(mut project)) => {
                project.status = Status::Failed;
                project.error = Some(message.to_string());
                project.video_url = None;
                if let Err(e) = self.store.save(&mut project) {
                    error!("could not persist failure for {}: {:#}", project_id, e);
                }
            }
            Ok(None) => warn!("project {} vanished during run", project_id),
            Err(e) => error!("could not load {} to record failure: {:#}", project_id, e),
        }
    }

    fn transition(&self, project: &mut Project, status: Status) -> Result<()> {
        info!(
            "project {}: {} -> {}",
            project.id,
            project.status.as_str(),
            status.as_str()
        );
        project.status = status;
        self.store.save(project)
    }

    async fn execute(&self, project_id: &str, cancel: &CancellationToken) -> Result<()> {
        let Some(mut project) = self.store.get(project_id)? else {
            warn!("trigger for unknown project {}", project_id);
            return Ok(());
        };

        // Scripting phase, only for the script-driven mode and only when no
        // script exists yet (an edited script is kept as-is).
        if project.mode == Mode::TextToVideo && project.script.is_none() {
            self.transition(&mut project, Status::Scripting)?;
            let script = self
                .generators
                .script
                .generate(&project.topic)
                .await
                .map_err(|e| anyhow!("script generation failed: {:#}", e))?;
            project.script = Some(script);
            self.transition(&mut project, Status::ScriptReady)?;
        }

        ensure_not_cancelled(cancel)?;
        self.transition(&mut project, Status::GeneratingAssets)?;

        match project.mode {
            Mode::ImageConstrained => self.run_image_constrained(project, cancel).await,
            Mode::VideoExtension => Err(anyhow!("video extension mode is not implemented")),
            Mode::TextToVideo => self.run_text_to_video(project, cancel).await,
        }
    }

    /// Single-shot mode: one image-seeded video over the topic, no scenes.
    async fn run_image_constrained(
        &self,
        mut project: Project,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let dir = self.store.project_dir(&project.id)?;
        let output = dir.join("final.mp4");

        self.generators
            .video
            .generate_image_seeded(&project.topic, &output, cancel)
            .await
            .map_err(|e| anyhow!("image-constrained generation failed: {:#}", e))?;

        project.video_url = Some(format!("/static/{}/final.mp4", project.id));
        project.error = None;
        self.transition(&mut project, Status::Completed)?;
        Ok(())
    }

    async fn run_text_to_video(
        &self,
        mut project: Project,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let script = project
            .script
            .clone()
            .ok_or_else(|| anyhow!("no script to generate from"))?;
        script
            .validate()
            .map_err(|e| anyhow!("script is not usable: {}", e))?;

        let dir = self.store.project_dir(&project.id)?;
        let total = script.scenes.len();

        for (idx, scene) in script.scenes.iter().enumerate() {
            ensure_not_cancelled(cancel)?;

            // Memory edits made while the run is in flight apply from the
            // next scene onward.
            let memory = self
                .store
                .get(&project.id)?
                .map(|p| p.memory)
                .unwrap_or_default();

            let prefix = format!("[scene {}/{}] ", idx + 1, total);
            let outcome = pipeline::ensure_scene_assets(
                &self.generators,
                &dir,
                scene,
                &memory,
                cancel,
                &prefix,
            )
            .await?;

            for file in outcome.asset_files() {
                if !project.assets.contains(&file) {
                    project.assets.push(file);
                }
            }
            self.store.save(&mut project)?;
        }

        ensure_not_cancelled(cancel)?;
        self.transition(&mut project, Status::Rendering)?;

        let output = dir.join("final.mp4");
        self.renderer
            .render(&script, &dir, &output)
            .await
            .map_err(|e| anyhow!("rendering failed: {:#}", e))?;

        project.video_url = Some(format!("/static/{}/final.mp4", project.id));
        project.error = None;
        self.transition(&mut project, Status::Completed)?;
        Ok(())
    }
}
