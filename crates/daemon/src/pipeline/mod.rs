use anyhow::Result;
use engine::context::apply_context;
use engine::script::{Memory, Scene};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::generators::Generators;

pub fn audio_path(project_dir: &Path, scene_id: i64) -> PathBuf {
    project_dir.join(format!("scene_{}.mp3", scene_id))
}

pub fn video_path(project_dir: &Path, scene_id: i64) -> PathBuf {
    project_dir.join(format!("scene_{}.mp4", scene_id))
}

pub fn image_path(project_dir: &Path, scene_id: i64) -> PathBuf {
    project_dir.join(format!("scene_{}.png", scene_id))
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneVisual {
    Clip(PathBuf),
    Still(PathBuf),
}

/// What one scene ended up with after a pipeline pass. A scene with neither
/// audio nor visual is still a valid outcome; assembly substitutes a
/// placeholder for it.
#[derive(Debug, Clone)]
pub struct SceneOutcome {
    pub scene_id: i64,
    pub audio: Option<PathBuf>,
    pub visual: Option<SceneVisual>,
}

impl SceneOutcome {
    /// Asset file names (relative to the project dir) for the project record.
    pub fn asset_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        if let Some(audio) = &self.audio {
            if let Some(name) = audio.file_name() {
                files.push(name.to_string_lossy().to_string());
            }
        }
        match &self.visual {
            Some(SceneVisual::Clip(path)) | Some(SceneVisual::Still(path)) => {
                if let Some(name) = path.file_name() {
                    files.push(name.to_string_lossy().to_string());
                }
            }
            None => {}
        }
        files
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Produces the audio and visual assets for one scene, idempotently.
///
/// Assets are keyed by the stable scene id, so a retried run skips anything
/// already on disk. Visual generation tries the video tier first and degrades
/// to a still image; provider errors in either tier are logged and absorbed
/// here, never escalated. Only storage failures propagate.
pub async fn ensure_scene_assets(
    generators: &Generators,
    project_dir: &Path,
    scene: &Scene,
    memory: &Memory,
    cancel: &CancellationToken,
    log_prefix: &str,
) -> Result<SceneOutcome> {
    tokio::fs::create_dir_all(project_dir).await?;

    // Audio tier.
    let audio = audio_path(project_dir, scene.id);
    let audio = if file_exists(&audio).await {
        info!("{}audio already present: {}", log_prefix, audio.display());
        Some(audio)
    } else {
        match generators.audio.generate(&scene.voiceover, &audio).await {
            Ok(()) => Some(audio),
            Err(e) => {
                warn!("{}audio generation failed: {:#}", log_prefix, e);
                None
            }
        }
    };

    // Visual tiers: an existing clip short-circuits everything.
    let video = video_path(project_dir, scene.id);
    if file_exists(&video).await {
        info!("{}clip already present: {}", log_prefix, video.display());
        return Ok(SceneOutcome {
            scene_id: scene.id,
            audio,
            visual: Some(SceneVisual::Clip(video)),
        });
    }

    let prompt = apply_context(&scene.visual_prompt, memory);
    if prompt != scene.visual_prompt {
        info!("{}memory context injected into prompt", log_prefix);
    }

    match generators.video.generate(&prompt, &video, cancel).await {
        Ok(()) => {
            return Ok(SceneOutcome {
                scene_id: scene.id,
                audio,
                visual: Some(SceneVisual::Clip(video)),
            });
        }
        Err(e) => warn!("{}video tier failed: {:#}", log_prefix, e),
    }

    let image = image_path(project_dir, scene.id);
    match generators.image.generate(&prompt, &image).await {
        Ok(()) => {
            info!("{}covered by still image fallback", log_prefix);
            Ok(SceneOutcome {
                scene_id: scene.id,
                audio,
                visual: Some(SceneVisual::Still(image)),
            })
        }
        Err(e) => {
            warn!(
                "{}image tier failed too; scene {} has no visual: {:#}",
                log_prefix, scene.id, e
            );
            Ok(SceneOutcome {
                scene_id: scene.id,
                audio,
                visual: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{temp_dir, MockGenerators};
    use engine::script::Scene;

    fn scene(id: i64) -> Scene {
        Scene {
            id,
            voiceover: "narration text".to_string(),
            visual_prompt: "a quiet street".to_string(),
            duration: 5.0,
        }
    }

    #[tokio::test]
    async fn generates_audio_and_video_when_missing() {
        let dir = temp_dir("pipeline");
        let mocks = MockGenerators::new();
        let outcome = ensure_scene_assets(
            &mocks.generators(),
            &dir,
            &scene(1),
            &Memory::default(),
            &CancellationToken::new(),
            "",
        )
        .await
        .unwrap();

        assert!(outcome.audio.is_some());
        assert!(matches!(outcome.visual, Some(SceneVisual::Clip(_))));
        assert_eq!(mocks.audio_calls(), 1);
        assert_eq!(mocks.video_calls(), 1);
        assert_eq!(mocks.image_calls(), 0);
        assert!(video_path(&dir, 1).is_file());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn existing_assets_skip_all_generation() {
        let dir = temp_dir("pipeline");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(audio_path(&dir, 1), b"mp3").unwrap();
        std::fs::write(video_path(&dir, 1), b"mp4").unwrap();

        let mocks = MockGenerators::new();
        let outcome = ensure_scene_assets(
            &mocks.generators(),
            &dir,
            &scene(1),
            &Memory::default(),
            &CancellationToken::new(),
            "",
        )
        .await
        .unwrap();

        assert_eq!(mocks.audio_calls(), 0);
        assert_eq!(mocks.video_calls(), 0);
        assert_eq!(mocks.image_calls(), 0);
        assert!(outcome.audio.is_some());
        assert!(matches!(outcome.visual, Some(SceneVisual::Clip(_))));
        // Untouched, byte for byte.
        assert_eq!(std::fs::read(video_path(&dir, 1)).unwrap(), b"mp4");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn video_failure_falls_back_to_image() {
        let dir = temp_dir("pipeline");
        let mocks = MockGenerators::new();
        mocks.fail_video_for(&[1]);

        let outcome = ensure_scene_assets(
            &mocks.generators(),
            &dir,
            &scene(1),
            &Memory::default(),
            &CancellationToken::new(),
            "",
        )
        .await
        .unwrap();

        assert!(matches!(outcome.visual, Some(SceneVisual::Still(_))));
        assert_eq!(mocks.video_calls(), 1);
        assert_eq!(mocks.image_calls(), 1);
        assert!(image_path(&dir, 1).is_file());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn both_tiers_failing_is_not_an_error() {
        let dir = temp_dir("pipeline");
        let mocks = MockGenerators::new();
        mocks.fail_video_for(&[1]);
        mocks.fail_image_for(&[1]);

        let outcome = ensure_scene_assets(
            &mocks.generators(),
            &dir,
            &scene(1),
            &Memory::default(),
            &CancellationToken::new(),
            "",
        )
        .await
        .unwrap();

        assert!(outcome.visual.is_none());
        assert!(outcome.audio.is_some());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn memory_context_reaches_the_video_prompt() {
        let dir = temp_dir("pipeline");
        let mocks = MockGenerators::new();

        let mut memory = Memory::default();
        memory.visual_style = "watercolor".to_string();

        let mut s = scene(1);
        s.visual_prompt = "the Professor at a desk".to_string();
        memory.characters.insert(
            "Professor".to_string(),
            "an elderly owl with glasses".to_string(),
        );

        ensure_scene_assets(
            &mocks.generators(),
            &dir,
            &s,
            &memory,
            &CancellationToken::new(),
            "",
        )
        .await
        .unwrap();

        let prompt = mocks.last_video_prompt();
        assert!(prompt.contains("-- Character Detail: Professor is an elderly owl with glasses."));
        assert!(prompt.ends_with("-- Visual Style: watercolor."));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn asset_files_lists_relative_names() {
        let outcome = SceneOutcome {
            scene_id: 2,
            audio: Some(PathBuf::from("/tmp/p/scene_2.mp3")),
            visual: Some(SceneVisual::Still(PathBuf::from("/tmp/p/scene_2.png"))),
        };
        assert_eq!(
            outcome.asset_files(),
            vec!["scene_2.mp3".to_string(), "scene_2.png".to_string()]
        );
    }
}
