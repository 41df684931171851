use anyhow::{Context, Result};
use async_trait::async_trait;
use engine::planner::plan_segments;
use engine::render::{concat_command, concat_list, segment_command, RenderCommand};
use engine::script::Script;
use engine::timeline::{seconds_to_ticks, ProbedMedia, SceneAssets, SceneSegment, VisualSource};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::process::Command;
use tracing::{info, warn};

use crate::pipeline::{audio_path, image_path, video_path};

/// Final assembly stage: plans the timeline from on-disk assets and produces
/// the playable file. Behind a trait so orchestrator tests can stub it.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn render(&self, script: &Script, assets_dir: &Path, output: &Path) -> Result<()>;
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: Option<FormatInfo>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

pub struct FfmpegRenderer;

impl FfmpegRenderer {
    /// Media duration in ticks via ffprobe.
    async fn probe_ticks(path: &Path) -> Result<i64> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .await
            .context("failed to execute ffprobe; make sure FFmpeg is installed")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffprobe failed for {}: {}", path.display(), stderr);
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .context("failed to parse ffprobe JSON output")?;
        let seconds = probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);
        if seconds <= 0.0 {
            anyhow::bail!("{} has no measurable duration", path.display());
        }
        Ok(seconds_to_ticks(seconds))
    }

    /// Gathers whatever each scene has on disk. Unreadable media is logged and
    /// treated as absent; assembly covers the gap with a placeholder.
    async fn collect_assets(script: &Script, assets_dir: &Path) -> HashMap<i64, SceneAssets> {
        let mut all = HashMap::new();
        for scene in &script.scenes {
            let mut assets = SceneAssets::default();

            let video = video_path(assets_dir, scene.id);
            if video.is_file() {
                match Self::probe_ticks(&video).await {
                    Ok(ticks) => {
                        assets.video = Some(ProbedMedia {
                            path: video.to_string_lossy().to_string(),
                            duration_ticks: ticks,
                        })
                    }
                    Err(e) => warn!("scene {}: unreadable clip: {:#}", scene.id, e),
                }
            }

            let image = image_path(assets_dir, scene.id);
            if image.is_file() {
                assets.image = Some(image.to_string_lossy().to_string());
            }

            let audio = audio_path(assets_dir, scene.id);
            if audio.is_file() {
                match Self::probe_ticks(&audio).await {
                    Ok(ticks) => {
                        assets.audio = Some(ProbedMedia {
                            path: audio.to_string_lossy().to_string(),
                            duration_ticks: ticks,
                        })
                    }
                    Err(e) => warn!("scene {}: unreadable narration: {:#}", scene.id, e),
                }
            }

            all.insert(scene.id, assets);
        }
        all
    }

    async fn run_ffmpeg(command: &RenderCommand) -> Result<()> {
        let output = Command::new("ffmpeg")
            .args(&command.args)
            .output()
            .await
            .context("failed to execute ffmpeg; make sure FFmpeg is installed")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            anyhow::bail!("ffmpeg failed producing {}: {}", command.output, tail);
        }
        Ok(())
    }
}

/// A segment counts toward the output only if something was actually
/// generated for it; an all-placeholder, all-silent plan assembles nothing.
pub fn has_usable_segment(segments: &[SceneSegment]) -> bool {
    segments.iter().any(|s| {
        s.audio.is_some() || !matches!(s.visual, VisualSource::Placeholder { .. })
    })
}

#[async_trait]
impl RenderBackend for FfmpegRenderer {
    async fn render(&self, script: &Script, assets_dir: &Path, output: &Path) -> Result<()> {
        let assets = Self::collect_assets(script, assets_dir).await;
        let segments = plan_segments(script, |id| assets.get(&id));

        if segments.is_empty() || !has_usable_segment(&segments) {
            anyhow::bail!("no usable segments to assemble");
        }

        info!(
            "rendering {} segments into {}",
            segments.len(),
            output.display()
        );

        let mut segment_outputs = Vec::with_capacity(segments.len());
        for segment in &segments {
            let seg_out = assets_dir.join(format!("seg_{}.mp4", segment.scene_id));
            let seg_out_str = seg_out.to_string_lossy().to_string();
            Self::run_ffmpeg(&segment_command(segment, &seg_out_str)).await?;
            segment_outputs.push(seg_out_str);
        }

        let list_path = assets_dir.join("concat_list.txt");
        tokio::fs::write(&list_path, concat_list(&segment_outputs))
            .await
            .context("failed to write concat list")?;

        Self::run_ffmpeg(&concat_command(
            &list_path.to_string_lossy(),
            &output.to_string_lossy(),
        ))
        .await?;

        if !output.is_file() {
            anyhow::bail!("render produced no output file");
        }
        info!("render complete: {}", output.display());
        Ok(())
    }
}
