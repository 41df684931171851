use crate::script::Script;
use crate::timeline::{
    DurationFit, ProbedMedia, SceneAssets, SceneSegment, VisualSource, DEFAULT_STILL_TICKS,
};

/// Builds the ordered output timeline from a script and whatever assets each
/// scene ended up with. Visual preference per scene: clip > still >
/// placeholder; no scene is ever dropped. The narration track is authoritative
/// for duration, never stretched or cut.
///
/// `assets_for` maps a scene id to its probed assets; scenes absent from the
/// map get a placeholder.
pub fn plan_segments<'a, F>(script: &Script, mut assets_for: F) -> Vec<SceneSegment>
where
    F: FnMut(i64) -> Option<&'a SceneAssets>,
{
    let mut segments = Vec::with_capacity(script.scenes.len());

    for scene in &script.scenes {
        let assets = assets_for(scene.id).cloned().unwrap_or_default();

        let visual = match (&assets.video, &assets.image) {
            (Some(clip), _) => VisualSource::Clip {
                path: clip.path.clone(),
                native_ticks: clip.duration_ticks,
            },
            (None, Some(image)) => VisualSource::Still {
                path: image.clone(),
            },
            (None, None) => VisualSource::Placeholder {
                label: format!("Scene {}: visual generation failed", scene.id),
            },
        };

        let (duration_ticks, fit) = reconcile(&visual, assets.audio.as_ref());

        segments.push(SceneSegment {
            scene_id: scene.id,
            visual,
            audio: assets.audio.map(|a| a.path),
            duration_ticks,
            fit,
        });
    }

    segments
}

fn reconcile(visual: &VisualSource, audio: Option<&ProbedMedia>) -> (i64, DurationFit) {
    match (visual, audio) {
        (VisualSource::Clip { native_ticks, .. }, Some(audio)) => {
            if *native_ticks < audio.duration_ticks {
                (audio.duration_ticks, DurationFit::Looped)
            } else {
                (audio.duration_ticks, DurationFit::Trimmed)
            }
        }
        (VisualSource::Clip { native_ticks, .. }, None) => (*native_ticks, DurationFit::NativeClip),
        (_, Some(audio)) => (audio.duration_ticks, DurationFit::AudioExact),
        (_, None) => (DEFAULT_STILL_TICKS, DurationFit::StillDefault),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Scene;
    use crate::timeline::TICKS_PER_SECOND;
    use std::collections::HashMap;

    fn script_with_ids(ids: &[i64]) -> Script {
        Script {
            title: "test".to_string(),
            scenes: ids
                .iter()
                .map(|id| Scene {
                    id: *id,
                    voiceover: "v".to_string(),
                    visual_prompt: "p".to_string(),
                    duration: 5.0,
                })
                .collect(),
        }
    }

    fn probed(path: &str, seconds: i64) -> ProbedMedia {
        ProbedMedia {
            path: path.to_string(),
            duration_ticks: seconds * TICKS_PER_SECOND,
        }
    }

    fn plan(script: &Script, assets: &HashMap<i64, SceneAssets>) -> Vec<SceneSegment> {
        plan_segments(script, |id| assets.get(&id))
    }

    #[test]
    fn short_clip_loops_to_audio_length() {
        let script = script_with_ids(&[1]);
        let mut assets = HashMap::new();
        assets.insert(
            1,
            SceneAssets {
                video: Some(probed("scene_1.mp4", 3)),
                image: None,
                audio: Some(probed("scene_1.mp3", 7)),
            },
        );

        let segments = plan(&script, &assets);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].duration_ticks, 7 * TICKS_PER_SECOND);
        assert_eq!(segments[0].fit, DurationFit::Looped);
    }

    #[test]
    fn long_clip_trims_to_audio_length() {
        let script = script_with_ids(&[1]);
        let mut assets = HashMap::new();
        assets.insert(
            1,
            SceneAssets {
                video: Some(probed("scene_1.mp4", 10)),
                image: None,
                audio: Some(probed("scene_1.mp3", 4)),
            },
        );

        let segments = plan(&script, &assets);
        assert_eq!(segments[0].duration_ticks, 4 * TICKS_PER_SECOND);
        assert_eq!(segments[0].fit, DurationFit::Trimmed);
    }

    #[test]
    fn equal_durations_count_as_trimmed() {
        let script = script_with_ids(&[1]);
        let mut assets = HashMap::new();
        assets.insert(
            1,
            SceneAssets {
                video: Some(probed("scene_1.mp4", 5)),
                image: None,
                audio: Some(probed("scene_1.mp3", 5)),
            },
        );

        let segments = plan(&script, &assets);
        assert_eq!(segments[0].fit, DurationFit::Trimmed);
    }

    #[test]
    fn still_image_takes_audio_duration() {
        let script = script_with_ids(&[2]);
        let mut assets = HashMap::new();
        assets.insert(
            2,
            SceneAssets {
                video: None,
                image: Some("scene_2.png".to_string()),
                audio: Some(probed("scene_2.mp3", 6)),
            },
        );

        let segments = plan(&script, &assets);
        assert_eq!(segments[0].duration_ticks, 6 * TICKS_PER_SECOND);
        assert_eq!(segments[0].fit, DurationFit::AudioExact);
        assert!(matches!(segments[0].visual, VisualSource::Still { .. }));
    }

    #[test]
    fn missing_assets_become_placeholder_never_dropped() {
        let script = script_with_ids(&[1, 2, 3]);
        let mut assets = HashMap::new();
        assets.insert(
            2,
            SceneAssets {
                video: Some(probed("scene_2.mp4", 5)),
                image: None,
                audio: Some(probed("scene_2.mp3", 5)),
            },
        );

        let segments = plan(&script, &assets);
        assert_eq!(segments.len(), 3);
        assert!(matches!(segments[0].visual, VisualSource::Placeholder { .. }));
        assert_eq!(segments[0].duration_ticks, DEFAULT_STILL_TICKS);
        assert_eq!(segments[0].fit, DurationFit::StillDefault);
        assert!(matches!(segments[2].visual, VisualSource::Placeholder { .. }));
    }

    #[test]
    fn clip_without_audio_keeps_native_duration() {
        let script = script_with_ids(&[1]);
        let mut assets = HashMap::new();
        assets.insert(
            1,
            SceneAssets {
                video: Some(probed("scene_1.mp4", 8)),
                image: None,
                audio: None,
            },
        );

        let segments = plan(&script, &assets);
        assert_eq!(segments[0].duration_ticks, 8 * TICKS_PER_SECOND);
        assert_eq!(segments[0].fit, DurationFit::NativeClip);
    }

    #[test]
    fn video_preferred_over_image() {
        let script = script_with_ids(&[1]);
        let mut assets = HashMap::new();
        assets.insert(
            1,
            SceneAssets {
                video: Some(probed("scene_1.mp4", 5)),
                image: Some("scene_1.png".to_string()),
                audio: None,
            },
        );

        let segments = plan(&script, &assets);
        assert!(matches!(segments[0].visual, VisualSource::Clip { .. }));
    }

    #[test]
    fn segments_follow_scene_order() {
        let script = script_with_ids(&[3, 1, 2]);
        let assets = HashMap::new();

        let segments = plan(&script, &assets);
        let ids: Vec<i64> = segments.iter().map(|s| s.scene_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
