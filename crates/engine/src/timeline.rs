use serde::{Deserialize, Serialize};

pub const TICKS_PER_SECOND: i64 = 48000;

/// Hold time for a still or placeholder with no narration attached.
pub const DEFAULT_STILL_TICKS: i64 = 5 * TICKS_PER_SECOND;

pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds * TICKS_PER_SECOND as f64).round() as i64
}

/// What the render probe found on disk for one scene.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneAssets {
    pub video: Option<ProbedMedia>,
    pub image: Option<String>,
    pub audio: Option<ProbedMedia>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbedMedia {
    pub path: String,
    pub duration_ticks: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VisualSource {
    Clip { path: String, native_ticks: i64 },
    Still { path: String },
    /// Fixed-color frame carrying an on-screen notice that generation failed.
    Placeholder { label: String },
}

/// How the visual's duration was reconciled against the narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationFit {
    /// Clip shorter than narration, repeated seamlessly to audio length.
    Looped,
    /// Clip at least as long as narration, cut to audio length.
    Trimmed,
    /// Still or placeholder held for exactly the narration length.
    AudioExact,
    /// Clip with no narration, held for its own native length.
    NativeClip,
    /// Still or placeholder with no narration, held for the fixed default.
    StillDefault,
}

/// One finalized unit of the output timeline, ready for rendering and
/// concatenation in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSegment {
    pub scene_id: i64,
    pub visual: VisualSource,
    pub audio: Option<String>,
    pub duration_ticks: i64,
    pub fit: DurationFit,
}
