use anyhow::Result;
use async_trait::async_trait;
use engine::script::{Scene, Script};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::generators::{
    AudioGenerator, Generators, ImageGenerator, ScriptGenerator, VideoGenerator,
};
use crate::render::RenderBackend;

pub fn temp_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-test-{}", prefix, uuid::Uuid::new_v4()))
}

pub fn two_scene_script() -> Script {
    Script {
        title: "A short history of coffee".to_string(),
        scenes: vec![
            Scene {
                id: 1,
                voiceover: "Coffee began in Ethiopia.".to_string(),
                visual_prompt: "An Ethiopian hillside with coffee plants".to_string(),
                duration: 5.0,
            },
            Scene {
                id: 2,
                voiceover: "Today it fuels the world.".to_string(),
                visual_prompt: "A busy modern cafe".to_string(),
                duration: 5.0,
            },
        ],
    }
}

fn scene_id_of(path: &Path) -> Option<i64> {
    path.file_stem()?
        .to_str()?
        .strip_prefix("scene_")?
        .parse()
        .ok()
}

async fn write_stub(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[derive(Default)]
struct MockState {
    script: Mutex<Option<Script>>,
    script_calls: AtomicUsize,
    audio_calls: AtomicUsize,
    video_calls: AtomicUsize,
    image_calls: AtomicUsize,
    fail_audio: Mutex<bool>,
    fail_video: Mutex<HashSet<i64>>,
    fail_image: Mutex<HashSet<i64>>,
    last_video_prompt: Mutex<String>,
}

/// Scriptable generator doubles with call counting. Failure sets are keyed by
/// scene id, parsed from the output file name.
#[derive(Clone)]
pub struct MockGenerators {
    state: Arc<MockState>,
}

impl MockGenerators {
    pub fn new() -> Self {
        let state = MockState {
            script: Mutex::new(Some(two_scene_script())),
            ..Default::default()
        };
        MockGenerators {
            state: Arc::new(state),
        }
    }

    pub fn generators(&self) -> Generators {
        Generators {
            script: Arc::new(MockScript(self.state.clone())),
            audio: Arc::new(MockAudio(self.state.clone())),
            image: Arc::new(MockImage(self.state.clone())),
            video: Arc::new(MockVideo(self.state.clone())),
        }
    }

    pub fn set_script(&self, script: Script) {
        *self.state.script.lock().unwrap() = Some(script);
    }

    pub fn fail_script(&self) {
        *self.state.script.lock().unwrap() = None;
    }

    pub fn fail_audio(&self) {
        *self.state.fail_audio.lock().unwrap() = true;
    }

    pub fn fail_video_for(&self, ids: &[i64]) {
        self.state.fail_video.lock().unwrap().extend(ids);
    }

    pub fn fail_image_for(&self, ids: &[i64]) {
        self.state.fail_image.lock().unwrap().extend(ids);
    }

    pub fn script_calls(&self) -> usize {
        self.state.script_calls.load(Ordering::SeqCst)
    }

    pub fn audio_calls(&self) -> usize {
        self.state.audio_calls.load(Ordering::SeqCst)
    }

    pub fn video_calls(&self) -> usize {
        self.state.video_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.state.image_calls.load(Ordering::SeqCst)
    }

    pub fn last_video_prompt(&self) -> String {
        self.state.last_video_prompt.lock().unwrap().clone()
    }
}

struct MockScript(Arc<MockState>);

#[async_trait]
impl ScriptGenerator for MockScript {
    async fn generate(&self, _topic: &str) -> Result<Script> {
        self.0.script_calls.fetch_add(1, Ordering::SeqCst);
        self.0
            .script
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("mock script generator failure"))
    }
}

struct MockAudio(Arc<MockState>);

#[async_trait]
impl AudioGenerator for MockAudio {
    async fn generate(&self, _text: &str, output: &Path) -> Result<()> {
        self.0.audio_calls.fetch_add(1, Ordering::SeqCst);
        if *self.0.fail_audio.lock().unwrap() {
            anyhow::bail!("mock audio failure");
        }
        write_stub(output, b"mock-mp3").await
    }
}

struct MockImage(Arc<MockState>);

#[async_trait]
impl ImageGenerator for MockImage {
    async fn generate(&self, _prompt: &str, output: &Path) -> Result<()> {
        self.0.image_calls.fetch_add(1, Ordering::SeqCst);
        let id = scene_id_of(output).unwrap_or(-1);
        if self.0.fail_image.lock().unwrap().contains(&id) {
            anyhow::bail!("mock image failure for scene {}", id);
        }
        write_stub(output, b"mock-png").await
    }
}

struct MockVideo(Arc<MockState>);

#[async_trait]
impl VideoGenerator for MockVideo {
    async fn generate(
        &self,
        prompt: &str,
        output: &Path,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.0.video_calls.fetch_add(1, Ordering::SeqCst);
        *self.0.last_video_prompt.lock().unwrap() = prompt.to_string();
        let id = scene_id_of(output).unwrap_or(-1);
        if self.0.fail_video.lock().unwrap().contains(&id) {
            anyhow::bail!("mock video failure for scene {}", id);
        }
        write_stub(output, b"mock-mp4").await
    }

    async fn generate_image_seeded(
        &self,
        prompt: &str,
        output: &Path,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.0.video_calls.fetch_add(1, Ordering::SeqCst);
        *self.0.last_video_prompt.lock().unwrap() = prompt.to_string();
        if self.0.fail_video.lock().unwrap().contains(&0) {
            anyhow::bail!("mock image-seeded failure");
        }
        write_stub(output, b"mock-final-mp4").await
    }
}

/// Render double: succeeds by writing a stub output, or fails with a fixed
/// message.
pub struct MockRenderer {
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
}

impl MockRenderer {
    pub fn ok() -> Self {
        MockRenderer {
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        MockRenderer {
            fail_with: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RenderBackend for MockRenderer {
    async fn render(&self, _script: &Script, _assets_dir: &Path, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{}", message.clone());
        }
        write_stub(output, b"mock-final").await
    }
}
