use anyhow::Result;
use async_trait::async_trait;
use engine::script::Script;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod gemini;
pub mod imagen;
pub mod tts;
pub mod veo;

/// Writes a structured script for a topic, or fails. A failure here is fatal
/// to the run; the orchestrator never substitutes filler content.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, topic: &str) -> Result<Script>;
}

/// Produces a narration audio file for the given text.
#[async_trait]
pub trait AudioGenerator: Send + Sync {
    async fn generate(&self, text: &str, output: &Path) -> Result<()>;
}

/// Produces a still image for the given prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, output: &Path) -> Result<()>;
}

/// Produces a video clip for the given prompt. Implementations own their
/// provider fallback order and long-running-operation polling; callers see a
/// single artifact-or-error outcome.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, output: &Path, cancel: &CancellationToken)
        -> Result<()>;

    /// Two-step variant: generate a seed image for the prompt first, then a
    /// video conditioned on that image.
    async fn generate_image_seeded(
        &self,
        prompt: &str,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// The full set of generation collaborators the orchestrator depends on.
#[derive(Clone)]
pub struct Generators {
    pub script: Arc<dyn ScriptGenerator>,
    pub audio: Arc<dyn AudioGenerator>,
    pub image: Arc<dyn ImageGenerator>,
    pub video: Arc<dyn VideoGenerator>,
}

impl Generators {
    /// Production wiring against the Google generative APIs.
    pub fn google(client: reqwest::Client, api_key: String) -> Self {
        Generators {
            script: Arc::new(gemini::GeminiScriptWriter::new(
                client.clone(),
                api_key.clone(),
            )),
            audio: Arc::new(tts::TranslateTts::new(client.clone())),
            image: Arc::new(imagen::ImagenClient::new(client.clone(), api_key.clone())),
            video: Arc::new(veo::VeoClient::new(client, api_key)),
        }
    }
}
