use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use std::path::Path;
use tracing::info;

use super::gemini::GENERATIVE_LANGUAGE_BASE;
use super::ImageGenerator;

const IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// Still-image generation via the Imagen `:predict` endpoint. The image comes
/// back base64-encoded inside the prediction payload.
pub struct ImagenClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ImagenClient {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        ImagenClient {
            client,
            api_key,
            base_url: GENERATIVE_LANGUAGE_BASE.to_string(),
        }
    }
}

#[async_trait]
impl ImageGenerator for ImagenClient {
    async fn generate(&self, prompt: &str, output: &Path) -> Result<()> {
        info!("generating image: {:.40}...", prompt);

        let url = format!(
            "{}/models/{}:predict?key={}",
            self.base_url, IMAGE_MODEL, self.api_key
        );
        let body = serde_json::json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1 }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("image request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("image model returned {}: {}", status, detail);
        }

        let payload: serde_json::Value = response.json().await?;
        let encoded = payload
            .pointer("/predictions/0/bytesBase64Encoded")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("image response carried no image bytes"))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .context("image payload was not valid base64")?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &bytes)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;

        info!("image written: {} ({} bytes)", output.display(), bytes.len());
        Ok(())
    }
}
