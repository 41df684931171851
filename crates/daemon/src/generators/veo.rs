use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::gemini::GENERATIVE_LANGUAGE_BASE;
use super::VideoGenerator;

/// Ordered fallback chain; first model that delivers an artifact wins.
const VIDEO_MODELS: &[&str] = &["veo-3.1-generate-preview", "veo-2.0-generate-001"];
const SEED_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const MAX_POLLS: u32 = 60;

/// Video clip generation via the Veo long-running-operation pattern: submit a
/// `:predictLongRunning` request, poll the returned operation at a fixed
/// interval, then download the finished file. Callers see one blocking call.
pub struct VeoClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl VeoClient {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        VeoClient {
            client,
            api_key,
            base_url: GENERATIVE_LANGUAGE_BASE.to_string(),
        }
    }

    async fn submit(&self, model: &str, instance: serde_json::Value) -> Result<String> {
        let url = format!(
            "{}/models/{}:predictLongRunning?key={}",
            self.base_url, model, self.api_key
        );
        let body = serde_json::json!({
            "instances": [instance],
            "parameters": { "sampleCount": 1 }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("video submit failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", model, status, detail);
        }

        let payload: serde_json::Value = response.json().await?;
        payload
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("submit response carried no operation name"))
    }

    async fn poll_until_done(
        &self,
        operation: &str,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value> {
        for _ in 0..MAX_POLLS {
            if cancel.is_cancelled() {
                anyhow::bail!("generation cancelled");
            }
            tokio::time::sleep(POLL_INTERVAL).await;

            let url = format!("{}/{}?key={}", self.base_url, operation, self.api_key);
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .context("operation poll failed")?;
            if !response.status().is_success() {
                anyhow::bail!("operation poll returned {}", response.status());
            }

            let payload: serde_json::Value = response.json().await?;
            if payload.get("done").and_then(|v| v.as_bool()) == Some(true) {
                if let Some(error) = payload.get("error") {
                    anyhow::bail!("operation failed: {}", error);
                }
                return Ok(payload);
            }
        }
        anyhow::bail!("operation {} did not finish in time", operation)
    }

    fn extract_video_uri(payload: &serde_json::Value) -> Option<&str> {
        payload
            .pointer("/response/generateVideoResponse/generatedSamples/0/video/uri")
            .or_else(|| payload.pointer("/response/generatedVideos/0/video/uri"))
            .and_then(|v| v.as_str())
    }

    async fn download(&self, uri: &str, output: &Path) -> Result<()> {
        let sep = if uri.contains('?') { '&' } else { '?' };
        let url = format!("{}{}key={}", uri, sep, self.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("video download failed")?;
        if !response.status().is_success() {
            anyhow::bail!("video download returned {}", response.status());
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            anyhow::bail!("video download was empty");
        }
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &bytes)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;
        Ok(())
    }

    async fn run_one(
        &self,
        model: &str,
        instance: serde_json::Value,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let operation = self.submit(model, instance).await?;
        info!("{}: operation started: {}", model, operation);

        let payload = self.poll_until_done(&operation, cancel).await?;
        let uri = Self::extract_video_uri(&payload)
            .ok_or_else(|| anyhow::anyhow!("operation finished without a video"))?;
        self.download(uri, output).await?;
        info!("{}: clip written to {}", model, output.display());
        Ok(())
    }

    /// Generates a seed still for the prompt, returned base64-encoded for
    /// inlining into the video request.
    async fn generate_seed_image(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:predict?key={}",
            self.base_url, SEED_IMAGE_MODEL, self.api_key
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
            .context("seed image request failed")?;
        if !response.status().is_success() {
            anyhow::bail!("seed image model returned {}", response.status());
        }

        let payload: serde_json::Value = response.json().await?;
        payload
            .pointer("/predictions/0/bytesBase64Encoded")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("seed image response carried no image bytes"))
    }
}

#[async_trait]
impl VideoGenerator for VeoClient {
    async fn generate(
        &self,
        prompt: &str,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for model in VIDEO_MODELS {
            if cancel.is_cancelled() {
                anyhow::bail!("generation cancelled");
            }
            info!("attempting clip with {}: {:.40}...", model, prompt);
            let instance = serde_json::json!({ "prompt": prompt });
            match self.run_one(model, instance, output, cancel).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("{} failed: {:#}", model, e),
            }
        }
        anyhow::bail!("all video models failed")
    }

    async fn generate_image_seeded(
        &self,
        prompt: &str,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!("image-seeded generation, step 1: seed image");
        let seed = self.generate_seed_image(prompt).await?;
        // Round-trip decode catches a corrupt payload before the long wait.
        base64::engine::general_purpose::STANDARD
            .decode(&seed)
            .context("seed image was not valid base64")?;

        info!("image-seeded generation, step 2: video");
        let instance = serde_json::json!({
            "prompt": prompt,
            "image": { "bytesBase64Encoded": seed, "mimeType": "image/png" }
        });
        self.run_one(VIDEO_MODELS[0], instance, output, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_uri_extracted_from_operation_payload() {
        let payload = serde_json::json!({
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        { "video": { "uri": "https://example.test/files/abc:download" } }
                    ]
                }
            }
        });
        assert_eq!(
            VeoClient::extract_video_uri(&payload),
            Some("https://example.test/files/abc:download")
        );
    }

    #[test]
    fn legacy_payload_shape_also_supported() {
        let payload = serde_json::json!({
            "done": true,
            "response": {
                "generatedVideos": [ { "video": { "uri": "https://example.test/v.mp4" } } ]
            }
        });
        assert_eq!(
            VeoClient::extract_video_uri(&payload),
            Some("https://example.test/v.mp4")
        );
    }

    #[test]
    fn missing_video_yields_none() {
        let payload = serde_json::json!({ "done": true, "response": {} });
        assert_eq!(VeoClient::extract_video_uri(&payload), None);
    }
}
