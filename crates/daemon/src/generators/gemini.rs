use anyhow::{Context, Result};
use async_trait::async_trait;
use engine::script::Script;
use tracing::info;

use super::ScriptGenerator;

pub const GENERATIVE_LANGUAGE_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const SCRIPT_MODEL: &str = "gemini-2.0-flash";

/// Script writer backed by the Gemini `generateContent` endpoint. The model
/// is asked for raw JSON; stray markdown fences are stripped before parsing.
pub struct GeminiScriptWriter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiScriptWriter {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        GeminiScriptWriter {
            client,
            api_key,
            base_url: GENERATIVE_LANGUAGE_BASE.to_string(),
        }
    }

    fn script_prompt(topic: &str) -> String {
        format!(
            "You are an expert video producer. Create a script for a short 30-60 second \
             explainer video about: \"{}\".\n\
             Output strictly valid JSON with this structure:\n\
             {{\"title\": \"Video Title\", \"scenes\": [{{\"id\": 1, \
             \"voiceover\": \"Exact text for the narrator to speak.\", \
             \"visual_prompt\": \"A detailed, high-quality generation prompt for this scene's \
             visual. photorealistic, cinematic lighting.\", \"duration\": 5}}]}}\n\
             Do not add markdown formatting like ```json. Just return the raw JSON.",
            topic
        )
    }
}

/// Removes the markdown code fences some models wrap JSON responses in.
pub fn strip_code_fences(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[async_trait]
impl ScriptGenerator for GeminiScriptWriter {
    async fn generate(&self, topic: &str) -> Result<Script> {
        info!("requesting script for topic: {}", topic);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, SCRIPT_MODEL, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": Self::script_prompt(topic) }] }]
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("script request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("script model returned {}: {}", status, detail);
        }

        let payload: serde_json::Value = response.json().await?;
        let text = payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("script response carried no text"))?;

        let script: Script = serde_json::from_str(strip_code_fences(text))
            .context("script model returned unparseable JSON")?;
        script
            .validate()
            .map_err(|e| anyhow::anyhow!("generated script invalid: {}", e))?;

        info!(
            "script ready: \"{}\" with {} scenes",
            script.title,
            script.scenes.len()
        );
        Ok(script)
    }
}
