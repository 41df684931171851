use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use super::AudioGenerator;

const TTS_URL: &str = "https://translate.google.com/translate_tts";
// The endpoint rejects long q= values, so narration is sent in chunks and the
// resulting MP3 frames are appended into one file.
const MAX_CHUNK_CHARS: usize = 180;

/// Narration synthesis via the Google Translate TTS endpoint.
pub struct TranslateTts {
    client: reqwest::Client,
}

impl TranslateTts {
    pub fn new(client: reqwest::Client) -> Self {
        TranslateTts { client }
    }
}

/// Splits text into chunks below the endpoint's query limit, breaking on
/// whitespace where possible.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if word.len() > max_chars {
            // A single oversized token gets hard-split.
            for piece in word
                .chars()
                .collect::<Vec<_>>()
                .chunks(max_chars)
                .map(|c| c.iter().collect::<String>())
            {
                chunks.push(piece);
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl AudioGenerator for TranslateTts {
    async fn generate(&self, text: &str, output: &Path) -> Result<()> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            anyhow::bail!("no narration text to synthesize");
        }

        let mut audio = Vec::new();
        for chunk in &chunks {
            let response = self
                .client
                .get(TTS_URL)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", "en"),
                    ("q", chunk.as_str()),
                ])
                .send()
                .await
                .context("tts request failed")?;

            if !response.status().is_success() {
                anyhow::bail!("tts endpoint returned {}", response.status());
            }
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                anyhow::bail!("tts endpoint returned empty audio");
            }
            audio.extend_from_slice(&bytes);
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &audio)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;

        info!(
            "narration written: {} ({} bytes, {} chunks)",
            output.display(),
            audio.len(),
            chunks.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("a short sentence", 180);
        assert_eq!(chunks, vec!["a short sentence".to_string()]);
    }

    #[test]
    fn chunks_respect_limit_and_keep_all_words() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = chunk_text(text, 12);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 12));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn oversized_token_is_hard_split() {
        let chunks = chunk_text(&"x".repeat(25), 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= 10));
    }
}
