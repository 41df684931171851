use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: i64,
    pub voiceover: String,
    pub visual_prompt: String,
    /// Advisory estimate from the script writer, in seconds. Final segment
    /// durations come from the planner, not from this.
    #[serde(default)]
    pub duration: f64,
}

/// Persisted style/character context reused across a project's prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Memory {
    #[serde(default)]
    pub visual_style: String,
    #[serde(default)]
    pub characters: BTreeMap<String, String>,
    #[serde(default)]
    pub narrative_tone: String,
}

impl Memory {
    pub fn is_empty(&self) -> bool {
        self.visual_style.is_empty() && self.characters.is_empty()
    }
}

impl Script {
    /// Checks a script is usable for generation. Applied to user edits at the
    /// API boundary and to generated scripts before asset work starts.
    pub fn validate(&self) -> Result<(), String> {
        if self.scenes.is_empty() {
            return Err("script must contain at least one scene".to_string());
        }

        let mut seen = HashSet::new();
        for scene in &self.scenes {
            if !seen.insert(scene.id) {
                return Err(format!("duplicate scene id {}", scene.id));
            }
            if scene.voiceover.trim().is_empty() {
                return Err(format!("scene {} has empty voiceover", scene.id));
            }
            if scene.visual_prompt.trim().is_empty() {
                return Err(format!("scene {} has empty visual prompt", scene.id));
            }
        }

        Ok(())
    }
}
