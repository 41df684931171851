use crate::script::Memory;

/// Rewrites a scene prompt to include the visual style and character
/// descriptions held in project memory.
///
/// Character descriptions are appended for every character whose name occurs
/// in the prompt (case-insensitive), unless the description text is already
/// present. The visual style clause always goes last. Pure and deterministic:
/// `Memory::characters` is a BTreeMap, so clause order is stable.
pub fn apply_context(prompt: &str, memory: &Memory) -> String {
    if memory.is_empty() {
        return prompt.to_string();
    }

    let mut enhanced = prompt.to_string();
    let prompt_lower = prompt.to_lowercase();

    for (name, description) in &memory.characters {
        if name.is_empty() || description.is_empty() {
            continue;
        }
        if !prompt_lower.contains(&name.to_lowercase()) {
            continue;
        }
        if enhanced.contains(description.as_str()) {
            continue;
        }
        enhanced.push_str(&format!(" -- Character Detail: {} is {}.", name, description));
    }

    if !memory.visual_style.is_empty() {
        enhanced.push_str(&format!(" -- Visual Style: {}.", memory.visual_style));
    }

    enhanced
}
