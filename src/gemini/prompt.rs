use crate::models::{
    Character, Content, GenerateContentRequest, GenerationConfig, GenerationSettings, Part,
};

const CONTEXT_HEADER: &str = "Here are the reference characters for this generation:";
const CONSISTENCY_INSTRUCTION: &str = concat!(
    "Maintain strict consistency with these reference characters' ",
    "facial features and clothing styles."
);
const QUALITY_INSTRUCTION: &str = "High quality, 4K resolution, detailed, distinct visual style.";

/// Assemble the multi-part request for one scene.
///
/// Parts are ordered as the model expects them: one inline image per active
/// character (in registry order), then a single trailing text part whose
/// numbered references line up with those images.
pub fn build_request(
    prompt: &str,
    characters: &[Character],
    settings: &GenerationSettings,
) -> GenerateContentRequest {
    let active: Vec<&Character> = characters.iter().filter(|c| c.is_active()).collect();

    let mut parts = Vec::with_capacity(active.len() + 1);
    for character in &active {
        if let Some(image) = &character.image {
            parts.push(Part::image(image.mime_type.clone(), image.data.clone()));
        }
    }

    let text = compose_text(prompt, &active, settings);
    parts.push(Part::text(text));

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig::image_only(),
    }
}

fn compose_text(prompt: &str, active: &[&Character], settings: &GenerationSettings) -> String {
    let mut text = character_context(active);

    text.push_str("SCENE DESCRIPTION:\n");
    text.push_str(prompt);
    text.push_str("\n\nSTYLE & TECHNICAL:\n");
    if let Some(ratio) = ratio_instruction(settings) {
        text.push_str(&ratio);
        text.push('\n');
    }
    text.push_str(QUALITY_INSTRUCTION);
    text
}

fn character_context(active: &[&Character]) -> String {
    if active.is_empty() {
        return String::new();
    }

    let mut context = format!("{}\n", CONTEXT_HEADER);
    for (index, character) in active.iter().enumerate() {
        context.push_str(&format!(
            "[Reference Image {}] is named \"{}\". ",
            index + 1,
            character.name
        ));
    }
    context.push_str(&format!("\n{}\n\n", CONSISTENCY_INSTRUCTION));
    context
}

pub fn ratio_instruction(settings: &GenerationSettings) -> Option<String> {
    settings
        .resolved_ratio()
        .map(|ratio| format!("Generate the image with an aspect ratio of {}.", ratio))
}
