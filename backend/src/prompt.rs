use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use shared::{Category, MAX_CONFIDENCE};

use crate::intake::NormalizedImage;

/// Bumped whenever the instruction text or the expected response layout changes.
pub const SCHEMA_VERSION: u32 = 1;

const INSTRUCTION: &str = "Please classify this image for brand safety:";

/// Everything sent to the vision model for one image.
#[derive(Debug, Clone)]
pub struct PromptPayload {
    pub system: String,
    pub instruction: String,
    pub image_data_url: String,
}

pub fn build_prompt(image: &NormalizedImage) -> PromptPayload {
    PromptPayload {
        system: system_prompt(),
        instruction: INSTRUCTION.to_string(),
        image_data_url: format!(
            "data:{};base64,{}",
            image.mime_type(),
            STANDARD.encode(&image.jpeg)
        ),
    }
}

pub fn system_prompt() -> String {
    let categories: String = Category::ALL
        .iter()
        .enumerate()
        .map(|(i, category)| {
            format!(
                "{}. {} ({}): {}\n",
                i + 1,
                category.label(),
                category.as_ref(),
                category.description()
            )
        })
        .collect();

    let template = Category::ALL
        .iter()
        .map(|category| {
            format!(
                "  \"{}\": {{\"rating\": \"<low|medium|high>\", \"confidence\": <0-{}>, \"explanation\": \"<text>\"}}",
                category.as_ref(),
                MAX_CONFIDENCE
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "You are an expert in brand safety analysis for digital advertising. \
         Analyze the provided image and classify it according to the following brand safety \
         categories based on the IAB and GARM frameworks:\n\n\
         {categories}\n\
         For each category, provide:\n\
         - \"rating\": one of \"low\", \"medium\" or \"high\"\n\
         - \"confidence\": an integer from 0 to {max}\n\
         - \"explanation\": a brief, non-empty explanation of the rating and confidence\n\n\
         Respond with a single JSON object and nothing else, using exactly these keys:\n\
         {{\n{template}\n}}\n",
        max = MAX_CONFIDENCE
    )
}
