mod openai;

use async_trait::async_trait;

use crate::prompt::PromptPayload;

pub use openai::OpenAiVisionModel;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Request to model failed: {0}")]
    Transport(String),
    #[error("Model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Model returned an empty response")]
    EmptyResponse,
    #[error("Model request timed out")]
    Timeout,
}

/// The external multimodal model: prompt and image in, raw reply text out.
#[async_trait]
pub trait VisionModel: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, prompt: &PromptPayload) -> Result<String, ModelError>;
}
