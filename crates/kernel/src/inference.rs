use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::KernelError;

const PROMPT_PREVIEW_CHARS: usize = 100;
const PLACEHOLDER_TOKEN_OVERHEAD: u64 = 50;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct InferenceOptions {
    pub model: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InferenceOutput {
    pub text: String,
    pub model: String,
    pub tokens: u64,
}

/// The managed AI binding: a payload goes in, a result object comes out.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &InferenceOptions,
    ) -> Result<InferenceOutput, KernelError>;
}

/// Stand-in used when no managed binding is wired. Echoes a prompt preview.
pub struct PlaceholderInference {
    default_model: String,
}

impl PlaceholderInference {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
        }
    }
}

#[async_trait]
impl InferenceBackend for PlaceholderInference {
    async fn generate(
        &self,
        prompt: &str,
        options: &InferenceOptions,
    ) -> Result<InferenceOutput, KernelError> {
        let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        Ok(InferenceOutput {
            text: format!("AI response to: {preview}..."),
            model: options
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            tokens: prompt.chars().count() as u64 + PLACEHOLDER_TOKEN_OVERHEAD,
        })
    }
}
