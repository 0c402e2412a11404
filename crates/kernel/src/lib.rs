mod health;
mod inference;
mod model;
mod orchestrator;
mod vector;

pub use orchestrator::{Core, CoreState};
pub use health::{AiHealth, HealthReport, HealthStatus, ServiceHealth, VectorizeStatus};
pub use inference::{InferenceBackend, InferenceOptions, InferenceOutput, PlaceholderInference};
pub use model::{
    AnthropicClient, AnthropicConfig, Completion, CompletionRequest, LanguageModel, TokenUsage,
};
pub use vector::{
    cosine_similarity, embed, SearchHit, SearchOptions, UpsertReceipt, VectorError, VectorRecord,
    VectorStore, DEFAULT_LIMIT, DEFAULT_THRESHOLD, EMBEDDING_DIM,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("core not initialized")]
    NotInitialized,
    #[error("core initialization failed: {0}")]
    InitializationFailed(String),
    #[error("{0} not enabled")]
    CapabilityDisabled(&'static str),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}
