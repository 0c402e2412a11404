use std::time::Duration;

use async_trait::async_trait;
use control_plane::UpstreamSettings;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::KernelError;

const MESSAGES_PATH: &str = "/v1/messages";
const DEFAULT_USER_AGENT: &str = "chitty-trace-kernel";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRequest {
    #[serde(skip)]
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub prompt: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// The external language-model provider. Handlers hand it a prompt and get
/// text back.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, KernelError>;
}

#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub anthropic_version: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl AnthropicConfig {
    pub fn from_settings(settings: &UpstreamSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            anthropic_version: settings.anthropic_version.clone(),
            timeout_ms: settings.timeout_ms,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self::from_settings(&UpstreamSettings::default())
    }
}

#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    config: AnthropicConfig,
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [MessageParam<'a>; 1],
}

#[derive(Serialize)]
struct MessageParam<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: TokenUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            MESSAGES_PATH
        )
    }

    fn headers(&self, api_key: &str) -> Result<HeaderMap, KernelError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| KernelError::BadRequest("api key is not a valid header value".to_string()))?;
        headers.insert("x-api-key", key);
        if let Ok(version) = HeaderValue::from_str(&self.config.anthropic_version) {
            headers.insert("anthropic-version", version);
        }
        if let Ok(agent) = HeaderValue::from_str(&self.config.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        Ok(headers)
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, KernelError> {
        let body = MessagesBody {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: [MessageParam {
                role: "user",
                content: &request.prompt,
            }],
        };
        debug!(model = %request.model, "language model request");
        let response = self
            .client
            .post(self.endpoint())
            .headers(self.headers(&request.api_key)?)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "language model unreachable");
                KernelError::Upstream(err.to_string())
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| KernelError::Upstream(err.to_string()))?;
        if !status.is_success() {
            let message = upstream_error_message(&bytes)
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            warn!(status = status.as_u16(), error = %message, "language model rejected request");
            return Err(KernelError::Upstream(format!(
                "upstream status {}: {}",
                status.as_u16(),
                message
            )));
        }

        let parsed: MessagesResponse = serde_json::from_slice(&bytes)
            .map_err(|err| KernelError::Upstream(format!("invalid upstream response: {err}")))?;
        let text = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| KernelError::Upstream("upstream response has no text".to_string()))?;
        Ok(Completion {
            text,
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            usage: parsed.usage,
        })
    }
}

fn upstream_error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
