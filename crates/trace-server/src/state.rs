use std::path::Path;
use std::sync::Arc;

use control_plane::{ServerSettings, SystemConfig, SystemConfigLoader, UpstreamSettings};
use kernel::{AnthropicClient, AnthropicConfig, Completion, CompletionRequest, Core, LanguageModel};
use kernel_space::{AnalyticsTracker, EmailSource, StaticMailbox};

use crate::error::AppError;

pub struct AppState {
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    pub core: Arc<Core>,
    pub model: Arc<dyn LanguageModel>,
    pub mailbox: Arc<dyn EmailSource>,
}

impl AppState {
    pub fn new(
        server: ServerSettings,
        upstream: UpstreamSettings,
        core: Arc<Core>,
        model: Arc<dyn LanguageModel>,
        mailbox: Arc<dyn EmailSource>,
    ) -> Self {
        Self {
            server,
            upstream,
            core,
            model,
            mailbox,
        }
    }

    /// Builds and initializes the core. A core that fails to initialize
    /// aborts startup.
    pub fn from_config(config: SystemConfig) -> Result<Self, AppError> {
        let mut core = Core::new(config.core);
        core.initialize()?;
        let model = Arc::new(AnthropicClient::new(AnthropicConfig::from_settings(
            &config.upstream,
        )));
        Ok(Self::new(
            config.server,
            config.upstream,
            Arc::new(core),
            model,
            Arc::new(StaticMailbox::sample()),
        ))
    }

    pub async fn complete(&self, api_key: &str, prompt: String) -> Result<Completion, AppError> {
        let request = CompletionRequest {
            api_key: api_key.to_string(),
            model: self.upstream.model.clone(),
            max_tokens: self.upstream.max_tokens,
            temperature: 0.0,
            prompt,
        };
        Ok(self.model.complete(&request).await?)
    }

    pub fn tracker(&self) -> AnalyticsTracker {
        AnalyticsTracker::new(self.core.clone())
    }
}

pub fn load_config(path: &Path) -> Result<SystemConfig, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(SystemConfigLoader::from_str(&raw)?)
}

pub fn create_default_config(path: &Path) -> Result<String, AppError> {
    let content = default_config_template();
    std::fs::write(path, content.as_bytes())?;
    Ok(content)
}

pub fn default_config_template() -> String {
    let lines = [
        "[server]",
        "name = \"ChittyTrace\"",
        "version = \"1.0.0\"",
        "environment = \"production\"",
        "",
        "[upstream]",
        "base_url = \"https://api.anthropic.com\"",
        "model = \"claude-3-5-sonnet-20241022\"",
        "max_tokens = 4096",
        "timeout_ms = 30000",
        "anthropic_version = \"2023-06-01\"",
        "",
        "[services]",
        "analytics = { enabled = true }",
        "storage = { enabled = true }",
        "auth = { enabled = true }",
        "schema = { enabled = true }",
        "email = { enabled = false }",
        "",
        "[ai]",
        "enabled = true",
        "models = [\"claude-3-5-sonnet-20241022\"]",
        "",
        "[ai.vectorize]",
        "enabled = true",
        "",
        "[security.rate_limit]",
        "enabled = true",
        "requests = 100",
        "window_ms = 60000",
    ];
    format!("{}\n", lines.join("\n"))
}
