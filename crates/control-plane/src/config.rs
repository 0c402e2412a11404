use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Capability names the registry ships with. The default configuration
/// seeds each one disabled; registration and health output follow the
/// alphabetical order of `CoreConfig.services`.
pub const KNOWN_SERVICES: &[&str] = &[
    "schema",
    "identity",
    "analytics",
    "storage",
    "compute",
    "messaging",
    "auth",
    "cdn",
    "dns",
    "email",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("invalid config value for {0}: {1}")]
    Invalid(String, String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub enabled: bool,
    pub domain: String,
}

impl ServiceConfig {
    pub fn disabled(name: &str) -> Self {
        Self {
            enabled: false,
            domain: default_domain(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VectorizeConfig {
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    pub vectorize: VectorizeConfig,
    pub models: Vec<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            vectorize: VectorizeConfig::default(),
            models: vec![DEFAULT_MODEL.to_string()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub origins: Vec<String>,
    pub methods: Vec<String>,
    pub headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: vec!["*".to_string()],
            methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|value| value.to_string())
                .collect(),
            headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    #[serde(alias = "windowMs", alias = "window")]
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: 100,
            window_ms: 60_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
}

/// Fully resolved orchestrator configuration. Read-only once the core is
/// initialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub services: BTreeMap<String, ServiceConfig>,
    pub ai: AiConfig,
    pub security: SecurityConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let services = KNOWN_SERVICES
            .iter()
            .map(|name| (name.to_string(), ServiceConfig::disabled(name)))
            .collect();
        Self {
            services,
            ai: AiConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Merges caller overrides onto the defaults. Services merge per name,
    /// `ai` per field and `security` per sub-table.
    pub fn resolve(overrides: CoreConfigOverrides) -> Self {
        let mut config = Self::default();

        for (name, service) in overrides.services {
            let domain = service.domain.unwrap_or_else(|| {
                config
                    .services
                    .get(&name)
                    .map(|existing| existing.domain.clone())
                    .unwrap_or_else(|| default_domain(&name))
            });
            config.services.insert(
                name,
                ServiceConfig {
                    enabled: service.enabled,
                    domain,
                },
            );
        }

        if let Some(ai) = overrides.ai {
            if let Some(enabled) = ai.enabled {
                config.ai.enabled = enabled;
            }
            if let Some(vectorize) = ai.vectorize {
                config.ai.vectorize = vectorize;
            }
            if let Some(models) = ai.models {
                config.ai.models = models;
            }
        }

        if let Some(security) = overrides.security {
            if let Some(cors) = security.cors {
                config.security.cors = cors;
            }
            if let Some(rate_limit) = security.rate_limit {
                config.security.rate_limit = rate_limit;
            }
        }

        config
    }

    pub fn enabled_services(&self) -> impl Iterator<Item = (&str, &ServiceConfig)> {
        self.services
            .iter()
            .filter(|(_, service)| service.enabled)
            .map(|(name, service)| (name.as_str(), service))
    }

    pub fn enable_service(&mut self, name: &str) {
        self.services
            .entry(name.to_string())
            .or_insert_with(|| ServiceConfig::disabled(name))
            .enabled = true;
    }

    /// The vector index is gated on its own flag, independent of `ai.enabled`.
    pub fn vectorize_enabled(&self) -> bool {
        self.ai.vectorize.enabled
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceOverride {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AiOverrides {
    pub enabled: Option<bool>,
    pub vectorize: Option<VectorizeConfig>,
    pub models: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityOverrides {
    pub cors: Option<CorsConfig>,
    #[serde(alias = "rateLimit")]
    pub rate_limit: Option<RateLimitConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfigOverrides {
    #[serde(default)]
    pub services: BTreeMap<String, ServiceOverride>,
    pub ai: Option<AiOverrides>,
    pub security: Option<SecurityOverrides>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub name: String,
    pub version: String,
    pub environment: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: "ChittyTrace".to_string(),
            version: "1.0.0".to_string(),
            environment: "production".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub anthropic_version: String,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            timeout_ms: 30_000,
            anthropic_version: "2023-06-01".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SystemConfig {
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    pub core: CoreConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SystemFile {
    #[serde(default)]
    server: ServerSettings,
    #[serde(default)]
    upstream: UpstreamSettings,
    #[serde(default)]
    services: BTreeMap<String, ServiceOverride>,
    ai: Option<AiOverrides>,
    security: Option<SecurityOverrides>,
}

pub struct SystemConfigLoader;

impl SystemConfigLoader {
    pub fn from_str(input: &str) -> Result<SystemConfig, ConfigError> {
        let file: SystemFile =
            toml::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let core = CoreConfig::resolve(CoreConfigOverrides {
            services: file.services,
            ai: file.ai,
            security: file.security,
        });
        Ok(SystemConfig {
            server: file.server,
            upstream: file.upstream,
            core,
        })
    }
}

fn default_domain(name: &str) -> String {
    format!("{name}.chitty.cc")
}
