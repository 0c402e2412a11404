pub mod config;
pub mod rate_limit;
pub mod security;
pub mod time;

pub use config::{
    AiConfig, AiOverrides, ConfigError, CoreConfig, CoreConfigOverrides, CorsConfig,
    RateLimitConfig, SecurityConfig, SecurityOverrides, ServerSettings, ServiceConfig,
    ServiceOverride, SystemConfig, SystemConfigLoader, UpstreamSettings, VectorizeConfig,
    DEFAULT_MODEL, KNOWN_SERVICES,
};
pub use rate_limit::{InMemoryRateLimiter, RateLimiter};
pub use security::{
    derive_user_id, extract_bearer_token, AuthResult, BearerAuthority, CorsPolicy,
    SecurityAuthority, SecurityLayer, ALLOW_HEADERS, ALLOW_METHODS, ALLOW_ORIGIN,
};
pub use time::{now_rfc3339, rfc3339_after_secs};
