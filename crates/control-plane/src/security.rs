use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::config::{ConfigError, CorsConfig, SecurityConfig};
use crate::rate_limit::RateLimiter;

pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
pub const ALLOW_METHODS: &str = "access-control-allow-methods";
pub const ALLOW_HEADERS: &str = "access-control-allow-headers";

const USER_ID_PREFIX_CHARS: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorsPolicy {
    allow_origin: String,
    allow_methods: String,
    allow_headers: String,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            allow_origin: join_header_list("security.cors.origins", &config.origins)?,
            allow_methods: join_header_list("security.cors.methods", &config.methods)?,
            allow_headers: join_header_list("security.cors.headers", &config.headers)?,
        })
    }

    pub fn headers(&self) -> [(&'static str, &str); 3] {
        [
            (ALLOW_ORIGIN, self.allow_origin.as_str()),
            (ALLOW_METHODS, self.allow_methods.as_str()),
            (ALLOW_HEADERS, self.allow_headers.as_str()),
        ]
    }
}

fn join_header_list(key: &str, values: &[String]) -> Result<String, ConfigError> {
    let joined = values.join(", ");
    let legal = joined
        .bytes()
        .all(|byte| byte == b'\t' || (0x20..0x7f).contains(&byte));
    if !legal {
        return Err(ConfigError::Invalid(
            key.to_string(),
            "contains characters not allowed in a header value".to_string(),
        ));
    }
    Ok(joined)
}

/// Outcome of local bearer-token derivation. Lives for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub is_authenticated: bool,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
}

impl AuthResult {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_token(token: &str) -> Self {
        Self {
            is_authenticated: true,
            api_key: Some(token.to_string()),
            user_id: Some(derive_user_id(token)),
        }
    }
}

pub fn derive_user_id(token: &str) -> String {
    let prefix: String = token.chars().take(USER_ID_PREFIX_CHARS).collect();
    format!("user-{prefix}")
}

pub fn extract_bearer_token(authorization: Option<&str>) -> Option<String> {
    let value = authorization?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?;
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub trait SecurityAuthority: Send + Sync {
    fn authenticate(&self, authorization: Option<&str>) -> AuthResult;
}

/// Derives identity from the bearer token alone. Credential verification is
/// left to the `auth` capability.
pub struct BearerAuthority;

impl BearerAuthority {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl SecurityAuthority for BearerAuthority {
    fn authenticate(&self, authorization: Option<&str>) -> AuthResult {
        match extract_bearer_token(authorization) {
            Some(token) => AuthResult::from_token(&token),
            None => AuthResult::anonymous(),
        }
    }
}

/// CORS, admission and authentication applied ahead of every handler.
pub struct SecurityLayer {
    cors: CorsPolicy,
    rate_limiter: Arc<dyn RateLimiter>,
    authority: Arc<dyn SecurityAuthority>,
}

impl SecurityLayer {
    pub fn new(
        config: &SecurityConfig,
        rate_limiter: Arc<dyn RateLimiter>,
        authority: Arc<dyn SecurityAuthority>,
    ) -> Result<Self, ConfigError> {
        let limits = &config.rate_limit;
        if limits.enabled && limits.requests == 0 {
            return Err(ConfigError::Invalid(
                "security.rate_limit.requests".to_string(),
                "must be positive when rate limiting is enabled".to_string(),
            ));
        }
        if limits.enabled && limits.window_ms == 0 {
            return Err(ConfigError::Invalid(
                "security.rate_limit.window_ms".to_string(),
                "must be positive when rate limiting is enabled".to_string(),
            ));
        }

        Ok(Self {
            cors: CorsPolicy::from_config(&config.cors)?,
            rate_limiter,
            authority,
        })
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    pub fn admit(&self, client_id: &str) -> bool {
        let admitted = self.rate_limiter.try_acquire(client_id);
        if !admitted {
            warn!(client_id = %client_id, "rate limit exceeded");
        }
        admitted
    }

    pub fn authenticate(&self, authorization: Option<&str>) -> AuthResult {
        self.authority.authenticate(authorization)
    }
}
