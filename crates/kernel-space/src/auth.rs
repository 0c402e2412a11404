use std::sync::Arc;

use control_plane::{now_rfc3339, rfc3339_after_secs};
use kernel::Core;
use microkernel::AuthVerdict;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{analytics_service, auth_service, storage_service, HelperError};

pub const DEFAULT_TEMP_ACCESS_SECS: u64 = 3600;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TemporaryAccess {
    pub token: String,
    pub expires: u64,
}

pub struct AuthTokenIssuer {
    core: Arc<Core>,
}

impl AuthTokenIssuer {
    pub fn new(core: Arc<Core>) -> Self {
        Self { core }
    }

    /// Delegates to the `auth` capability; `None` when it is not enabled.
    pub fn validate_api_key(&self, api_key: &str) -> Result<Option<AuthVerdict>, HelperError> {
        let Some(auth) = auth_service(&self.core)? else {
            return Ok(None);
        };
        let verdict = auth.authenticate(api_key);
        if let (true, Some(user)) = (verdict.valid, verdict.user.as_ref()) {
            if let Some(analytics) = analytics_service(&self.core)? {
                analytics.track(
                    "auth_success",
                    json!({ "userId": user.id, "timestamp": now_rfc3339() }),
                );
            }
        }
        Ok(Some(verdict))
    }

    pub fn create_temporary_access(
        &self,
        purpose: &str,
        duration_secs: u64,
    ) -> Result<TemporaryAccess, HelperError> {
        let token = format!("temp-{}", Uuid::new_v4().simple());
        if let Some(storage) = storage_service(&self.core)? {
            storage.put(
                &format!("temp-token-{token}"),
                json!({
                    "purpose": purpose,
                    "created": now_rfc3339(),
                    "expires": rfc3339_after_secs(duration_secs),
                }),
            );
        }
        info!(purpose = %purpose, expires = duration_secs, "temporary access issued");
        Ok(TemporaryAccess {
            token,
            expires: duration_secs,
        })
    }
}
