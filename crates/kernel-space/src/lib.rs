mod analytics;
mod auth;
mod email;
mod schema;
mod search;

use std::sync::Arc;

use kernel::{Core, KernelError};
use microkernel::{
    AnalyticsService, AuthService, SchemaError, SchemaService, ServiceInstance, StorageService,
};
use thiserror::Error;

pub use analytics::{AnalyticsSummary, AnalyticsTracker, EventCount, TRACKER_SERVICE};
pub use auth::{AuthTokenIssuer, TemporaryAccess, DEFAULT_TEMP_ACCESS_SECS};
pub use email::{
    DateRange, EmailIngestion, EmailMessage, EmailSource, IngestionReport, StaticMailbox,
};
pub use schema::SchemaValidator;
pub use search::{EnhancedHit, SearchEnrichment, SemanticSearch};

#[derive(Debug, Error)]
pub enum HelperError {
    #[error("{0} not enabled")]
    Disabled(&'static str),
    #[error("email ingestion failed: {0}")]
    Ingestion(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

fn lookup<T>(
    core: &Core,
    name: &str,
    project: fn(&ServiceInstance) -> Option<&Arc<T>>,
) -> Result<Option<Arc<T>>, HelperError> {
    Ok(core.get_service(name)?.and_then(project).cloned())
}

fn analytics_service(core: &Core) -> Result<Option<Arc<AnalyticsService>>, HelperError> {
    lookup(core, "analytics", ServiceInstance::as_analytics)
}

fn storage_service(core: &Core) -> Result<Option<Arc<StorageService>>, HelperError> {
    lookup(core, "storage", ServiceInstance::as_storage)
}

fn auth_service(core: &Core) -> Result<Option<Arc<AuthService>>, HelperError> {
    lookup(core, "auth", ServiceInstance::as_auth)
}

fn schema_service(core: &Core) -> Result<Option<Arc<SchemaService>>, HelperError> {
    lookup(core, "schema", ServiceInstance::as_schema)
}
