mod registry;
mod schema;
mod services;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

pub use registry::{
    create_service, Capability, RegistryError, ServiceContext, ServiceFactory, ServiceInstance,
    ServiceKind, ServiceRegistry, SERVICE_TABLE,
};
pub use schema::{
    SchemaError, SchemaService, ValidationOutcome, COOK_COUNTY_EXHIBIT, FINANCIAL_DOCUMENT,
};
pub use services::{
    AnalyticsEvent, AnalyticsService, AuthService, AuthVerdict, CacheReceipt, CdnService,
    ComputeJob, ComputeReceipt, ComputeService, DeleteReceipt, DeliveryReceipt, DnsAnswer,
    DnsService, EmailService, IdentityService, MessagingService, OutboundMessage, StorageService,
    StoredReceipt, TrackReceipt, VerifiedUser,
};

#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub payload: Value,
}

pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
}

/// Fan-out channel the services publish on instead of holding a reference to
/// the orchestrator.
pub struct EventBus {
    handlers: Mutex<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn subscribe(&self, name: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .lock()
            .entry(name.to_string())
            .or_default()
            .push(handler);
    }

    pub fn publish(&self, event: Event) {
        let handlers = self
            .handlers
            .lock()
            .get(&event.name)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler.handle(&event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
