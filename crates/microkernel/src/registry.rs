use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use control_plane::{CoreConfig, ServiceConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::schema::SchemaService;
use crate::services::{
    AnalyticsService, AuthService, CdnService, ComputeService, DnsService, EmailService,
    IdentityService, MessagingService, StorageService,
};
use crate::EventBus;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown service type: {0}")]
    UnknownService(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Identity,
    Storage,
    Messaging,
    Analytics,
    Auth,
    Schema,
    Dns,
    Email,
    Cdn,
    Compute,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Identity => "identity",
            ServiceKind::Storage => "storage",
            ServiceKind::Messaging => "messaging",
            ServiceKind::Analytics => "analytics",
            ServiceKind::Auth => "auth",
            ServiceKind::Schema => "schema",
            ServiceKind::Dns => "dns",
            ServiceKind::Email => "email",
            ServiceKind::Cdn => "cdn",
            ServiceKind::Compute => "compute",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = RegistryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ServiceFactory::lookup(name)
            .map(|factory| factory.kind)
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))
    }
}

/// Handles shared by every constructed service.
#[derive(Clone)]
pub struct ServiceContext {
    pub events: Arc<EventBus>,
}

impl ServiceContext {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self { events }
    }
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self::new(EventBus::shared())
    }
}

pub trait Capability: Send + Sync {
    fn kind(&self) -> ServiceKind;
    fn domain(&self) -> &str;

    fn healthy(&self) -> bool {
        true
    }
}

#[derive(Clone)]
pub enum ServiceInstance {
    Identity(Arc<IdentityService>),
    Storage(Arc<StorageService>),
    Messaging(Arc<MessagingService>),
    Analytics(Arc<AnalyticsService>),
    Auth(Arc<AuthService>),
    Schema(Arc<SchemaService>),
    Dns(Arc<DnsService>),
    Email(Arc<EmailService>),
    Cdn(Arc<CdnService>),
    Compute(Arc<ComputeService>),
}

impl ServiceInstance {
    pub fn capability(&self) -> &dyn Capability {
        match self {
            ServiceInstance::Identity(service) => &**service,
            ServiceInstance::Storage(service) => &**service,
            ServiceInstance::Messaging(service) => &**service,
            ServiceInstance::Analytics(service) => &**service,
            ServiceInstance::Auth(service) => &**service,
            ServiceInstance::Schema(service) => &**service,
            ServiceInstance::Dns(service) => &**service,
            ServiceInstance::Email(service) => &**service,
            ServiceInstance::Cdn(service) => &**service,
            ServiceInstance::Compute(service) => &**service,
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.capability().kind()
    }

    pub fn domain(&self) -> &str {
        self.capability().domain()
    }

    pub fn healthy(&self) -> bool {
        self.capability().healthy()
    }

    pub fn as_identity(&self) -> Option<&Arc<IdentityService>> {
        match self {
            ServiceInstance::Identity(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_storage(&self) -> Option<&Arc<StorageService>> {
        match self {
            ServiceInstance::Storage(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_messaging(&self) -> Option<&Arc<MessagingService>> {
        match self {
            ServiceInstance::Messaging(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_analytics(&self) -> Option<&Arc<AnalyticsService>> {
        match self {
            ServiceInstance::Analytics(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_auth(&self) -> Option<&Arc<AuthService>> {
        match self {
            ServiceInstance::Auth(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_schema(&self) -> Option<&Arc<SchemaService>> {
        match self {
            ServiceInstance::Schema(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_dns(&self) -> Option<&Arc<DnsService>> {
        match self {
            ServiceInstance::Dns(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_email(&self) -> Option<&Arc<EmailService>> {
        match self {
            ServiceInstance::Email(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_cdn(&self) -> Option<&Arc<CdnService>> {
        match self {
            ServiceInstance::Cdn(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_compute(&self) -> Option<&Arc<ComputeService>> {
        match self {
            ServiceInstance::Compute(service) => Some(service),
            _ => None,
        }
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("kind", &self.kind())
            .field("domain", &self.domain())
            .finish()
    }
}

pub struct ServiceFactory {
    pub kind: ServiceKind,
    pub names: &'static [&'static str],
    pub build: fn(&ServiceConfig, &ServiceContext) -> ServiceInstance,
}

impl ServiceFactory {
    pub fn lookup(name: &str) -> Option<&'static ServiceFactory> {
        SERVICE_TABLE
            .iter()
            .find(|factory| factory.names.contains(&name))
    }
}

/// One row per capability kind. Adding a capability means adding a row.
pub static SERVICE_TABLE: &[ServiceFactory] = &[
    ServiceFactory {
        kind: ServiceKind::Identity,
        names: &["identity", "id"],
        build: build_identity,
    },
    ServiceFactory {
        kind: ServiceKind::Storage,
        names: &["storage"],
        build: build_storage,
    },
    ServiceFactory {
        kind: ServiceKind::Messaging,
        names: &["messaging"],
        build: build_messaging,
    },
    ServiceFactory {
        kind: ServiceKind::Analytics,
        names: &["analytics"],
        build: build_analytics,
    },
    ServiceFactory {
        kind: ServiceKind::Auth,
        names: &["auth"],
        build: build_auth,
    },
    ServiceFactory {
        kind: ServiceKind::Schema,
        names: &["schema"],
        build: build_schema,
    },
    ServiceFactory {
        kind: ServiceKind::Dns,
        names: &["dns"],
        build: build_dns,
    },
    ServiceFactory {
        kind: ServiceKind::Email,
        names: &["email"],
        build: build_email,
    },
    ServiceFactory {
        kind: ServiceKind::Cdn,
        names: &["cdn"],
        build: build_cdn,
    },
    ServiceFactory {
        kind: ServiceKind::Compute,
        names: &["compute"],
        build: build_compute,
    },
];

fn build_identity(config: &ServiceConfig, _ctx: &ServiceContext) -> ServiceInstance {
    ServiceInstance::Identity(Arc::new(IdentityService::new(&config.domain)))
}

fn build_storage(config: &ServiceConfig, _ctx: &ServiceContext) -> ServiceInstance {
    ServiceInstance::Storage(Arc::new(StorageService::new(&config.domain)))
}

fn build_messaging(config: &ServiceConfig, ctx: &ServiceContext) -> ServiceInstance {
    ServiceInstance::Messaging(Arc::new(MessagingService::new(
        &config.domain,
        ctx.events.clone(),
    )))
}

fn build_analytics(config: &ServiceConfig, ctx: &ServiceContext) -> ServiceInstance {
    ServiceInstance::Analytics(Arc::new(AnalyticsService::new(
        &config.domain,
        ctx.events.clone(),
    )))
}

fn build_auth(config: &ServiceConfig, _ctx: &ServiceContext) -> ServiceInstance {
    ServiceInstance::Auth(Arc::new(AuthService::new(&config.domain)))
}

fn build_schema(config: &ServiceConfig, _ctx: &ServiceContext) -> ServiceInstance {
    ServiceInstance::Schema(Arc::new(SchemaService::new(&config.domain)))
}

fn build_dns(config: &ServiceConfig, _ctx: &ServiceContext) -> ServiceInstance {
    ServiceInstance::Dns(Arc::new(DnsService::new(&config.domain)))
}

fn build_email(config: &ServiceConfig, ctx: &ServiceContext) -> ServiceInstance {
    ServiceInstance::Email(Arc::new(EmailService::new(
        &config.domain,
        ctx.events.clone(),
    )))
}

fn build_cdn(config: &ServiceConfig, _ctx: &ServiceContext) -> ServiceInstance {
    ServiceInstance::Cdn(Arc::new(CdnService::new(&config.domain)))
}

fn build_compute(config: &ServiceConfig, ctx: &ServiceContext) -> ServiceInstance {
    ServiceInstance::Compute(Arc::new(ComputeService::new(
        &config.domain,
        ctx.events.clone(),
    )))
}

/// Builds the instance for `name`, or logs and returns `None` when no
/// capability answers to that name.
pub fn create_service(
    name: &str,
    config: &ServiceConfig,
    ctx: &ServiceContext,
) -> Option<ServiceInstance> {
    match ServiceFactory::lookup(name) {
        Some(factory) => Some((factory.build)(config, ctx)),
        None => {
            let err = RegistryError::UnknownService(name.to_string());
            warn!(service = %name, error = %err, "skipping service");
            None
        }
    }
}

/// Enabled capabilities keyed by their configured name. Disabled or unknown
/// names are simply absent.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, ServiceInstance>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CoreConfig, ctx: &ServiceContext) -> Self {
        let mut registry = Self::new();
        for (name, service_config) in config.enabled_services() {
            if let Some(instance) = create_service(name, service_config, ctx) {
                info!(
                    service = %name,
                    domain = %service_config.domain,
                    "service initialized"
                );
                registry.insert(name, instance);
            }
        }
        registry
    }

    pub fn insert(&mut self, name: &str, instance: ServiceInstance) {
        self.services.insert(name.to_string(), instance);
    }

    pub fn get(&self, name: &str) -> Option<&ServiceInstance> {
        self.services.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceInstance)> {
        self.services
            .iter()
            .map(|(name, instance)| (name.as_str(), instance))
    }

    pub fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
