use std::sync::Arc;

use control_plane::{
    BearerAuthority, ConfigError, CoreConfig, InMemoryRateLimiter, RateLimiter,
    SecurityAuthority, SecurityLayer,
};
use microkernel::{EventBus, ServiceContext, ServiceInstance, ServiceRegistry};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::health::HealthReport;
use crate::inference::{InferenceBackend, InferenceOptions, InferenceOutput, PlaceholderInference};
use crate::vector::{SearchHit, SearchOptions, UpsertReceipt, VectorStore};
use crate::KernelError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CoreState {
    Uninitialized,
    Initializing,
    Initialized,
    InitializationFailed,
}

struct AiRuntime {
    vectorize: Option<Arc<VectorStore>>,
    inference: Option<Arc<dyn InferenceBackend>>,
}

struct CoreRuntime {
    security: Arc<SecurityLayer>,
    registry: ServiceRegistry,
    ai: AiRuntime,
}

/// Owns the registry, the security layer and the AI handles. Each instance
/// carries its own rate windows and vector records.
pub struct Core {
    config: CoreConfig,
    state: CoreState,
    events: Arc<EventBus>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    authority: Arc<dyn SecurityAuthority>,
    inference: Option<Arc<dyn InferenceBackend>>,
    runtime: Option<CoreRuntime>,
}

impl Core {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            state: CoreState::Uninitialized,
            events: EventBus::shared(),
            rate_limiter: None,
            authority: BearerAuthority::shared(),
            inference: None,
            runtime: None,
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn with_authority(mut self, authority: Arc<dyn SecurityAuthority>) -> Self {
        self.authority = authority;
        self
    }

    pub fn with_inference(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.inference = Some(backend);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn state(&self) -> CoreState {
        self.state
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Runs the single setup pass. A failed pass is terminal; later calls
    /// keep reporting it.
    pub fn initialize(&mut self) -> Result<(), KernelError> {
        match self.state {
            CoreState::Initialized => return Ok(()),
            CoreState::InitializationFailed => {
                return Err(KernelError::InitializationFailed(
                    "core is in a failed state".to_string(),
                ))
            }
            CoreState::Uninitialized | CoreState::Initializing => {}
        }

        self.state = CoreState::Initializing;
        info!("core initialization start");
        match self.build_runtime() {
            Ok(runtime) => {
                info!(
                    services = runtime.registry.len(),
                    ai = runtime.ai.inference.is_some(),
                    vectorize = runtime.ai.vectorize.is_some(),
                    "core initialized"
                );
                self.runtime = Some(runtime);
                self.state = CoreState::Initialized;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "core initialization failed");
                self.state = CoreState::InitializationFailed;
                Err(KernelError::InitializationFailed(err.to_string()))
            }
        }
    }

    fn build_runtime(&self) -> Result<CoreRuntime, ConfigError> {
        let ctx = ServiceContext::new(self.events.clone());
        let registry = ServiceRegistry::from_config(&self.config, &ctx);
        let ai = self.build_ai()?;

        let rate_limiter = self.rate_limiter.clone().unwrap_or_else(|| {
            InMemoryRateLimiter::shared(self.config.security.rate_limit.clone())
        });
        let security = SecurityLayer::new(&self.config.security, rate_limiter, self.authority.clone())?;

        Ok(CoreRuntime {
            security: Arc::new(security),
            registry,
            ai,
        })
    }

    fn build_ai(&self) -> Result<AiRuntime, ConfigError> {
        let ai = &self.config.ai;
        let inference = if ai.enabled {
            let default_model = ai.models.first().ok_or_else(|| {
                ConfigError::Invalid(
                    "ai.models".to_string(),
                    "at least one model is required when ai is enabled".to_string(),
                )
            })?;
            Some(self.inference.clone().unwrap_or_else(|| {
                Arc::new(PlaceholderInference::new(default_model.clone())) as Arc<dyn InferenceBackend>
            }))
        } else {
            None
        };
        let vectorize = self
            .config
            .vectorize_enabled()
            .then(|| Arc::new(VectorStore::new()));
        info!(models = ai.models.len(), "ai services initialized");
        Ok(AiRuntime {
            vectorize,
            inference,
        })
    }

    fn runtime(&self) -> Result<&CoreRuntime, KernelError> {
        match (&self.state, &self.runtime) {
            (CoreState::Initialized, Some(runtime)) => Ok(runtime),
            _ => Err(KernelError::NotInitialized),
        }
    }

    pub fn security(&self) -> Result<Arc<SecurityLayer>, KernelError> {
        Ok(self.runtime()?.security.clone())
    }

    /// `Ok(None)` means the capability is not enabled.
    pub fn get_service(&self, name: &str) -> Result<Option<&ServiceInstance>, KernelError> {
        Ok(self.runtime()?.registry.get(name))
    }

    pub fn vector_store(&self) -> Result<Arc<VectorStore>, KernelError> {
        self.runtime()?
            .ai
            .vectorize
            .clone()
            .ok_or(KernelError::CapabilityDisabled("vectorize"))
    }

    pub fn vector_search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchHit>, KernelError> {
        Ok(self.vector_store()?.search(query, options))
    }

    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, KernelError> {
        Ok(self.vector_store()?.embed(text))
    }

    pub fn vector_upsert(
        &self,
        id: &str,
        text: &str,
        metadata: Map<String, Value>,
    ) -> Result<UpsertReceipt, KernelError> {
        self.vector_store()?
            .upsert(id, text, metadata)
            .map_err(|err| KernelError::BadRequest(err.to_string()))
    }

    pub async fn inference(
        &self,
        prompt: &str,
        options: &InferenceOptions,
    ) -> Result<InferenceOutput, KernelError> {
        let backend = self
            .runtime()?
            .ai
            .inference
            .clone()
            .ok_or(KernelError::CapabilityDisabled("ai inference"))?;
        backend.generate(prompt, options).await
    }

    pub fn health_check(&self) -> Result<HealthReport, KernelError> {
        let runtime = self.runtime()?;
        Ok(HealthReport::collect(
            &runtime.registry,
            self.config.ai.enabled,
            runtime.ai.vectorize.is_some(),
        ))
    }
}
