use std::collections::BTreeMap;

use control_plane::now_rfc3339;
use microkernel::ServiceRegistry;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorizeStatus {
    Enabled,
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub enabled: bool,
    pub healthy: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AiHealth {
    pub enabled: bool,
    pub vectorize: VectorizeStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub services: BTreeMap<String, ServiceHealth>,
    pub ai: AiHealth,
    pub timestamp: String,
}

impl HealthReport {
    pub(crate) fn collect(registry: &ServiceRegistry, ai_enabled: bool, vectorize: bool) -> Self {
        let services: BTreeMap<String, ServiceHealth> = registry
            .iter()
            .map(|(name, instance)| {
                (
                    name.to_string(),
                    ServiceHealth {
                        enabled: true,
                        healthy: instance.healthy(),
                    },
                )
            })
            .collect();
        let status = if services.values().all(|service| service.healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        Self {
            status,
            services,
            ai: AiHealth {
                enabled: ai_enabled,
                vectorize: if vectorize {
                    VectorizeStatus::Enabled
                } else {
                    VectorizeStatus::Disabled
                },
            },
            timestamp: now_rfc3339(),
        }
    }
}
