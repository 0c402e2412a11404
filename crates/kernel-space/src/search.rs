use std::sync::Arc;

use control_plane::now_rfc3339;
use kernel::{Core, KernelError, SearchHit, SearchOptions, UpsertReceipt};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::analytics::TRACKER_SERVICE;
use crate::HelperError;

const SEMANTIC_THRESHOLD: f32 = 0.7;
const SEMANTIC_LIMIT: usize = 20;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchEnrichment {
    pub enhanced: bool,
    pub service: &'static str,
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnhancedHit {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub chittyos: SearchEnrichment,
}

pub struct SemanticSearch {
    core: Arc<Core>,
}

impl SemanticSearch {
    pub fn new(core: Arc<Core>) -> Self {
        Self { core }
    }

    /// Caller filters override the 0.7 / 20 defaults field by field.
    pub fn semantic_search(
        &self,
        query: &str,
        filters: SearchOptions,
    ) -> Result<Vec<EnhancedHit>, HelperError> {
        let options = SearchOptions {
            threshold: Some(filters.threshold.unwrap_or(SEMANTIC_THRESHOLD)),
            limit: Some(filters.limit.unwrap_or(SEMANTIC_LIMIT)),
        };
        let hits = self.core.vector_search(query, options).map_err(disabled)?;
        let timestamp = now_rfc3339();
        Ok(hits
            .into_iter()
            .map(|hit| EnhancedHit {
                hit,
                chittyos: SearchEnrichment {
                    enhanced: true,
                    service: "vector-search",
                    timestamp: timestamp.clone(),
                },
            })
            .collect())
    }

    pub fn add_document(
        &self,
        id: &str,
        content: &str,
        metadata: Map<String, Value>,
    ) -> Result<UpsertReceipt, HelperError> {
        let mut metadata = metadata;
        metadata.insert(
            "chittyos".to_string(),
            json!({ "added": now_rfc3339(), "service": TRACKER_SERVICE }),
        );
        self.core
            .vector_upsert(id, content, metadata)
            .map_err(disabled)
    }
}

fn disabled(err: KernelError) -> HelperError {
    match err {
        KernelError::CapabilityDisabled(name) => HelperError::Disabled(name),
        other => HelperError::Kernel(other),
    }
}
