use std::collections::BTreeMap;
use std::sync::Arc;

use control_plane::now_rfc3339;
use kernel::Core;
use microkernel::TrackReceipt;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::{analytics_service, HelperError};

pub const TRACKER_SERVICE: &str = "chitty-trace";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EventCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub timeframe: String,
    pub events: Vec<EventCount>,
}

/// Records domain events on the `analytics` capability. Every method is a
/// no-op returning `None` when that capability is not enabled.
pub struct AnalyticsTracker {
    core: Arc<Core>,
}

impl AnalyticsTracker {
    pub fn new(core: Arc<Core>) -> Self {
        Self { core }
    }

    pub fn track_financial_analysis(
        &self,
        analysis_type: &str,
        metadata: Map<String, Value>,
    ) -> Result<Option<TrackReceipt>, HelperError> {
        let Some(analytics) = analytics_service(&self.core)? else {
            return Ok(None);
        };
        let mut data = metadata;
        data.insert("timestamp".to_string(), Value::String(now_rfc3339()));
        data.insert(
            "service".to_string(),
            Value::String(TRACKER_SERVICE.to_string()),
        );
        Ok(Some(analytics.track(
            &format!("financial_{analysis_type}"),
            Value::Object(data),
        )))
    }

    pub fn track_document_processing(
        &self,
        document_type: &str,
        count: usize,
    ) -> Result<Option<TrackReceipt>, HelperError> {
        let Some(analytics) = analytics_service(&self.core)? else {
            return Ok(None);
        };
        Ok(Some(analytics.track(
            "document_processing",
            json!({
                "type": document_type,
                "count": count,
                "timestamp": now_rfc3339(),
            }),
        )))
    }

    /// Per-event counts of everything recorded since startup.
    pub fn summary(&self, timeframe: &str) -> Result<AnalyticsSummary, HelperError> {
        let analytics = analytics_service(&self.core)?.ok_or(HelperError::Disabled("analytics"))?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for event in analytics.events() {
            *counts.entry(event.event).or_default() += 1;
        }
        Ok(AnalyticsSummary {
            timeframe: timeframe.to_string(),
            events: counts
                .into_iter()
                .map(|(kind, count)| EventCount { kind, count })
                .collect(),
        })
    }
}
