use std::sync::Arc;

use async_trait::async_trait;
use control_plane::now_rfc3339;
use kernel::{Core, KernelError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::{storage_service, HelperError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub date: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl EmailMessage {
    fn indexed_text(&self) -> String {
        format!("{} {}", self.subject, self.body)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub processed: usize,
    pub date_range: Option<DateRange>,
    pub status: &'static str,
}

/// Where inbound mail comes from.
#[async_trait]
pub trait EmailSource: Send + Sync {
    async fn fetch(&self, date_range: Option<&DateRange>) -> Result<Vec<EmailMessage>, HelperError>;
}

/// Fixed in-memory mailbox. Returns the same messages for every range.
pub struct StaticMailbox {
    messages: Vec<EmailMessage>,
}

impl StaticMailbox {
    pub fn new(messages: Vec<EmailMessage>) -> Self {
        Self { messages }
    }

    /// One sample financial request addressed to the intake mailbox.
    pub fn sample() -> Self {
        Self::new(vec![EmailMessage {
            id: "1".to_string(),
            from: "sender@example.com".to_string(),
            to: "nick@chitty.cc".to_string(),
            subject: "Financial Document Request".to_string(),
            body: "Please find attached bank statements...".to_string(),
            date: now_rfc3339(),
            attachments: vec!["bank_statement.pdf".to_string()],
        }])
    }
}

#[async_trait]
impl EmailSource for StaticMailbox {
    async fn fetch(&self, _date_range: Option<&DateRange>) -> Result<Vec<EmailMessage>, HelperError> {
        Ok(self.messages.clone())
    }
}

pub struct EmailIngestion {
    core: Arc<Core>,
    source: Arc<dyn EmailSource>,
}

impl EmailIngestion {
    pub fn new(core: Arc<Core>, source: Arc<dyn EmailSource>) -> Self {
        Self { core, source }
    }

    /// Indexes each message for semantic search when the vector store is on,
    /// and keeps the raw message in `storage` under `email-<id>` when present.
    pub async fn ingest(&self, date_range: Option<DateRange>) -> Result<IngestionReport, HelperError> {
        let messages = self
            .source
            .fetch(date_range.as_ref())
            .await
            .map_err(|err| match err {
                HelperError::Ingestion(_) => err,
                other => HelperError::Ingestion(other.to_string()),
            })?;
        for message in &messages {
            self.process(message)
                .map_err(|err| HelperError::Ingestion(err.to_string()))?;
        }
        info!(processed = messages.len(), "email ingestion complete");
        Ok(IngestionReport {
            processed: messages.len(),
            date_range,
            status: "success",
        })
    }

    fn process(&self, message: &EmailMessage) -> Result<(), HelperError> {
        let key = format!("email-{}", message.id);
        match self.core.vector_store() {
            Ok(store) => {
                let mut metadata = Map::new();
                metadata.insert("type".to_string(), json!("email"));
                metadata.insert("from".to_string(), json!(message.from));
                metadata.insert("date".to_string(), json!(message.date));
                metadata.insert("attachments".to_string(), json!(message.attachments));
                if let Err(err) = store.upsert(&key, &message.indexed_text(), metadata) {
                    warn!(id = %message.id, error = %err, "email not indexed");
                }
            }
            Err(KernelError::CapabilityDisabled(_)) => {}
            Err(err) => return Err(err.into()),
        }
        if let Some(storage) = storage_service(&self.core)? {
            let raw = serde_json::to_value(message).unwrap_or(Value::Null);
            storage.put(&key, raw);
        }
        Ok(())
    }
}
