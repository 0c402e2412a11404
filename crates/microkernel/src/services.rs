use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use control_plane::{derive_user_id, now_rfc3339};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::registry::{Capability, ServiceKind};
use crate::{Event, EventBus};

const DEFAULT_CDN_TTL_SECS: u64 = 3600;
const DEFAULT_DNS_ADDRESS: &str = "127.0.0.1";

pub struct IdentityService {
    domain: String,
    records: Mutex<HashMap<String, Value>>,
}

impl IdentityService {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `{id, ...data}` under a fresh `chitty-` identifier.
    pub fn create_identity(&self, data: Map<String, Value>) -> Value {
        let id = format!("chitty-{}", Uuid::new_v4());
        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(id.clone()));
        for (key, value) in data {
            if key != "id" {
                record.insert(key, value);
            }
        }
        let record = Value::Object(record);
        self.records.lock().insert(id, record.clone());
        record
    }

    pub fn get_identity(&self, id: &str) -> Option<Value> {
        self.records.lock().get(id).cloned()
    }
}

impl Capability for IdentityService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Identity
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoredReceipt {
    pub stored: bool,
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeleteReceipt {
    pub deleted: bool,
    pub key: String,
}

pub struct StorageService {
    domain: String,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl StorageService {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn put(&self, key: &str, value: Value) -> StoredReceipt {
        self.entries.lock().insert(key.to_string(), value);
        StoredReceipt {
            stored: true,
            key: key.to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    pub fn delete(&self, key: &str) -> DeleteReceipt {
        let deleted = self.entries.lock().remove(key).is_some();
        DeleteReceipt {
            deleted,
            key: key.to_string(),
        }
    }

    pub fn keys(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl Capability for StorageService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Storage
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub id: String,
    pub to: String,
    pub subject: Option<String>,
    pub body: String,
    pub queued_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeliveryReceipt {
    pub sent: bool,
    pub id: String,
}

pub struct MessagingService {
    domain: String,
    events: Arc<EventBus>,
    outbox: Mutex<Vec<OutboundMessage>>,
}

impl MessagingService {
    pub fn new(domain: &str, events: Arc<EventBus>) -> Self {
        Self {
            domain: domain.to_string(),
            events,
            outbox: Mutex::new(Vec::new()),
        }
    }

    pub fn send(&self, to: &str, body: &str) -> DeliveryReceipt {
        let message = OutboundMessage {
            id: format!("msg-{}", Uuid::new_v4()),
            to: to.to_string(),
            subject: None,
            body: body.to_string(),
            queued_at: now_rfc3339(),
        };
        info!(to = %message.to, id = %message.id, "message sent");
        let receipt = DeliveryReceipt {
            sent: true,
            id: message.id.clone(),
        };
        self.events.publish(Event {
            name: "message.sent".to_string(),
            payload: json!({ "id": message.id, "to": message.to }),
        });
        self.outbox.lock().push(message);
        receipt
    }

    pub fn outbox(&self) -> Vec<OutboundMessage> {
        self.outbox.lock().clone()
    }
}

impl Capability for MessagingService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Messaging
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event: String,
    pub data: Value,
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackReceipt {
    pub tracked: bool,
    pub timestamp: String,
}

pub struct AnalyticsService {
    domain: String,
    events: Arc<EventBus>,
    recorded: Mutex<Vec<AnalyticsEvent>>,
}

impl AnalyticsService {
    pub fn new(domain: &str, events: Arc<EventBus>) -> Self {
        Self {
            domain: domain.to_string(),
            events,
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn track(&self, event: &str, data: Value) -> TrackReceipt {
        let timestamp = now_rfc3339();
        info!(event = %event, "analytics event");
        let record = AnalyticsEvent {
            event: event.to_string(),
            data,
            timestamp: timestamp.clone(),
        };
        self.events.publish(Event {
            name: "analytics.tracked".to_string(),
            payload: json!({ "event": record.event, "data": record.data }),
        });
        self.recorded.lock().push(record);
        TrackReceipt {
            tracked: true,
            timestamp,
        }
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.recorded.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.recorded
            .lock()
            .iter()
            .filter(|record| record.event == event)
            .count()
    }
}

impl Capability for AnalyticsService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Analytics
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifiedUser {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthVerdict {
    pub valid: bool,
    pub user: Option<VerifiedUser>,
}

pub struct AuthService {
    domain: String,
}

impl AuthService {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
        }
    }

    pub fn authenticate(&self, token: &str) -> AuthVerdict {
        let token = token.trim();
        if token.is_empty() {
            return AuthVerdict {
                valid: false,
                user: None,
            };
        }
        AuthVerdict {
            valid: true,
            user: Some(VerifiedUser {
                id: derive_user_id(token),
            }),
        }
    }
}

impl Capability for AuthService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Auth
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DnsAnswer {
    pub name: String,
    pub address: String,
}

pub struct DnsService {
    domain: String,
    records: Mutex<HashMap<String, String>>,
}

impl DnsService {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_record(&self, name: &str, address: &str) {
        self.records
            .lock()
            .insert(name.to_ascii_lowercase(), address.to_string());
    }

    pub fn resolve(&self, name: &str) -> DnsAnswer {
        let address = self
            .records
            .lock()
            .get(&name.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| DEFAULT_DNS_ADDRESS.to_string());
        DnsAnswer {
            name: name.to_string(),
            address,
        }
    }
}

impl Capability for DnsService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Dns
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

pub struct EmailService {
    domain: String,
    events: Arc<EventBus>,
    outbox: Mutex<Vec<OutboundMessage>>,
}

impl EmailService {
    pub fn new(domain: &str, events: Arc<EventBus>) -> Self {
        Self {
            domain: domain.to_string(),
            events,
            outbox: Mutex::new(Vec::new()),
        }
    }

    pub fn send(&self, to: &str, subject: &str, body: &str) -> DeliveryReceipt {
        let message = OutboundMessage {
            id: format!("email-{}", Uuid::new_v4()),
            to: to.to_string(),
            subject: Some(subject.to_string()),
            body: body.to_string(),
            queued_at: now_rfc3339(),
        };
        info!(to = %message.to, id = %message.id, "email queued");
        let receipt = DeliveryReceipt {
            sent: true,
            id: message.id.clone(),
        };
        self.events.publish(Event {
            name: "email.sent".to_string(),
            payload: json!({ "id": message.id, "to": message.to, "subject": subject }),
        });
        self.outbox.lock().push(message);
        receipt
    }

    pub fn outbox(&self) -> Vec<OutboundMessage> {
        self.outbox.lock().clone()
    }
}

impl Capability for EmailService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Email
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CacheReceipt {
    pub cached: bool,
    pub key: String,
    pub ttl: u64,
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

pub struct CdnService {
    domain: String,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CdnService {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self, key: &str, value: Value, ttl_secs: Option<u64>) -> CacheReceipt {
        let ttl = ttl_secs.unwrap_or(DEFAULT_CDN_TTL_SECS);
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(ttl))
            .unwrap_or_else(Instant::now);
        self.entries
            .lock()
            .insert(key.to_string(), CacheEntry { value, expires_at });
        CacheReceipt {
            cached: true,
            key: key.to_string(),
            ttl,
        }
    }

    /// Expired entries are dropped on read.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock();
        let live = entries
            .get(key)
            .map(|entry| entry.expires_at > Instant::now())?;
        if live {
            entries.get(key).map(|entry| entry.value.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    pub fn purge(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }
}

impl Capability for CdnService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Cdn
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComputeJob {
    pub id: String,
    pub task: String,
    pub input: Value,
    pub status: String,
    pub submitted_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComputeReceipt {
    pub id: String,
    pub status: String,
}

pub struct ComputeService {
    domain: String,
    events: Arc<EventBus>,
    jobs: Mutex<Vec<ComputeJob>>,
}

impl ComputeService {
    pub fn new(domain: &str, events: Arc<EventBus>) -> Self {
        Self {
            domain: domain.to_string(),
            events,
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn submit(&self, task: &str, input: Value) -> ComputeReceipt {
        let job = ComputeJob {
            id: format!("job-{}", Uuid::new_v4()),
            task: task.to_string(),
            input,
            status: "queued".to_string(),
            submitted_at: now_rfc3339(),
        };
        info!(task = %job.task, id = %job.id, "compute job queued");
        let receipt = ComputeReceipt {
            id: job.id.clone(),
            status: job.status.clone(),
        };
        self.events.publish(Event {
            name: "compute.queued".to_string(),
            payload: json!({ "id": job.id, "task": job.task }),
        });
        self.jobs.lock().push(job);
        receipt
    }

    pub fn job(&self, id: &str) -> Option<ComputeJob> {
        self.jobs.lock().iter().find(|job| job.id == id).cloned()
    }

    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }
}

impl Capability for ComputeService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Compute
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}
