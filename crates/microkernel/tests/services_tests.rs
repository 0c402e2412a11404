use std::sync::Arc;

use microkernel::{
    AnalyticsService, AuthService, CdnService, ComputeService, DnsService, EmailService, EventBus,
    IdentityService, MessagingService, SchemaService, StorageService, COOK_COUNTY_EXHIBIT,
    FINANCIAL_DOCUMENT,
};
use microkernel::{Capability, SchemaError};
use serde_json::{json, Map};

#[test]
fn identity_assigns_prefixed_ids() {
    let identity = IdentityService::new("identity.chitty.cc");
    let mut data = Map::new();
    data.insert("name".to_string(), json!("Ada"));
    let record = identity.create_identity(data);
    let id = record["id"].as_str().expect("id");
    assert!(id.starts_with("chitty-"));
    assert_eq!(record["name"], json!("Ada"));
    assert_eq!(identity.get_identity(id), Some(record.clone()));
}

#[test]
fn storage_put_get_delete() {
    let storage = StorageService::new("storage.chitty.cc");
    let receipt = storage.put("email-1", json!({"subject": "hi"}));
    assert!(receipt.stored);
    storage.put("email-2", json!({}));
    storage.put("temp-token-x", json!({}));
    assert_eq!(storage.get("email-1"), Some(json!({"subject": "hi"})));
    assert_eq!(storage.keys("email-").len(), 2);
    assert!(storage.delete("email-1").deleted);
    assert!(!storage.delete("email-1").deleted);
    assert!(storage.get("email-1").is_none());
}

#[test]
fn messaging_and_email_fill_outboxes() {
    let bus = EventBus::shared();
    let messaging = MessagingService::new("messaging.chitty.cc", bus.clone());
    let receipt = messaging.send("ops", "deploy done");
    assert!(receipt.sent);
    assert_eq!(messaging.outbox().len(), 1);

    let email = EmailService::new("email.chitty.cc", bus);
    let receipt = email.send("a@example.test", "Subject", "Body");
    assert!(receipt.id.starts_with("email-"));
    let outbox = email.outbox();
    assert_eq!(outbox[0].subject.as_deref(), Some("Subject"));
}

#[test]
fn analytics_counts_events() {
    let analytics = AnalyticsService::new("analytics.chitty.cc", EventBus::shared());
    let receipt = analytics.track("financial_analysis", json!({"q": 1}));
    assert!(receipt.tracked);
    assert!(!receipt.timestamp.is_empty());
    analytics.track("financial_analysis", json!({}));
    analytics.track("document_processing", json!({}));
    assert_eq!(analytics.count("financial_analysis"), 2);
    assert_eq!(analytics.events().len(), 3);
}

#[test]
fn auth_accepts_non_empty_tokens() {
    let auth = AuthService::new("auth.chitty.cc");
    let verdict = auth.authenticate("abcdefghijkl");
    assert!(verdict.valid);
    assert_eq!(verdict.user.expect("user").id, "user-abcdefgh");
    let verdict = auth.authenticate("   ");
    assert!(!verdict.valid);
    assert!(verdict.user.is_none());
}

#[test]
fn dns_defaults_to_loopback() {
    let dns = DnsService::new("dns.chitty.cc");
    assert_eq!(dns.resolve("unknown.test").address, "127.0.0.1");
    dns.set_record("Api.Example.Test", "10.0.0.7");
    assert_eq!(dns.resolve("api.example.test").address, "10.0.0.7");
}

#[test]
fn cdn_ttl_controls_visibility() {
    let cdn = CdnService::new("cdn.chitty.cc");
    let receipt = cdn.cache("page", json!("<html>"), None);
    assert_eq!(receipt.ttl, 3600);
    assert_eq!(cdn.get("page"), Some(json!("<html>")));
    cdn.cache("flash", json!(1), Some(0));
    assert!(cdn.get("flash").is_none());
    assert!(cdn.purge("page"));
    assert!(cdn.get("page").is_none());
}

#[test]
fn compute_queues_jobs() {
    let compute = ComputeService::new("compute.chitty.cc", EventBus::shared());
    let receipt = compute.submit("ocr", json!({"path": "a.pdf"}));
    assert_eq!(receipt.status, "queued");
    let job = compute.job(&receipt.id).expect("job");
    assert_eq!(job.task, "ocr");
    assert_eq!(compute.pending(), 1);
}

#[test]
fn schema_builtins_compile() {
    let schema = SchemaService::new("schema.chitty.cc");
    assert!(schema.healthy());
    assert_eq!(
        schema.schema_ids(),
        vec![COOK_COUNTY_EXHIBIT.to_string(), FINANCIAL_DOCUMENT.to_string()]
    );
}

#[test]
fn exhibit_schema_reports_missing_fields() {
    let schema = SchemaService::new("schema.chitty.cc");
    let valid = json!({
        "case_number": "2024-L-000123",
        "caption": "Doe v. Roe",
        "exhibits": [
            {"number": "A", "description": "Bank statement", "document_path": "a.pdf"}
        ],
        "authentication": {"affiant": "Doe"}
    });
    let outcome = schema
        .validate_schema(COOK_COUNTY_EXHIBIT, &valid)
        .expect("known schema");
    assert!(outcome.valid);
    assert!(outcome.errors.is_empty());

    let invalid = json!({
        "case_number": "2024-L-000123",
        "exhibits": [{"number": "A"}]
    });
    let outcome = schema
        .validate_schema(COOK_COUNTY_EXHIBIT, &invalid)
        .expect("known schema");
    assert!(!outcome.valid);
    assert!(outcome.errors.len() >= 2);
}

#[test]
fn financial_schema_checks_transactions() {
    let schema = SchemaService::new("schema.chitty.cc");
    let data = json!({
        "account_number": "0001",
        "date_range": {"start": "2024-01-01", "end": "2024-01-31"},
        "transactions": [{"date": "2024-01-02", "amount": "lots", "description": "wire"}]
    });
    let outcome = schema
        .validate_schema(FINANCIAL_DOCUMENT, &data)
        .expect("known schema");
    assert!(!outcome.valid);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("/transactions/0/amount"));
}

#[test]
fn unknown_schema_is_an_error() {
    let schema = SchemaService::new("schema.chitty.cc");
    let err = schema
        .validate_schema("tax-return", &json!({}))
        .expect_err("unknown schema");
    match err {
        SchemaError::Unknown(id) => assert_eq!(id, "tax-return"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn custom_schema_registration() {
    let schema = Arc::new(SchemaService::new("schema.chitty.cc"));
    schema
        .register("note", json!({"type": "object", "required": ["body"]}))
        .expect("compiles");
    let outcome = schema
        .validate_schema("note", &json!({"body": "x"}))
        .expect("known schema");
    assert!(outcome.valid);
    let err = schema
        .register("broken", json!({"type": 12}))
        .expect_err("invalid schema");
    assert!(matches!(err, SchemaError::Compile(_, _)));
}
