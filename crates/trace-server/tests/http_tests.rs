use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use control_plane::{CoreConfig, ServerSettings, UpstreamSettings};
use kernel::{Completion, CompletionRequest, Core, KernelError, LanguageModel, TokenUsage};
use kernel_space::StaticMailbox;
use serde_json::{json, Value};
use tower::ServiceExt;
use trace_server::{build_router, AppState};

#[derive(Default)]
struct RecordingModel {
    requests: Mutex<Vec<CompletionRequest>>,
}

impl RecordingModel {
    fn keys(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("lock")
            .iter()
            .map(|request| request.api_key.clone())
            .collect()
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, KernelError> {
        self.requests.lock().expect("lock").push(request.clone());
        Ok(Completion {
            text: "Funds moved from checking to escrow.".to_string(),
            model: request.model.clone(),
            usage: TokenUsage {
                input_tokens: 12,
                output_tokens: 7,
            },
        })
    }
}

struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, KernelError> {
        Err(KernelError::Upstream("upstream status 529: overloaded".to_string()))
    }
}

fn base_config() -> CoreConfig {
    let mut config = CoreConfig::default();
    config.enable_service("analytics");
    config.enable_service("storage");
    config
}

fn state_with(config: CoreConfig, model: Arc<dyn LanguageModel>) -> Arc<AppState> {
    let mut core = Core::new(config);
    core.initialize().expect("initialize");
    Arc::new(AppState::new(
        ServerSettings::default(),
        UpstreamSettings::default(),
        Arc::new(core),
        model,
        Arc::new(StaticMailbox::sample()),
    ))
}

fn app_with(config: CoreConfig, model: Arc<dyn LanguageModel>) -> Router {
    build_router(state_with(config, model))
}

fn event_count(state: &AppState, kind: &str) -> usize {
    state
        .tracker()
        .summary("all")
        .expect("summary")
        .events
        .iter()
        .find(|event| event.kind == kind)
        .map_or(0, |event| event.count)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

#[tokio::test]
async fn analyze_without_key_is_unauthorized() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let (status, _, body) = send(&app, post("/api/analyze", json!({ "query": "where did it go" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "API key required");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn missing_key_wins_over_incomplete_body() {
    let model = Arc::new(RecordingModel::default());
    let app = app_with(base_config(), model.clone());
    for uri in ["/api/analyze", "/api/timeline", "/api/exhibits", "/api/forms/fill", "/api/commands"] {
        let (status, _, body) = send(&app, post(uri, json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "API key required");
    }
    assert!(model.keys().is_empty());
}

#[tokio::test]
async fn keyed_request_with_missing_field_is_bad_request() {
    let model = Arc::new(RecordingModel::default());
    let app = app_with(base_config(), model.clone());
    let (status, _, body) = send(&app, post("/api/analyze", json!({ "apiKey": "sk-x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error").contains("query"));
    assert!(model.keys().is_empty());
}

#[tokio::test]
async fn enabled_auth_capability_vets_the_key() {
    let mut config = base_config();
    config.enable_service("auth");
    let state = state_with(config, Arc::new(RecordingModel::default()));
    let app = build_router(state.clone());

    let (status, _, _) = send(
        &app,
        post("/api/analyze", json!({ "query": "trace the escrow", "apiKey": "sk-vetted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event_count(&state, "auth_success"), 1);
    assert_eq!(event_count(&state, "financial_analysis"), 1);
}

#[tokio::test]
async fn key_is_not_vetted_without_auth_capability() {
    let state = state_with(base_config(), Arc::new(RecordingModel::default()));
    let app = build_router(state.clone());
    let (status, _, _) = send(
        &app,
        post("/api/analyze", json!({ "query": "trace the escrow", "apiKey": "sk-x" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event_count(&state, "auth_success"), 0);
}

#[tokio::test]
async fn exhibits_return_package_and_record_documents() {
    let state = state_with(base_config(), Arc::new(RecordingModel::default()));
    let app = build_router(state.clone());
    let (status, _, body) = send(
        &app,
        post(
            "/api/exhibits",
            json!({
                "documents": [{ "name": "statement.pdf" }, { "name": "wire.pdf" }, { "name": "deed.pdf" }],
                "caseInfo": { "case_number": "2024-D-001234" },
                "purpose": "asset tracing",
                "apiKey": "sk-x",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exhibit_package"], "Funds moved from checking to escrow.");
    assert_eq!(body["case_info"]["case_number"], "2024-D-001234");
    assert_eq!(body["documents_count"], 3);
    assert!(body["generated_at"].is_string());
    assert_eq!(event_count(&state, "document_processing"), 1);
    assert_eq!(event_count(&state, "financial_exhibits"), 1);
}

#[tokio::test]
async fn form_fill_returns_filled_form() {
    let state = state_with(base_config(), Arc::new(RecordingModel::default()));
    let app = build_router(state.clone());
    let (status, _, body) = send(
        &app,
        post(
            "/api/forms/fill",
            json!({
                "template": "Petitioner: {{name}}",
                "data": { "name": "Jordan Doe" },
                "formType": "financial-affidavit",
                "apiKey": "sk-x",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filled_form"], "Funds moved from checking to escrow.");
    assert_eq!(body["form_type"], "financial-affidavit");
    assert!(body["filled_at"].is_string());
    assert_eq!(event_count(&state, "financial_form"), 1);
    assert_eq!(event_count(&state, "document_processing"), 0);
}

#[tokio::test]
async fn analyze_prefers_body_key_over_bearer() {
    let model = Arc::new(RecordingModel::default());
    let app = app_with(base_config(), model.clone());
    let mut request = post(
        "/api/analyze",
        json!({ "query": "trace the escrow", "apiKey": "sk-body-key" }),
    );
    request
        .headers_mut()
        .insert("authorization", "Bearer sk-header-key".parse().expect("header"));

    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(model.keys(), vec!["sk-body-key".to_string()]);
    assert_eq!(body["analysis"], "Funds moved from checking to escrow.");
    assert_eq!(body["metadata"]["userId"], "user-sk-body-");
    assert_eq!(body["metadata"]["query"], "trace the escrow");
    assert_eq!(body["metadata"]["tokens_used"]["input_tokens"], 12);
    assert!(body["metadata"]["analysisId"]
        .as_str()
        .expect("analysis id")
        .starts_with("analysis-"));
}

#[tokio::test]
async fn bearer_key_is_used_when_body_has_none() {
    let model = Arc::new(RecordingModel::default());
    let app = app_with(base_config(), model.clone());
    let mut request = post(
        "/api/commands",
        json!({ "command": "summarize", "parameters": { "account": "1234" } }),
    );
    request
        .headers_mut()
        .insert("authorization", "Bearer sk-header-key".parse().expect("header"));

    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(model.keys(), vec!["sk-header-key".to_string()]);
    assert_eq!(body["command"], "summarize");
    assert_eq!(body["parameters"]["account"], "1234");
}

#[tokio::test]
async fn upstream_failure_is_internal_error() {
    let app = app_with(base_config(), Arc::new(FailingModel));
    let (status, _, body) = send(
        &app,
        post("/api/forms/fill", json!({ "template": "Name: {{name}}", "apiKey": "sk-x" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "upstream status 529: overloaded");
}

#[tokio::test]
async fn timeline_wraps_non_json_completion() {
    let state = state_with(base_config(), Arc::new(RecordingModel::default()));
    let app = build_router(state.clone());
    let (status, _, body) = send(
        &app,
        post(
            "/api/timeline",
            json!({ "documents": [{ "name": "a.pdf" }, { "name": "b.pdf" }], "apiKey": "sk-x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeline"]["raw_response"], "Funds moved from checking to escrow.");
    assert_eq!(body["metadata"]["documents_processed"], 2);
    assert_eq!(event_count(&state, "document_processing"), 1);
    assert_eq!(event_count(&state, "financial_timeline"), 1);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let request = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn rate_limit_rejects_with_error_envelope() {
    let mut config = base_config();
    config.security.rate_limit.requests = 2;
    let app = app_with(config, Arc::new(RecordingModel::default()));
    let client = |uri: &str| {
        let mut request = get(uri);
        request
            .headers_mut()
            .insert("cf-connecting-ip", "203.0.113.7".parse().expect("header"));
        request
    };

    assert_eq!(send(&app, client("/health")).await.0, StatusCode::OK);
    assert_eq!(send(&app, client("/health")).await.0, StatusCode::OK);
    let (status, headers, body) = send(&app, client("/health")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded");
    assert!(body["timestamp"].is_string());
    assert_eq!(headers["access-control-allow-origin"], "*");

    let mut other = get("/health");
    other
        .headers_mut()
        .insert("cf-connecting-ip", "203.0.113.8".parse().expect("header"));
    assert_eq!(send(&app, other).await.0, StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_cors_and_security_headers() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let (_, headers, _) = send(&app, get("/api/docs")).await;
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(
        headers["access-control-allow-methods"],
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
}

#[tokio::test]
async fn preflight_returns_no_content() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/analyze")
        .body(Body::empty())
        .expect("request");
    let (status, headers, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        headers["access-control-allow-headers"],
        "Content-Type, Authorization"
    );
}

#[tokio::test]
async fn health_reports_services_and_identity() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let (status, _, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "ChittyTrace");
    assert_eq!(body["services"]["analytics"]["enabled"], true);
    assert_eq!(body["services"]["storage"]["healthy"], true);
    assert_eq!(body["ai"]["enabled"], false);
    assert_eq!(body["ai"]["vectorize"], "disabled");
}

#[tokio::test]
async fn docs_list_every_endpoint() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let (status, _, body) = send(&app, get("/api/docs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "ChittyTrace API");
    let paths: Vec<&str> = body["endpoints"]
        .as_array()
        .expect("endpoints")
        .iter()
        .filter_map(|endpoint| endpoint["path"].as_str())
        .collect();
    assert!(paths.contains(&"/api/search"));
    assert!(paths.contains(&"/api/emails/ingest"));
}

#[tokio::test]
async fn vector_routes_unavailable_without_vectorize() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let (status, _, body) = send(&app, post("/api/search", json!({ "query": "wire" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "vectorize not enabled");

    let (status, _, _) = send(
        &app,
        post("/api/documents", json!({ "id": "doc-1", "text": "wire transfer" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn indexed_documents_are_searchable() {
    let mut config = base_config();
    config.ai.vectorize.enabled = true;
    let app = app_with(config, Arc::new(RecordingModel::default()));

    let (status, _, body) = send(
        &app,
        post(
            "/api/documents",
            json!({ "id": "doc-1", "text": "international wire transfer", "metadata": { "type": "bank" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "doc-1");
    assert_eq!(body["upserted"], true);

    send(
        &app,
        post("/api/documents", json!({ "id": "doc-2", "text": "quarterly tax filing" })),
    )
    .await;

    let (status, _, body) = send(
        &app,
        post("/api/search", json!({ "query": "wire transfer", "threshold": 0.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["id"], "doc-1");
    assert_eq!(body["results"][0]["metadata"]["type"], "bank");
}

#[tokio::test]
async fn blank_document_is_bad_request() {
    let mut config = base_config();
    config.ai.vectorize.enabled = true;
    let app = app_with(config, Arc::new(RecordingModel::default()));
    let (status, _, _) = send(&app, post("/api/documents", json!({ "id": "doc-x", "text": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_uses_inference_binding() {
    let mut config = base_config();
    config.ai.enabled = true;
    let app = app_with(config, Arc::new(RecordingModel::default()));
    let (status, _, body) = send(&app, post("/api/ai/generate", json!({ "prompt": "hello" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["result"]
        .as_str()
        .expect("result")
        .starts_with("AI response to: hello"));
}

#[tokio::test]
async fn generate_unavailable_when_ai_disabled() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let (status, _, _) = send(&app, post("/api/ai/generate", json!({ "prompt": "hello" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn email_ingest_is_placeholder_without_capability() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let (status, _, body) = send(
        &app,
        post("/api/emails/ingest", json!({ "email": "nick@chitty.cc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "placeholder");
    assert_eq!(body["email"], "nick@chitty.cc");
}

#[tokio::test]
async fn email_ingest_indexes_mailbox_when_enabled() {
    let mut config = base_config();
    config.enable_service("email");
    config.ai.vectorize.enabled = true;
    let app = app_with(config, Arc::new(RecordingModel::default()));

    let (status, _, body) = send(
        &app,
        post("/api/emails/ingest", json!({ "dateRange": { "start": "2024-01-01" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["processed"], 1);

    let (_, _, body) = send(
        &app,
        post("/api/search", json!({ "query": "bank statements", "threshold": 0.3 })),
    )
    .await;
    assert_eq!(body["results"][0]["id"], "email-1");
}

#[tokio::test]
async fn unknown_api_path_is_json_not_found() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let (status, _, body) = send(&app, get("/api/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn root_serves_landing_page() {
    let app = app_with(base_config(), Arc::new(RecordingModel::default()));
    let response = app.oneshot(get("/")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/html");
}
