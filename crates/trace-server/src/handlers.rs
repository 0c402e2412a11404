use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::{Extension, Json};
use control_plane::{derive_user_id, now_rfc3339, AuthResult};
use kernel::{HealthReport, InferenceOptions, SearchHit, SearchOptions, TokenUsage, UpsertReceipt};
use kernel_space::{AuthTokenIssuer, DateRange, EmailIngestion, IngestionReport};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::docs::ApiDocs;
use crate::error::AppError;
use crate::prompts;
use crate::state::AppState;

/// JSON body parsed regardless of `Content-Type`, rejecting with the
/// standard error envelope.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|err| AppError::bad_request(err.body_text()))?;
        let value = serde_json::from_slice(&bytes)
            .map_err(|err| AppError::bad_request(format!("invalid JSON body: {err}")))?;
        Ok(Self(value))
    }
}

/// The body field wins over the bearer header.
fn resolve_api_key(body_key: Option<&str>, auth: &AuthResult) -> Result<String, AppError> {
    body_key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| auth.api_key.clone())
        .ok_or_else(|| AppError::unauthorized("API key required"))
}

/// The key is settled before the body is decoded, so a keyless request is
/// a 401 whatever else it carries. An enabled `auth` capability must also
/// accept the key.
fn authorize<T: DeserializeOwned>(
    state: &AppState,
    auth: &AuthResult,
    body: Value,
) -> Result<(String, T), AppError> {
    let api_key = resolve_api_key(body.get("apiKey").and_then(Value::as_str), auth)?;
    let verdict = AuthTokenIssuer::new(state.core.clone()).validate_api_key(&api_key)?;
    if verdict.is_some_and(|verdict| !verdict.valid) {
        return Err(AppError::unauthorized("Invalid API key"));
    }
    let payload = serde_json::from_value(body)
        .map_err(|err| AppError::bad_request(format!("invalid request body: {err}")))?;
    Ok((api_key, payload))
}

fn track_financial(state: &AppState, kind: &str, metadata: Value) {
    let metadata = match metadata {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Err(err) = state.tracker().track_financial_analysis(kind, metadata) {
        warn!(error = %err, kind = %kind, "analytics tracking failed");
    }
}

fn track_documents(state: &AppState, kind: &str, count: usize) {
    if let Err(err) = state.tracker().track_document_processing(kind, count) {
        warn!(error = %err, kind = %kind, "analytics tracking failed");
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub report: HealthReport,
    pub service: String,
    pub version: String,
    pub environment: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let report = state.core.health_check()?;
    Ok(Json(HealthResponse {
        report,
        service: state.server.name.clone(),
        version: state.server.version.clone(),
        environment: state.server.environment.clone(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub query: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub model: String,
    pub timestamp: String,
    #[serde(rename = "tokens_used")]
    pub tokens_used: TokenUsage,
    pub query: String,
    pub user_id: String,
    pub analysis_id: String,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
    pub metadata: AnalysisMetadata,
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let (api_key, payload) = authorize::<AnalyzeRequest>(&state, &auth, body)?;
    let prompt = prompts::analyze(&payload.query, payload.context.as_deref());
    let completion = state.complete(&api_key, prompt).await?;

    let user_id = derive_user_id(&api_key);
    let analysis_id = format!("analysis-{}", Uuid::new_v4());
    track_financial(
        &state,
        "analysis",
        json!({ "query": payload.query, "userId": user_id, "analysisId": analysis_id }),
    );
    info!(analysis_id = %analysis_id, "analysis complete");

    Ok(Json(AnalyzeResponse {
        analysis: completion.text,
        metadata: AnalysisMetadata {
            model: completion.model,
            timestamp: now_rfc3339(),
            tokens_used: completion.usage,
            query: payload.query,
            user_id,
            analysis_id,
        },
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRequest {
    pub documents: Vec<Value>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

pub async fn timeline(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    let (api_key, payload) = authorize::<TimelineRequest>(&state, &auth, body)?;
    let prompt = prompts::timeline(&payload.documents, payload.date_range.as_ref());
    let completion = state.complete(&api_key, prompt).await?;

    let timeline = serde_json::from_str::<Value>(&completion.text)
        .unwrap_or_else(|_| json!({ "raw_response": completion.text }));
    let count = payload.documents.len();
    track_financial(&state, "timeline", json!({ "documents": count }));
    track_documents(&state, "timeline", count);

    Ok(Json(json!({
        "timeline": timeline,
        "metadata": {
            "documents_processed": count,
            "timestamp": now_rfc3339(),
        },
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitRequest {
    pub documents: Vec<Value>,
    pub case_info: Value,
    #[serde(default)]
    pub purpose: String,
}

pub async fn exhibits(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    let (api_key, payload) = authorize::<ExhibitRequest>(&state, &auth, body)?;
    let prompt = prompts::exhibits(&payload.documents, &payload.case_info, &payload.purpose);
    let completion = state.complete(&api_key, prompt).await?;

    let count = payload.documents.len();
    track_financial(&state, "exhibits", json!({ "documents": count }));
    track_documents(&state, "exhibit", count);

    Ok(Json(json!({
        "exhibit_package": completion.text,
        "case_info": payload.case_info,
        "documents_count": count,
        "generated_at": now_rfc3339(),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRequest {
    pub template: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub form_type: Option<String>,
}

pub async fn fill_form(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    let (api_key, payload) = authorize::<FormRequest>(&state, &auth, body)?;
    let prompt = prompts::fill_form(&payload.template, &payload.data);
    let completion = state.complete(&api_key, prompt).await?;
    track_financial(&state, "form", json!({ "formType": payload.form_type }));

    Ok(Json(json!({
        "filled_form": completion.text,
        "form_type": payload.form_type,
        "filled_at": now_rfc3339(),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub parameters: Value,
}

pub async fn run_command(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    let (api_key, payload) = authorize::<CommandRequest>(&state, &auth, body)?;
    let prompt = prompts::command(&payload.command, &payload.parameters);
    let completion = state.complete(&api_key, prompt).await?;
    track_financial(&state, "command", json!({ "command": payload.command }));

    Ok(Json(json!({
        "command": payload.command,
        "result": completion.text,
        "parameters": payload.parameters,
        "executed_at": now_rfc3339(),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum IngestResponse {
    Completed(IngestionReport),
    Placeholder {
        message: &'static str,
        email: Option<String>,
        date_range: Option<DateRange>,
        status: &'static str,
    },
}

/// Runs the mailbox ingestion when the `email` capability is enabled and
/// acknowledges with a placeholder otherwise.
pub async fn ingest_emails(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    if state.core.get_service("email")?.is_none() {
        return Ok(Json(IngestResponse::Placeholder {
            message: "Email ingestion requires the email capability",
            email: payload.email,
            date_range: payload.date_range,
            status: "placeholder",
        }));
    }
    let ingestion = EmailIngestion::new(state.core.clone(), state.mailbox.clone());
    let report = ingestion.ingest(payload.date_range).await?;
    Ok(Json(IngestResponse::Completed(report)))
}

#[derive(Deserialize)]
pub struct DocumentRequest {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

pub async fn upsert_document(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<DocumentRequest>,
) -> Result<Json<UpsertReceipt>, AppError> {
    let receipt = state
        .core
        .vector_upsert(&payload.id, &payload.text, payload.metadata)?;
    Ok(Json(receipt))
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub count: usize,
}

pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let options = SearchOptions {
        threshold: payload.threshold,
        limit: payload.limit,
    };
    let results = state.core.vector_search(&payload.query, options)?;
    Ok(Json(SearchResponse {
        count: results.len(),
        results,
    }))
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<GenerateRequest>,
) -> Result<Json<Value>, AppError> {
    let options = InferenceOptions {
        model: payload.model,
    };
    let output = state.core.inference(&payload.prompt, &options).await?;
    Ok(Json(json!({ "success": true, "result": output.text })))
}

pub async fn api_docs(State(state): State<Arc<AppState>>) -> Json<ApiDocs> {
    Json(ApiDocs::new(&state.server.name, &state.server.version))
}
