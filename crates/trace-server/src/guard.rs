use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use control_plane::{CorsPolicy, SecurityLayer};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

const ANONYMOUS_CLIENT: &str = "anonymous";

const SECURITY_HEADERS: [(&str, &str); 3] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
];

/// Runs ahead of every route: CORS preflight, admission, then bearer
/// authentication. The resulting `AuthResult` rides in the request
/// extensions.
pub async fn security_gate(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response<Body> {
    let security = match state.core.security() {
        Ok(security) => security,
        Err(err) => return AppError::from(err).into_response(),
    };

    let mut response = admit_and_run(&security, req, next).await;
    decorate(response.headers_mut(), security.cors());
    response
}

async fn admit_and_run(security: &SecurityLayer, mut req: Request, next: Next) -> Response<Body> {
    if *req.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_id = client_identifier(req.headers(), peer);
    if !security.admit(&client_id) {
        return AppError::rate_limited().into_response();
    }

    let authorization = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let auth = security.authenticate(authorization);
    debug!(client_id = %client_id, authenticated = auth.is_authenticated, "request admitted");
    req.extensions_mut().insert(auth);
    next.run(req).await
}

/// `CF-Connecting-IP`, then the first `X-Forwarded-For` hop, then the socket
/// peer.
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };
    if let Some(ip) = header_value("cf-connecting-ip") {
        return ip.to_string();
    }
    if let Some(hop) = header_value("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
    {
        return hop.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

fn decorate(headers: &mut HeaderMap, cors: &CorsPolicy) {
    for (name, value) in cors.headers() {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}
