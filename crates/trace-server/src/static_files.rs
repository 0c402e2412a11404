use axum::body::Body;
use axum::http::{header, HeaderValue, Response, Uri};
use axum::response::IntoResponse;
use include_dir::{include_dir, Dir};

use crate::error::AppError;

static ASSETS: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets");

const INDEX: &str = "index.html";

/// Serves the bundled landing assets. Unknown `/api/*` paths stay JSON 404s
/// instead of falling through to the index page.
pub async fn static_handler(uri: Uri) -> Response<Body> {
    let path = uri.path().trim_start_matches('/');
    if path == "api" || path.starts_with("api/") {
        return AppError::not_found(format!("no route for /{path}")).into_response();
    }

    let asset_path = if path.is_empty() { INDEX } else { path };
    match ASSETS.get_file(asset_path).or_else(|| ASSETS.get_file(INDEX)) {
        Some(file) => file_response(file.contents(), file.path().to_string_lossy().as_ref()),
        None => AppError::not_found("missing asset").into_response(),
    }
}

fn file_response(contents: &'static [u8], path: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(contents));
    if let Some(mime) = mime_guess::from_path(path).first() {
        if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    }
    response
}
