//! `/api/versions` Endpoint for checking which API versions are supported

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
struct Response {
    versions: Vec<String>,
    build: &'static str,
}

/// `GET /api/versions` Returns info about api versions.
///
/// requires auth: no
///
/// ### Response Example
/// ```
/// json!({
///     "versions": [
///         "1"
///     ],
///     "build": "1f3e2a9"
/// });
/// ```
pub async fn versions() -> impl IntoResponse {
    let response = Response {
        versions: vec![String::from("1")],
        build: env!("GIT_SHORT_HASH"),
    };

    (StatusCode::OK, Json(response))
}
