use axum::{Json, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use serde_json::json;

use crate::utils::removal_cookie;

/// `POST /api/v1/auth/logout` Clears the session cookie
///
/// requires auth: no
///
/// ### Response Example
/// ```
/// json!({
///     "success": true,
///     "message": "Logged out successfully"
/// });
/// ```
pub async fn post(jar: CookieJar) -> impl IntoResponse {
    (
        StatusCode::OK,
        jar.remove(removal_cookie()),
        Json(json!({
            "success": true,
            "message": "Logged out successfully",
        })),
    )
}
