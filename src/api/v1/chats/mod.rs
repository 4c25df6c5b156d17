//! `/api/v1/chats` Access to the hosted chat and video provider

use std::sync::Arc;

use axum::{
    Extension, Json, Router, extract::State, http::StatusCode, response::IntoResponse,
    routing::get,
};
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, api::v1::auth::CurrentUser, error::Error};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/token", get(token))
}

/// `GET /api/v1/chats/token` Token for connecting to the chat provider as yourself
///
/// requires auth: yes
///
/// ### Responses
/// 200 OK, `{ "token": "..." }`
///
/// 503 Service Unavailable, no chat provider is configured
///
pub async fn token(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let token = app_state.presence.issue_token(uuid)?;

    Ok((StatusCode::OK, Json(json!({ "token": token }))))
}
