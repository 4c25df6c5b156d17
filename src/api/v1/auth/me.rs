use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use super::{AuthResponse, CurrentUser};
use crate::{AppState, error::Error, objects::Me};

/// `GET /api/v1/auth/me` Returns the signed in user
///
/// requires auth: yes
pub async fn get(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    Ok((StatusCode::OK, Json(AuthResponse::new(me))))
}
