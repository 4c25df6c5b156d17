use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use crate::{AppState, api::v1::auth::CurrentUser, error::Error, objects::FriendRequest};

/// `GET /api/v1/users/outgoing-requests` Pending requests you have sent
///
/// requires auth: yes
///
/// ### Response Example
/// ```
/// json!([
///     {
///         "uuid": "0196fa1d-08a2-7c10-9b4e-5d3a1f7e2c90",
///         "sender": "0196fa1c-3c4e-7d52-a1f3-2c9f0e6b4d11",
///         "recipient": {
///             "uuid": "0196fa1c-9a01-7e33-8c2d-4b6f1a0e9d27",
///             "name": "Kenji Sato",
///             "profilePicture": "https://avatar.iran.liara.run/public/7",
///             "nativeLanguage": "japanese",
///             "learningLanguage": "english"
///         },
///         "status": "pending",
///         "createdAt": "2025-06-01T12:00:00Z",
///         "updatedAt": "2025-06-01T12:00:00Z"
///     }
/// ]);
/// ```
pub async fn get(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let outgoing = FriendRequest::outgoing(app_state.store.as_ref(), uuid).await?;

    Ok((StatusCode::OK, Json(outgoing)))
}
