use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    api::v1::auth::CurrentUser,
    error::Error,
    objects::{FriendRequest, PageQuery},
};

/// `GET /api/v1/users/friend-requests` Pending requests sent to you, newest first
///
/// requires auth: yes
///
/// Accepts `page` and `search`, the search matches the sender's name
///
/// ### Response Example
/// ```
/// json!({
///     "incomingRequests": [
///         {
///             "uuid": "0196fa1d-08a2-7c10-9b4e-5d3a1f7e2c90",
///             "sender": {
///                 "uuid": "0196fa1c-3c4e-7d52-a1f3-2c9f0e6b4d11",
///                 "name": "Ana Lopez",
///                 "profilePicture": "https://avatar.iran.liara.run/public/42",
///                 "nativeLanguage": "spanish",
///                 "learningLanguage": "english"
///             },
///             "recipient": "0196fa1c-9a01-7e33-8c2d-4b6f1a0e9d27",
///             "status": "pending",
///             "createdAt": "2025-06-01T12:00:00Z",
///             "updatedAt": "2025-06-01T12:00:00Z"
///         }
///     ],
///     "totalRequest": 1
/// });
/// ```
pub async fn get(
    State(app_state): State<Arc<AppState>>,
    Query(page_query): Query<PageQuery>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let incoming = FriendRequest::incoming(app_state.store.as_ref(), uuid, &page_query).await?;

    Ok((StatusCode::OK, Json(incoming)))
}

/// `GET /api/v1/users/friend-requests/count` Number of pending requests sent to you
///
/// requires auth: yes
///
/// ### Response Example
/// ```
/// json!(3);
/// ```
pub async fn count(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let count = FriendRequest::count_incoming(app_state.store.as_ref(), uuid).await?;

    Ok((StatusCode::OK, Json(count)))
}

/// `POST /api/v1/users/friend-requests/{uuid}` Sends a friend request to the user `{uuid}`
///
/// requires auth: yes
///
/// ### Responses
/// 201 Created, returns the new request
///
/// 400 Bad Request, you sent it to yourself
///
/// 404 Not Found, no such user
///
/// 409 Conflict, you are already friends or a request between you is pending
///
pub async fn post(
    State(app_state): State<Arc<AppState>>,
    Path(recipient_uuid): Path<Uuid>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let request = FriendRequest::send(app_state.store.as_ref(), uuid, recipient_uuid).await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// `PUT /api/v1/users/friend-requests/{uuid}/accept` Accepts the request `{uuid}`
///
/// requires auth: yes, only the recipient may accept
///
/// ### Responses
/// 200 OK
///
/// 400 Bad Request, the request is not pending
///
/// 403 Forbidden, you are not the recipient
///
/// 404 Not Found
///
pub async fn accept(
    State(app_state): State<Arc<AppState>>,
    Path(request_uuid): Path<Uuid>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    FriendRequest::accept(app_state.store.as_ref(), request_uuid, uuid).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Friend request accepted successfully." })),
    ))
}

/// `PUT /api/v1/users/friend-requests/{uuid}/reject` Declines and deletes the request `{uuid}`
///
/// requires auth: yes, only the recipient may decline
///
/// Same error responses as accepting
pub async fn reject(
    State(app_state): State<Arc<AppState>>,
    Path(request_uuid): Path<Uuid>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    FriendRequest::decline(app_state.store.as_ref(), request_uuid, uuid).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Friend request rejected successfully." })),
    ))
}
