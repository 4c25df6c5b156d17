//! `/api/v1/users` Discovering other learners and managing friendships

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    AppState,
    api::v1::auth::CurrentUser,
    error::Error,
    objects::{PageQuery, User},
};

mod friend_requests;
mod friends;
mod outgoing_requests;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(recommended))
        .route("/friends", get(friends::get))
        .route("/friend-requests", get(friend_requests::get))
        .route("/friend-requests/count", get(friend_requests::count))
        .route("/friend-requests/{uuid}", post(friend_requests::post))
        .route("/friend-requests/{uuid}/accept", put(friend_requests::accept))
        .route("/friend-requests/{uuid}/reject", put(friend_requests::reject))
        .route("/outgoing-requests", get(outgoing_requests::get))
}

/// `GET /api/v1/users` Onboarded users you are not friends with yet
///
/// requires auth: yes
///
/// Accepts `page` (1-indexed) and `search` (case-insensitive name substring) query parameters,
/// pages hold up to 9 users
///
/// ### Response Example
/// ```
/// json!({
///     "data": [
///         {
///             "uuid": "0196fa1c-3c4e-7d52-a1f3-2c9f0e6b4d11",
///             "name": "Ana Lopez",
///             "profilePicture": "https://avatar.iran.liara.run/public/42",
///             "nativeLanguage": "spanish",
///             "learningLanguage": "english"
///         }
///     ],
///     "pagination": {
///         "currentPage": 1,
///         "totalPages": 1,
///         "totalUsers": 1,
///         "limit": 9,
///         "hasNextPage": false,
///         "hasPrevPage": false,
///         "nextPage": null,
///         "prevPage": null
///     },
///     "nextPage": null,
///     "hasMore": false,
///     "currentPage": 1
/// });
/// ```
pub async fn recommended(
    State(app_state): State<Arc<AppState>>,
    Query(page_query): Query<PageQuery>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let users = User::fetch_recommended(app_state.store.as_ref(), uuid, &page_query).await?;

    Ok((StatusCode::OK, Json(users)))
}
