use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::v1::auth::CurrentUser,
    error::Error,
    objects::{PageQuery, User},
};

/// `GET /api/v1/users/friends` Returns a page of your friends
///
/// requires auth: yes
///
/// Same parameters and shape as `GET /api/v1/users`, with `totalFriends` in place of `totalUsers`
pub async fn get(
    State(app_state): State<Arc<AppState>>,
    Query(page_query): Query<PageQuery>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let friends = User::fetch_friends(app_state.store.as_ref(), uuid, &page_query).await?;

    Ok((StatusCode::OK, Json(friends)))
}
