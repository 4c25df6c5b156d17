//! `/api/v1` Contains version 1 of the api

use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state};

use crate::AppState;

mod auth;
mod chats;
mod users;

pub fn router(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let router_with_auth = Router::new()
        .nest("/users", users::router())
        .nest("/chats", chats::router())
        .layer(from_fn_with_state(
            app_state.clone(),
            auth::check_access_token_middleware,
        ));

    Router::new()
        .nest("/auth", auth::router(app_state))
        .merge(router_with_auth)
}
