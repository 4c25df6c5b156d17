//! `/api/v1/auth` Endpoints for registering, logging in and onboarding

use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    middleware::{Next, from_fn_with_state},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    extract::CookieJar,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    config::Auth,
    crypto::{sign_hs256, verify_hs256},
    error::Error,
    objects::Me,
    utils::SESSION_COOKIE,
};

mod login;
mod logout;
mod me;
mod onboarding;
mod register;

#[derive(Serialize)]
struct AuthResponse {
    success: bool,
    user: Me,
}

impl AuthResponse {
    fn new(user: Me) -> Self {
        Self {
            success: true,
            user,
        }
    }
}

pub fn router(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let router_with_auth = Router::new()
        .route("/onboarding", post(onboarding::post))
        .route("/me", get(me::get))
        .layer(from_fn_with_state(app_state, check_access_token_middleware));

    Router::new()
        .route("/register", post(register::post))
        .route("/login", post(login::post))
        .route("/logout", post(logout::post))
        .merge(router_with_auth)
}

#[derive(Clone)]
pub struct CurrentUser<T>(pub T);

#[derive(Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    iat: i64,
    exp: i64,
}

pub fn issue_session_token(auth: &Auth, user_uuid: Uuid) -> Result<String, Error> {
    let now = Utc::now();

    sign_hs256(
        auth.token_secret.as_bytes(),
        &SessionClaims {
            sub: user_uuid,
            iat: now.timestamp(),
            exp: (now + auth.token_lifetime).timestamp(),
        },
    )
}

pub fn check_access_token(auth: &Auth, token: &str) -> Result<Uuid, Error> {
    let claims: SessionClaims = verify_hs256(auth.token_secret.as_bytes(), token)?;

    if claims.exp <= Utc::now().timestamp() {
        return Err(Error::Unauthorized(
            "Unauthorized - Token expired".to_string(),
        ));
    }

    Ok(claims.sub)
}

/// Resolves the session from the `jwt` cookie, or a bearer token, into [`CurrentUser`]
pub async fn check_access_token_middleware(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    let token = match (jar.get(SESSION_COOKIE), &bearer) {
        (Some(cookie), _) => cookie.value().to_string(),
        (None, Some(TypedHeader(auth))) => auth.token().to_string(),
        (None, None) => {
            return Err(Error::Unauthorized(
                "Unauthorized - No token provided".to_string(),
            ));
        }
    };

    let uuid = check_access_token(&app_state.config.auth, &token)?;

    if app_state.store.find_user(uuid).await?.is_none() {
        return Err(Error::Unauthorized(
            "Unauthorized - User not found".to_string(),
        ));
    }

    req.extensions_mut().insert(CurrentUser(uuid));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(lifetime: chrono::Duration) -> Auth {
        Auth {
            token_secret: "0123456789abcdef0123456789abcdef".to_string(),
            token_lifetime: lifetime,
        }
    }

    #[test]
    fn session_tokens_identify_the_user() {
        let auth = auth(chrono::Duration::days(7));
        let uuid = Uuid::now_v7();

        let token = issue_session_token(&auth, uuid).unwrap();

        assert_eq!(check_access_token(&auth, &token).unwrap(), uuid);
    }

    #[test]
    fn expired_session_tokens_are_rejected() {
        let auth = auth(chrono::Duration::seconds(-1));

        let token = issue_session_token(&auth, Uuid::now_v7()).unwrap();

        assert!(matches!(
            check_access_token(&auth, &token),
            Err(Error::Unauthorized(_))
        ));
    }
}
