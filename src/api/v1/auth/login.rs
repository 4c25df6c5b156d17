use std::sync::Arc;

use argon2::{PasswordHash, PasswordVerifier};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use log::debug;
use serde::Deserialize;

use super::{AuthResponse, issue_session_token};
use crate::{AppState, error::Error, objects::Me, utils::session_cookie};

#[derive(Deserialize)]
pub struct LoginInformation {
    email: Option<String>,
    password: Option<String>,
}

fn invalid_credentials() -> Error {
    Error::Unauthorized("invalid email or password".to_string())
}

/// `POST /api/v1/auth/login` Signs in with email and password
///
/// requires auth: no
///
/// ### Request Example
/// ```
/// json!({
///     "email": "ana@example.com",
///     "password": "correct horse"
/// });
/// ```
///
/// ### Responses
/// 200 OK, sets the `jwt` cookie and returns `{ "success": true, "user": { ... } }`
///
/// 400 Bad Request, a field is missing
///
/// 401 Unauthorized, unknown email or wrong password
///
pub async fn post(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(login_information): Json<LoginInformation>,
) -> Result<impl IntoResponse, Error> {
    let (Some(email), Some(password)) = (
        login_information.email.filter(|e| !e.trim().is_empty()),
        login_information.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(Error::BadRequest("All fields are required".to_string()));
    };

    let credentials = app_state
        .store
        .find_credentials(&email.trim().to_lowercase())
        .await?
        .ok_or_else(invalid_credentials)?;

    let parsed_hash = PasswordHash::new(&credentials.password)
        .map_err(|e| Error::PasswordHashError(e.to_string()))?;

    if app_state
        .argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        debug!("wrong password for user {}", credentials.uuid);
        return Err(invalid_credentials());
    }

    let me = Me::get(app_state.store.as_ref(), credentials.uuid).await?;

    let token = issue_session_token(&app_state.config.auth, me.uuid)?;

    Ok((
        StatusCode::OK,
        jar.add(session_cookie(&app_state.config, token)),
        Json(AuthResponse::new(me)),
    ))
}
