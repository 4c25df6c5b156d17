use std::sync::Arc;

use argon2::{
    PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use log::info;
use serde::Deserialize;

use super::{AuthResponse, issue_session_token};
use crate::{
    AppState,
    error::Error,
    objects::NewUser,
    presence::sync_in_background,
    utils::{
        EMAIL_REGEX, MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, MIN_PASSWORD_LENGTH, check_length,
        session_cookie,
    },
};

#[derive(Deserialize)]
pub struct AccountInformation {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

/// `POST /api/v1/auth/register` Creates an account and signs it in
///
/// requires auth: no
///
/// ### Request Example
/// ```
/// json!({
///     "name": "Ana Lopez",
///     "email": "ana@example.com",
///     "password": "correct horse"
/// });
/// ```
///
/// ### Responses
/// 201 Created, sets the `jwt` cookie and returns `{ "success": true, "user": { ... } }`
///
/// 400 Bad Request, a field is missing, the password is too short or the email is malformed
///
/// 409 Conflict, the email is already registered
///
pub async fn post(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(account_information): Json<AccountInformation>,
) -> Result<impl IntoResponse, Error> {
    let (Some(name), Some(email), Some(password)) = (
        account_information.name.filter(|n| !n.trim().is_empty()),
        account_information.email.filter(|e| !e.trim().is_empty()),
        account_information.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(Error::BadRequest("All fields are required".to_string()));
    };

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    check_length("name", name.trim(), MAX_NAME_LENGTH)?;
    check_length("email", email.trim(), MAX_EMAIL_LENGTH)?;

    if !EMAIL_REGEX.is_match(email.trim()) {
        return Err(Error::BadRequest("Invalid email format".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);

    let hashed_password = app_state
        .argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::PasswordHashError(e.to_string()))?;

    let me = app_state
        .store
        .create_user(NewUser::new(
            &name,
            &email,
            hashed_password.to_string(),
        ))
        .await?;

    info!("registered user {}", me.uuid);

    sync_in_background(app_state.presence.clone(), me.presence_user());

    let token = issue_session_token(&app_state.config.auth, me.uuid)?;

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(&app_state.config, token)),
        Json(AuthResponse::new(me)),
    ))
}
