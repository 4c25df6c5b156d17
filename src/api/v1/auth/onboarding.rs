use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use log::info;
use serde::Deserialize;
use uuid::Uuid;

use super::{AuthResponse, CurrentUser};
use crate::{
    AppState,
    error::Error,
    objects::Profile,
    presence::sync_in_background,
    utils::{
        MAX_BIO_LENGTH, MAX_LANGUAGE_LENGTH, MAX_LOCATION_LENGTH, MAX_NAME_LENGTH, check_length,
    },
};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    name: Option<String>,
    bio: Option<String>,
    native_language: Option<String>,
    learning_language: Option<String>,
    location: Option<String>,
}

impl OnboardingRequest {
    fn into_profile(self) -> Result<Profile, Error> {
        let mut missing = Vec::new();

        let mut take = |field: Option<String>, name: &'static str| {
            match field.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()) {
                Some(value) => value,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let profile = Profile {
            name: take(self.name, "name"),
            bio: take(self.bio, "bio"),
            native_language: take(self.native_language, "nativeLanguage"),
            learning_language: take(self.learning_language, "learningLanguage"),
            location: take(self.location, "location"),
        };

        if !missing.is_empty() {
            return Err(Error::MissingFields(missing));
        }

        check_length("name", &profile.name, MAX_NAME_LENGTH)?;
        check_length("bio", &profile.bio, MAX_BIO_LENGTH)?;
        check_length("nativeLanguage", &profile.native_language, MAX_LANGUAGE_LENGTH)?;
        check_length("learningLanguage", &profile.learning_language, MAX_LANGUAGE_LENGTH)?;
        check_length("location", &profile.location, MAX_LOCATION_LENGTH)?;

        Ok(profile)
    }
}

/// `POST /api/v1/auth/onboarding` Completes the profile and marks the user as onboarded
///
/// requires auth: yes
///
/// ### Request Example
/// ```
/// json!({
///     "name": "Ana Lopez",
///     "bio": "Learning every day",
///     "nativeLanguage": "english",
///     "learningLanguage": "spanish",
///     "location": "Lisbon"
/// });
/// ```
///
/// ### Responses
/// 200 OK, returns `{ "success": true, "user": { ... } }`
///
/// 400 Bad Request, `missingFields` lists every field that was absent or blank
///
pub async fn post(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
    Json(onboarding_request): Json<OnboardingRequest>,
) -> Result<impl IntoResponse, Error> {
    let profile = onboarding_request.into_profile()?;

    let me = app_state.store.update_profile(uuid, &profile).await?;

    info!("user {} finished onboarding", me.uuid);

    sync_in_background(app_state.presence.clone(), me.presence_user());

    Ok((StatusCode::OK, Json(AuthResponse::new(me))))
}
