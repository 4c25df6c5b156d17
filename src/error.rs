use std::{io, sync::Arc};

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deadpool::managed::{BuildError, PoolError};
use diesel::{ConnectionError, result::Error as DieselError};
use diesel_async::pooled_connection::PoolError as DieselPoolError;
use log::{debug, error};
use serde::Serialize;
use serde_json::Error as JsonError;
use thiserror::Error;
use tokio::task::JoinError;
use toml::de::Error as TomlError;

use crate::AppState;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    SqlError(#[from] DieselError),
    #[error(transparent)]
    PoolError(#[from] PoolError<DieselPoolError>),
    #[error(transparent)]
    BuildError(#[from] BuildError),
    #[error(transparent)]
    ConnectionError(#[from] ConnectionError),
    #[error(transparent)]
    JoinError(#[from] JoinError),
    #[error(transparent)]
    IoError(#[from] io::Error),
    #[error(transparent)]
    TomlError(#[from] TomlError),
    #[error(transparent)]
    JsonError(#[from] JsonError),
    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error("{0}")]
    MigrationError(String),
    #[error("{0}")]
    ConfigError(String),
    #[error("{0}")]
    PasswordHashError(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("All fields are required")]
    MissingFields(Vec<&'static str>),
    #[error("{0}")]
    InvalidOperation(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::SqlError(DieselError::NotFound) | Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_)
            | Error::MissingFields(_)
            | Error::InvalidOperation(_)
            | Error::InvalidState(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{}: {}", status, self);

            let mut response = (status, Json(WebError::internal(None))).into_response();
            response
                .extensions_mut()
                .insert(InternalDetail(self.to_string()));

            return response;
        }

        debug!("{}: {}", status, self);

        let missing_fields = match &self {
            Error::MissingFields(fields) => Some(fields.clone()),
            _ => None,
        };

        let body = WebError {
            message: self.to_string(),
            missing_fields,
            error: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Detail of a 500, kept out of the body unless the instance is in development
#[derive(Clone, Debug)]
struct InternalDetail(String);

/// Response mapper that adds [`InternalDetail`] to the body as `error` on development instances
pub async fn expose_internal_detail(
    State(app_state): State<Arc<AppState>>,
    response: Response,
) -> Response {
    with_internal_detail(response, app_state.config.instance.development)
}

fn with_internal_detail(mut response: Response, expose: bool) -> Response {
    match response.extensions_mut().remove::<InternalDetail>() {
        Some(InternalDetail(detail)) if expose => {
            (response.status(), Json(WebError::internal(Some(detail)))).into_response()
        }
        _ => response,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebError {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_fields: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl WebError {
    fn internal(detail: Option<String>) -> Self {
        Self {
            message: "Internal server error".to_string(),
            missing_fields: None,
            error: detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friend_request_errors_map_to_client_statuses() {
        assert_eq!(
            Error::InvalidOperation("self".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::InvalidState("resolved".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Forbidden("not yours".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::Conflict("exists".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::SqlError(DieselError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn storage_and_config_failures_are_internal() {
        let error = Error::MigrationError("relation already exists".to_string());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(
            Error::ConfigError("bad origin".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_detail_is_hidden_unless_exposed() {
        let response = || Error::MigrationError("relation already exists".to_string()).into_response();

        let hidden = body_of(with_internal_detail(response(), false)).await;
        assert_eq!(hidden["message"], "Internal server error");
        assert!(hidden.get("error").is_none());

        let exposed = with_internal_detail(response(), true);
        assert_eq!(exposed.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let exposed = body_of(exposed).await;
        assert_eq!(exposed["message"], "Internal server error");
        assert_eq!(exposed["error"], "relation already exists");
    }

    #[tokio::test]
    async fn client_errors_are_never_rewritten() {
        let response = Error::Conflict("Friend request already exists.".to_string()).into_response();

        let body = body_of(with_internal_detail(response, true)).await;
        assert_eq!(body["message"], "Friend request already exists.");
        assert!(body.get("error").is_none());
    }
}
