use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::types::api::ErrorBody;

pub type AppResult<T> = std::result::Result<T, AppError>;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid input")]
pub struct ValidationErrors(pub Vec<FieldError>);

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        ValidationErrors(vec![error])
    }
}

/// Failure of the backing paste store.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StorageError {
    #[error("database error")]
    Database {
        #[from]
        source: sqlx::Error,
    },
}

/// Errors produced by the paste lifecycle operations.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("storage error")]
    Storage {
        #[from]
        source: StorageError,
    },
}

impl From<sqlx::Error> for AppError {
    fn from(source: sqlx::Error) -> Self {
        AppError::Storage {
            source: source.into(),
        }
    }
}

/// Errors as the HTTP API reports them.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("Paste not found")]
    NotFound,
    #[error("Invalid input")]
    Validation(ValidationErrors),
    #[error("Invalid paste id.")]
    InvalidId,
    #[error("Failed to create paste")]
    CreateFailed,
    #[error("An error occurred fetching the paste")]
    FetchFailed,
}

impl ApiError {
    /// Map a lifecycle error raised while creating a paste.
    pub fn on_create(error: AppError) -> Self {
        match error {
            AppError::Validation(errors) => ApiError::Validation(errors),
            AppError::Storage { source } => {
                error!("paste creation failed: {source:?}");
                ApiError::CreateFailed
            }
        }
    }

    /// Map a lifecycle error raised while reading a paste.
    pub fn on_fetch(error: AppError) -> Self {
        match error {
            AppError::Validation(_) => ApiError::InvalidId,
            AppError::Storage { source } => {
                error!("paste fetch failed: {source:?}");
                ApiError::FetchFailed
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(FieldError::new("body", rejection.body_text()).into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidId => StatusCode::BAD_REQUEST,
            ApiError::CreateFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::FetchFailed => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error = format!("{self}");
        let details = match self {
            ApiError::Validation(errors) => Some(errors.0),
            _ => None,
        };

        (
            status_code,
            Json(ErrorBody {
                ok: false,
                error,
                details,
            }),
        )
            .into_response()
    }
}
