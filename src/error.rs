use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{
    auth::{identity::IdentityError, services::SessionError},
    listings::repo::ListingError,
};

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid listing data: {0}")]
    InvalidListing(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ListingError> for AppError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::InvalidListing(msg) => AppError::InvalidListing(msg),
            ListingError::Database(e) => AppError::Database(e),
        }
    }
}

// Extractor rejections surface as 400 with the usual `{"error": ...}` body.
macro_rules! rejection_into_validation {
    ($($rejection:ty),*) => {$(
        impl From<$rejection> for AppError {
            fn from(rejection: $rejection) -> Self {
                AppError::Validation(rejection.body_text())
            }
        }
    )*};
}

rejection_into_validation!(JsonRejection, PathRejection, QueryRejection, FormRejection);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Identity(IdentityError::Provider(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Identity(_) => StatusCode::FORBIDDEN,
            AppError::Session(SessionError::NotAdmin) => StatusCode::FORBIDDEN,
            AppError::Session(SessionError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Session(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::InvalidListing(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Identity(IdentityError::Provider(_)) => {
                error!(error = %self, "identity provider unreachable");
                "Identity provider unavailable".to_string()
            }
            AppError::Identity(_) => "Untrusted credential".to_string(),
            AppError::Session(SessionError::Database(_))
            | AppError::Database(_)
            | AppError::Internal(_) => {
                error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
