use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{auth::jwt::TokenError, users::StoreError};

/// Failures surfaced at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("email already exists")]
    DuplicateEmail,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DuplicateEmail => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Internal(format!("{}: {}", context, err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        Self::Validation(value.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound("user not found".into()),
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            StoreError::UnknownReferrer => Self::Validation("invalid referral code".into()),
            StoreError::CodeAlreadyActive => {
                Self::Conflict("user already has a referral code".into())
            }
            StoreError::DuplicateReferralCode => {
                Self::Conflict("referral code already exists".into())
            }
            StoreError::NoActiveCode => Self::NotFound("referral code not found".into()),
            StoreError::Database(e) => Self::Internal(format!("store: {}", e)),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Expired => Self::Unauthorized("token expired".into()),
            TokenError::Invalid => Self::Unauthorized("invalid token".into()),
            TokenError::Signing(e) => Self::Internal(format!("token signing: {}", e)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(detail) => {
                error!(error = %detail, "request failed");
                "something went wrong".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
