//! API error type and status mapping
//!
//! Internal errors collapse to a status code and a terse JSON body before
//! leaving the process; no diagnostic detail crosses the wire. A failed
//! authentication is always `401 {"message": "Unauthorized"}` no matter
//! which pipeline step rejected it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sealdrop_crypto::share::ShareError;
use sealdrop_proto::{AuthError, ErrorResponse, ProtocolError};
use thiserror::Error;

/// API error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Unauthorized => "Unauthorized".to_string(),
            Self::Forbidden => "Forbidden".to_string(),
            Self::NotFound => "Not found".to_string(),
            Self::Conflict(msg) | Self::BadRequest(msg) => (*msg).to_string(),
            Self::Internal => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                message: self.message(),
            }),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::debug!("authentication rejected: {err}");
        Self::Unauthorized
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::DuplicateUsername => Self::Conflict("Username already registered"),
            ProtocolError::FileNotFound => Self::NotFound,
            ProtocolError::Unauthorized => Self::Forbidden,
            ProtocolError::InternalServerError => Self::Internal,
        }
    }
}

impl From<ShareError> for ApiError {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::SelfShareForbidden => Self::BadRequest("Cannot share a file with yourself"),
            ShareError::InvalidRecipient(_) => Self::BadRequest("Invalid share recipient"),
            ShareError::AlreadyShared => Self::Conflict("File already shared with this user"),
            ShareError::NotShared => Self::NotFound,
        }
    }
}
