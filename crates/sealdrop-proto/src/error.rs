//! Error taxonomies shared by client and server

use thiserror::Error;

/// Request authentication failures (map to 401 at the HTTP boundary)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A required header is absent
    #[error("missing header: {0}")]
    Missing(&'static str),

    /// Timestamp outside the replay window
    #[error("request timestamp outside the replay window")]
    Expired,

    /// A header is present but unparseable
    #[error("malformed request: {0}")]
    Malformed(String),

    /// One or both signatures failed to verify
    #[error("signature verification failed")]
    SignatureInvalid,

    /// No bundle registered for this username
    #[error("unknown user: {0}")]
    UserUnknown(String),
}

/// Server-level protocol failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Username already registered (409)
    #[error("username already registered")]
    DuplicateUsername,

    /// No such file, or not visible to the caller (404)
    #[error("file not found")]
    FileNotFound,

    /// Authenticated but not allowed (403)
    #[error("unauthorized")]
    Unauthorized,

    /// Anything the server cannot express otherwise (500)
    #[error("internal server error")]
    InternalServerError,
}
