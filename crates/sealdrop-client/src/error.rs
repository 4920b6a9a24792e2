//! Client-side error types
//!
//! Raw cryptographic errors never reach the user: everything collapses to
//! one of a handful of stable messages before display. The CLI maps these
//! onto exit codes (2 = authentication, 3 = storage).

use sealdrop_crypto::share::ShareError;
use thiserror::Error;

/// Result type alias using `ClientError`
pub type Result<T> = std::result::Result<T, ClientError>;

/// Local persistence failures
#[derive(Error, Debug)]
pub enum StorageError {
    /// Store file or record does not exist
    #[error("not found")]
    NotFound,

    /// Store file exists but does not parse
    #[error("corrupt store: {0}")]
    Corrupt(String),

    /// Underlying filesystem failure
    #[error("io failure: {0}")]
    IoFailed(#[from] std::io::Error),

    /// Filesystem denied the operation
    #[error("permission denied")]
    PermissionDenied,
}

/// Errors surfaced by the client SDK
#[derive(Error, Debug)]
pub enum ClientError {
    /// Login failed to unwrap the private bundle
    #[error("Wrong password")]
    WrongPassword,

    /// Local store is unreadable
    #[error("Corrupt local data")]
    CorruptLocalData,

    /// Transport-level failure
    #[error("Network error")]
    Network(#[source] reqwest::Error),

    /// Unexpected server status; collapsed to a network failure for display
    #[error("Network error")]
    ServerStatus(u16),

    /// Server returned 401
    #[error("Authentication rejected by server")]
    AuthRejected,

    /// Server returned 404 for a file operation
    #[error("File not found")]
    FileNotFound,

    /// Downloaded record failed dual-signature verification
    #[error("Signature verification failed. File may be tampered.")]
    TamperDetected,

    /// Username already registered (server 409)
    #[error("Username already taken")]
    DuplicateUsername,

    /// Share protocol failure
    #[error(transparent)]
    Share(#[from] ShareError),

    /// An operation that needs an unlocked session was called logged out
    #[error("Not logged in")]
    NotLoggedIn,

    /// Local persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Exit code mapping for the CLI: 2 auth, 3 storage, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::WrongPassword | Self::AuthRejected | Self::NotLoggedIn => 2,
            Self::Storage(_) | Self::CorruptLocalData => 3,
            _ => 1,
        }
    }
}

impl From<sealdrop_crypto::CryptoError> for ClientError {
    // Crypto details stay internal; a failed unwrap of local secrets reads
    // as corrupt data, never as a cipher diagnostic.
    fn from(err: sealdrop_crypto::CryptoError) -> Self {
        tracing::debug!("crypto error collapsed: {err}");
        Self::CorruptLocalData
    }
}
