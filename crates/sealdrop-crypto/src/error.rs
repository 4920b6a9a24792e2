//! Error types for the sealdrop-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// A key, IV, or input buffer has the wrong length or shape
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Password or subkey derivation failed
    #[error("key derivation failed: {0}")]
    KdfFailed(String),

    /// Signing failed
    #[error("signing failed: {0}")]
    SignFailed(String),

    /// Signature verification failed
    #[error("signature verification failed")]
    VerifyFailed,

    /// The OS entropy source failed
    #[error("random generation failed: {0}")]
    RandFailed(String),
}

impl CryptoError {
    /// Shorthand for the most common error kind
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
