//! # Sealdrop Client
//!
//! Client SDK for the Sealdrop end-to-end encrypted file-sharing service:
//! the encrypted local store (user record wrapped under a password-derived
//! key, per-file secrets), envelope encryption of uploads, dual-signature
//! request authentication, and signature verification of every download.
//!
//! The server only ever sees ciphertext, public bundles, and signatures.

pub mod api;
pub mod config;
pub mod error;
pub mod store;

pub use api::ApiClient;
pub use config::Config;
pub use error::{ClientError, Result, StorageError};
pub use store::{ClientStore, StoredUser, UnlockedView};
