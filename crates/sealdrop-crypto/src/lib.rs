//! # Sealdrop Crypto
//!
//! Cryptographic core for the Sealdrop end-to-end encrypted file-sharing
//! service. The server stores opaque ciphertext; everything here runs on
//! the client (and, for verification, on the server boundary).
//!
//! ## Hybrid post-quantum protection
//!
//! Every identity carries classical and post-quantum keypairs, used
//! together everywhere:
//!
//! - **Signing**: Ed25519 + ML-DSA-87 (FIPS 204); both signatures must
//!   verify, for requests and for stored file records.
//! - **KEM**: X25519 + ML-KEM-1024 (FIPS 203); shared secrets are bound
//!   through SHA-256 so a break of either scheme alone does not expose a
//!   share.
//!
//! ## Envelope encryption
//!
//! File content is encrypted under a per-file FEK, metadata under a
//! per-file MEK, both AES-256-CTR with random 16-byte IVs. The cipher is
//! deliberately unauthenticated: integrity lives one layer up in the dual
//! signatures over the ciphertext, which authenticate storage and
//! transport with the same key material.
//!
//! ## Trust model
//!
//! - All encryption happens client-side; private keys never leave the
//!   client device unencrypted.
//! - The at-rest user record wraps the master key under an Argon2id
//!   password key, and the private bundle under the master key.
//! - Secret buffers are zeroized on drop; signer and KEM values own their
//!   secrets exclusively and cannot be cloned.

pub mod bundle;
pub mod cipher;
pub mod encoding;
pub mod error;
pub mod filecrypto;
pub mod hashing;
pub mod kdf;
pub mod kem;
pub mod rng;
pub mod share;
pub mod signer;
pub mod spki;

pub use bundle::KeyBundle;
pub use cipher::{decrypt, encrypt, encrypt_with_iv, IV_SIZE, KEY_SIZE};
pub use encoding::{b64_decode, b64_encode};
pub use error::{CryptoError, Result};
pub use filecrypto::{
    decrypt_content, decrypt_metadata, encrypt_file, file_canonical, sign_file_record,
    verify_file_record, ClientFileData, EncryptedFile, FileMetadata,
};
pub use hashing::{sha256, sha256_hex};
pub use kdf::{derive_password_key, derive_subkey, SALT_SIZE};
pub use kem::{EcdhKem, MlKem1024, SHARED_SECRET_SIZE};
pub use rng::{random_array, random_bytes, wipe};
pub use share::{create_share, receive_share, ShareError, ShareGrant};
pub use signer::{
    ed25519_verify, mldsa87_verify, Ed25519Signer, HybridSignature, MlDsa87Signer,
};
pub use spki::{spki_unwrap, spki_wrap, SpkiAlgorithm};
