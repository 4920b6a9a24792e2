//! Symmetric encryption: AES-256-CTR with a random 16-byte IV
//!
//! Deliberately unauthenticated. Ciphertext integrity is asserted one layer
//! up by the dual signatures over the stored blobs, so the same signatures
//! authenticate both storage and transport. Output length always equals
//! input length.

use crate::{CryptoError, Result};
use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use rand::rngs::OsRng;
use rand::RngCore;

type Aes256Ctr = Ctr128BE<Aes256>;

/// Size of a symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of a CTR IV in bytes (full AES block)
pub const IV_SIZE: usize = 16;

/// Encrypt with a fresh random IV; returns `(ciphertext, iv)`
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<(Vec<u8>, [u8; IV_SIZE])> {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    let ciphertext = apply(plaintext, key, &iv)?;
    Ok((ciphertext, iv))
}

/// Encrypt under a caller-supplied IV
pub fn encrypt_with_iv(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    apply(plaintext, key, iv)
}

/// Decrypt; fails only on malformed key/IV length
pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    apply(ciphertext, key, iv)
}

// CTR is an involution: the same keystream xor both directions.
fn apply(data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::invalid(format!(
            "key must be {KEY_SIZE} bytes, got {}",
            key.len()
        )));
    }
    if iv.len() != IV_SIZE {
        return Err(CryptoError::invalid(format!(
            "iv must be {IV_SIZE} bytes, got {}",
            iv.len()
        )));
    }
    let mut cipher = Aes256Ctr::new_from_slices(key, iv)
        .map_err(|e| CryptoError::invalid(format!("cipher init: {e}")))?;
    let mut buf = data.to_vec();
    cipher.apply_keystream(&mut buf);
    Ok(buf)
}
