//! Key derivation: Argon2id for passwords, HKDF-SHA256 for subkeys

use crate::{CryptoError, Result};
use hkdf::Hkdf;
use sha2::Sha256;

/// Size of the password salt
pub const SALT_SIZE: usize = 16;

/// Size of a derived master key
pub const DERIVED_KEY_SIZE: usize = 32;

/// Subkey contexts are exactly this many ASCII bytes
pub const CONTEXT_SIZE: usize = 8;

// Argon2id moderate profile: 64 MiB, 3 passes, 1 lane. Interactive logins
// stay under ~200 ms on commodity hardware.
const ARGON2_MEMORY_KIB: u32 = 64 * 1024;
const ARGON2_PASSES: u32 = 3;
const ARGON2_LANES: u32 = 1;

/// Derive the password-wrapping key from a password and 16-byte salt
pub fn derive_password_key(password: &str, salt: &[u8]) -> Result<[u8; DERIVED_KEY_SIZE]> {
    if salt.len() != SALT_SIZE {
        return Err(CryptoError::invalid(format!(
            "salt must be {SALT_SIZE} bytes, got {}",
            salt.len()
        )));
    }

    let params = argon2::Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_PASSES,
        ARGON2_LANES,
        Some(DERIVED_KEY_SIZE),
    )
    .map_err(|e| CryptoError::KdfFailed(e.to_string()))?;
    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key = [0u8; DERIVED_KEY_SIZE];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KdfFailed(e.to_string()))?;
    Ok(key)
}

/// Derive a labeled subkey from a 32-byte master key
///
/// `context` must be exactly 8 ASCII bytes; together with the little-endian
/// `id` it forms the HKDF info string, so distinct `(context, id)` pairs
/// yield independent keys.
pub fn derive_subkey(master: &[u8], id: u64, context: &str, len: usize) -> Result<Vec<u8>> {
    if master.len() != DERIVED_KEY_SIZE {
        return Err(CryptoError::invalid(format!(
            "master key must be {DERIVED_KEY_SIZE} bytes, got {}",
            master.len()
        )));
    }
    if context.len() != CONTEXT_SIZE || !context.is_ascii() {
        return Err(CryptoError::invalid(format!(
            "context must be exactly {CONTEXT_SIZE} ASCII bytes, got {:?}",
            context
        )));
    }

    let mut info = [0u8; CONTEXT_SIZE + 8];
    info[..CONTEXT_SIZE].copy_from_slice(context.as_bytes());
    info[CONTEXT_SIZE..].copy_from_slice(&id.to_le_bytes());

    let hk = Hkdf::<Sha256>::new(None, master);
    let mut out = vec![0u8; len];
    hk.expand(&info, &mut out)
        .map_err(|e| CryptoError::KdfFailed(e.to_string()))?;
    Ok(out)
}
