//! Hybrid signing: Ed25519 (classical) + ML-DSA-87 (post-quantum)
//!
//! Each signer owns its key material exclusively. Copies are forbidden at
//! the type level (no `Clone`), moves are permitted, and secret buffers are
//! zeroized on drop. Verification is total: malformed keys or signatures of
//! the wrong length return `false`, never an error.

use crate::{CryptoError, Result};
use ed25519_dalek::{Signer as _, Verifier as _};
use pqcrypto_mldsa::mldsa87;
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as _, SecretKey as _,
};
use rand::rngs::OsRng;
use zeroize::Zeroize;

/// Ed25519 public key length
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 private keypair length (seed ‖ public)
pub const ED25519_KEYPAIR_SIZE: usize = 64;

/// Ed25519 signature length
pub const ED25519_SIGNATURE_SIZE: usize = 64;

/// ML-DSA-87 public key length (FIPS 204)
pub const MLDSA87_PUBLIC_KEY_SIZE: usize = 2592;

/// ML-DSA-87 private key length (FIPS 204 expanded form)
pub const MLDSA87_SECRET_KEY_SIZE: usize = 4896;

/// ML-DSA-87 signature length
pub const MLDSA87_SIGNATURE_SIZE: usize = 4627;

/// A hybrid signature pair; both halves must verify
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HybridSignature {
    /// Ed25519 signature (64 bytes)
    pub classical: Vec<u8>,
    /// ML-DSA-87 signature (4627 bytes)
    pub post_quantum: Vec<u8>,
}

/// Classical signer over Ed25519
pub struct Ed25519Signer {
    key: ed25519_dalek::SigningKey,
}

impl Ed25519Signer {
    /// Generate a fresh keypair
    pub fn generate() -> Self {
        Self {
            key: ed25519_dalek::SigningKey::generate(&mut OsRng),
        }
    }

    /// Load from the canonical 64-byte keypair form (seed ‖ public)
    ///
    /// The public half is re-derived from the seed and must match the
    /// trailing 32 bytes.
    pub fn from_keypair_bytes(raw: &[u8]) -> Result<Self> {
        let arr: &[u8; ED25519_KEYPAIR_SIZE] = raw.try_into().map_err(|_| {
            CryptoError::invalid(format!(
                "ed25519 keypair must be {ED25519_KEYPAIR_SIZE} bytes, got {}",
                raw.len()
            ))
        })?;
        let key = ed25519_dalek::SigningKey::from_keypair_bytes(arr)
            .map_err(|_| CryptoError::invalid("ed25519 keypair public half mismatch"))?;
        Ok(Self { key })
    }

    /// The 32-byte public key
    pub fn public_key(&self) -> [u8; ED25519_PUBLIC_KEY_SIZE] {
        self.key.verifying_key().to_bytes()
    }

    /// The canonical 64-byte private form (seed ‖ public)
    pub fn to_keypair_bytes(&self) -> [u8; ED25519_KEYPAIR_SIZE] {
        self.key.to_keypair_bytes()
    }

    /// Sign a message; always 64 bytes
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.key.sign(msg).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signer([REDACTED])")
    }
}

/// Verify an Ed25519 signature; total over all inputs
pub fn ed25519_verify(public: &[u8], msg: &[u8], sig: &[u8]) -> bool {
    let Ok(pk_arr) = <&[u8; ED25519_PUBLIC_KEY_SIZE]>::try_from(public) else {
        return false;
    };
    let Ok(vk) = ed25519_dalek::VerifyingKey::from_bytes(pk_arr) else {
        return false;
    };
    let Ok(sig_arr) = <&[u8; ED25519_SIGNATURE_SIZE]>::try_from(sig) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(sig_arr);
    vk.verify(msg, &signature).is_ok()
}

/// Post-quantum signer over ML-DSA-87
pub struct MlDsa87Signer {
    public: Vec<u8>,
    secret: Vec<u8>,
}

impl MlDsa87Signer {
    /// Generate a fresh keypair
    pub fn generate() -> Self {
        let (pk, sk) = mldsa87::keypair();
        Self {
            public: pk.as_bytes().to_vec(),
            secret: sk.as_bytes().to_vec(),
        }
    }

    /// Load from raw public and private key bytes
    ///
    /// ML-DSA private keys do not expose the public half, so both buffers
    /// are required; lengths are enforced.
    pub fn from_parts(public: &[u8], secret: &[u8]) -> Result<Self> {
        if public.len() != MLDSA87_PUBLIC_KEY_SIZE {
            return Err(CryptoError::invalid(format!(
                "ml-dsa-87 public key must be {MLDSA87_PUBLIC_KEY_SIZE} bytes, got {}",
                public.len()
            )));
        }
        if secret.len() != MLDSA87_SECRET_KEY_SIZE {
            return Err(CryptoError::invalid(format!(
                "ml-dsa-87 secret key must be {MLDSA87_SECRET_KEY_SIZE} bytes, got {}",
                secret.len()
            )));
        }
        Ok(Self {
            public: public.to_vec(),
            secret: secret.to_vec(),
        })
    }

    /// The 2592-byte public key
    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    /// The 4896-byte private key
    pub fn secret_key(&self) -> &[u8] {
        &self.secret
    }

    /// Sign a message; always 4627 bytes
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let sk = mldsa87::SecretKey::from_bytes(&self.secret)
            .map_err(|e| CryptoError::SignFailed(format!("ml-dsa-87 secret key: {e}")))?;
        Ok(mldsa87::detached_sign(msg, &sk).as_bytes().to_vec())
    }
}

impl Drop for MlDsa87Signer {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl std::fmt::Debug for MlDsa87Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MlDsa87Signer([REDACTED])")
    }
}

/// Verify an ML-DSA-87 signature; total over all inputs
pub fn mldsa87_verify(public: &[u8], msg: &[u8], sig: &[u8]) -> bool {
    if public.len() != MLDSA87_PUBLIC_KEY_SIZE || sig.len() != MLDSA87_SIGNATURE_SIZE {
        return false;
    }
    let Ok(pk) = mldsa87::PublicKey::from_bytes(public) else {
        return false;
    };
    let Ok(signature) = mldsa87::DetachedSignature::from_bytes(sig) else {
        return false;
    };
    mldsa87::verify_detached_signature(&signature, msg, &pk).is_ok()
}
