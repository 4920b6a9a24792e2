//! Hybrid key encapsulation: X25519 (classical) + ML-KEM-1024 (post-quantum)
//!
//! The classical variant's "ciphertext" is an ephemeral public key; the
//! post-quantum ciphertext is the 1568-byte ML-KEM encapsulation. Both
//! variants are always invoked and their shared secrets combined through
//! SHA-256 so the transport key is no weaker than the stronger scheme.

use crate::hashing::sha256;
use crate::{CryptoError, Result};
use pqcrypto_mlkem::mlkem1024;
use pqcrypto_traits::kem::{
    Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _,
};
use rand::rngs::OsRng;
use zeroize::Zeroize;

/// X25519 public/secret key length
pub const X25519_KEY_SIZE: usize = 32;

/// ML-KEM-1024 public key length (FIPS 203)
pub const MLKEM1024_PUBLIC_KEY_SIZE: usize = 1568;

/// ML-KEM-1024 secret key length
pub const MLKEM1024_SECRET_KEY_SIZE: usize = 3168;

/// ML-KEM-1024 ciphertext length
pub const MLKEM1024_CIPHERTEXT_SIZE: usize = 1568;

/// Length of every shared secret, classical, post-quantum, and combined
pub const SHARED_SECRET_SIZE: usize = 32;

/// Classical KEM over X25519
pub struct EcdhKem {
    secret: x25519_dalek::StaticSecret,
}

impl EcdhKem {
    /// Generate a fresh keypair
    pub fn generate() -> Self {
        Self {
            secret: x25519_dalek::StaticSecret::random_from_rng(OsRng),
        }
    }

    /// Load from the raw 32-byte secret scalar
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let arr: [u8; X25519_KEY_SIZE] = raw.try_into().map_err(|_| {
            CryptoError::invalid(format!(
                "x25519 secret must be {X25519_KEY_SIZE} bytes, got {}",
                raw.len()
            ))
        })?;
        Ok(Self {
            secret: x25519_dalek::StaticSecret::from(arr),
        })
    }

    /// The public key (scalarmult of the basepoint)
    pub fn public_key(&self) -> [u8; X25519_KEY_SIZE] {
        *x25519_dalek::PublicKey::from(&self.secret).as_bytes()
    }

    /// The raw secret scalar
    pub fn secret_bytes(&self) -> [u8; X25519_KEY_SIZE] {
        self.secret.to_bytes()
    }

    /// Recover the shared secret from an ephemeral public key
    pub fn decap(&self, ciphertext: &[u8]) -> Result<[u8; SHARED_SECRET_SIZE]> {
        let arr: [u8; X25519_KEY_SIZE] = ciphertext.try_into().map_err(|_| {
            CryptoError::invalid(format!(
                "x25519 ciphertext must be {X25519_KEY_SIZE} bytes, got {}",
                ciphertext.len()
            ))
        })?;
        let ephemeral = x25519_dalek::PublicKey::from(arr);
        let shared = self.secret.diffie_hellman(&ephemeral);
        Ok(*shared.as_bytes())
    }
}

impl std::fmt::Debug for EcdhKem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EcdhKem([REDACTED])")
    }
}

/// Encapsulate to an X25519 public key; returns `(ephemeral_public, shared)`
pub fn ecdh_encap(peer_public: &[u8]) -> Result<(Vec<u8>, [u8; SHARED_SECRET_SIZE])> {
    let arr: [u8; X25519_KEY_SIZE] = peer_public.try_into().map_err(|_| {
        CryptoError::invalid(format!(
            "x25519 public key must be {X25519_KEY_SIZE} bytes, got {}",
            peer_public.len()
        ))
    })?;
    let peer = x25519_dalek::PublicKey::from(arr);
    let ephemeral_secret = x25519_dalek::EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = x25519_dalek::PublicKey::from(&ephemeral_secret);
    let shared = ephemeral_secret.diffie_hellman(&peer);
    Ok((ephemeral_public.as_bytes().to_vec(), *shared.as_bytes()))
}

/// Post-quantum KEM over ML-KEM-1024
pub struct MlKem1024 {
    public: Vec<u8>,
    secret: Vec<u8>,
}

impl MlKem1024 {
    /// Generate a fresh keypair
    pub fn generate() -> Self {
        let (pk, sk) = mlkem1024::keypair();
        Self {
            public: pk.as_bytes().to_vec(),
            secret: sk.as_bytes().to_vec(),
        }
    }

    /// Load from raw public and private key bytes
    pub fn from_parts(public: &[u8], secret: &[u8]) -> Result<Self> {
        if public.len() != MLKEM1024_PUBLIC_KEY_SIZE {
            return Err(CryptoError::invalid(format!(
                "ml-kem-1024 public key must be {MLKEM1024_PUBLIC_KEY_SIZE} bytes, got {}",
                public.len()
            )));
        }
        if secret.len() != MLKEM1024_SECRET_KEY_SIZE {
            return Err(CryptoError::invalid(format!(
                "ml-kem-1024 secret key must be {MLKEM1024_SECRET_KEY_SIZE} bytes, got {}",
                secret.len()
            )));
        }
        Ok(Self {
            public: public.to_vec(),
            secret: secret.to_vec(),
        })
    }

    /// The 1568-byte public key
    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    /// The 3168-byte private key
    pub fn secret_key(&self) -> &[u8] {
        &self.secret
    }

    /// Recover the shared secret from an ML-KEM ciphertext
    pub fn decap(&self, ciphertext: &[u8]) -> Result<[u8; SHARED_SECRET_SIZE]> {
        if ciphertext.len() != MLKEM1024_CIPHERTEXT_SIZE {
            return Err(CryptoError::invalid(format!(
                "ml-kem-1024 ciphertext must be {MLKEM1024_CIPHERTEXT_SIZE} bytes, got {}",
                ciphertext.len()
            )));
        }
        let ct = mlkem1024::Ciphertext::from_bytes(ciphertext)
            .map_err(|e| CryptoError::invalid(format!("ml-kem-1024 ciphertext: {e}")))?;
        let sk = mlkem1024::SecretKey::from_bytes(&self.secret)
            .map_err(|e| CryptoError::invalid(format!("ml-kem-1024 secret key: {e}")))?;
        let ss = mlkem1024::decapsulate(&ct, &sk);
        let mut out = [0u8; SHARED_SECRET_SIZE];
        out.copy_from_slice(ss.as_bytes());
        Ok(out)
    }
}

impl Drop for MlKem1024 {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl std::fmt::Debug for MlKem1024 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MlKem1024([REDACTED])")
    }
}

/// Encapsulate to an ML-KEM-1024 public key; returns `(ciphertext, shared)`
pub fn mlkem_encap(peer_public: &[u8]) -> Result<(Vec<u8>, [u8; SHARED_SECRET_SIZE])> {
    if peer_public.len() != MLKEM1024_PUBLIC_KEY_SIZE {
        return Err(CryptoError::invalid(format!(
            "ml-kem-1024 public key must be {MLKEM1024_PUBLIC_KEY_SIZE} bytes, got {}",
            peer_public.len()
        )));
    }
    let pk = mlkem1024::PublicKey::from_bytes(peer_public)
        .map_err(|e| CryptoError::invalid(format!("ml-kem-1024 public key: {e}")))?;
    let (ss, ct) = mlkem1024::encapsulate(&pk);
    let mut out = [0u8; SHARED_SECRET_SIZE];
    out.copy_from_slice(ss.as_bytes());
    Ok((ct.as_bytes().to_vec(), out))
}

/// Bind the two shared secrets into one transport key
///
/// `K = SHA256(ss_classical ‖ ss_pq)`; both inputs are wiped before return.
pub fn combine_shared_secrets(
    ss_classical: &mut [u8; SHARED_SECRET_SIZE],
    ss_pq: &mut [u8; SHARED_SECRET_SIZE],
) -> [u8; SHARED_SECRET_SIZE] {
    let mut ikm = [0u8; 2 * SHARED_SECRET_SIZE];
    ikm[..SHARED_SECRET_SIZE].copy_from_slice(ss_classical);
    ikm[SHARED_SECRET_SIZE..].copy_from_slice(ss_pq);
    let key = sha256(&ikm);
    ikm.zeroize();
    ss_classical.zeroize();
    ss_pq.zeroize();
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdh_encap_decap_roundtrip() {
        let kem = EcdhKem::generate();
        let (ct, sender_ss) = ecdh_encap(&kem.public_key()).unwrap();
        assert_eq!(ct.len(), X25519_KEY_SIZE);
        let receiver_ss = kem.decap(&ct).unwrap();
        assert_eq!(sender_ss, receiver_ss);
    }

    #[test]
    fn ecdh_secret_roundtrip() {
        let kem = EcdhKem::generate();
        let restored = EcdhKem::from_bytes(&kem.secret_bytes()).unwrap();
        assert_eq!(restored.public_key(), kem.public_key());
    }

    #[test]
    fn mlkem_encap_decap_roundtrip() {
        let kem = MlKem1024::generate();
        assert_eq!(kem.public_key().len(), MLKEM1024_PUBLIC_KEY_SIZE);
        assert_eq!(kem.secret_key().len(), MLKEM1024_SECRET_KEY_SIZE);

        let (ct, sender_ss) = mlkem_encap(kem.public_key()).unwrap();
        assert_eq!(ct.len(), MLKEM1024_CIPHERTEXT_SIZE);
        let receiver_ss = kem.decap(&ct).unwrap();
        assert_eq!(sender_ss, receiver_ss);
    }

    #[test]
    fn mlkem_parts_roundtrip() {
        let kem = MlKem1024::generate();
        let restored = MlKem1024::from_parts(kem.public_key(), kem.secret_key()).unwrap();
        let (ct, ss) = mlkem_encap(kem.public_key()).unwrap();
        assert_eq!(restored.decap(&ct).unwrap(), ss);
    }

    #[test]
    fn wrong_recipient_diverges() {
        let intended = MlKem1024::generate();
        let other = MlKem1024::generate();
        let (ct, ss) = mlkem_encap(intended.public_key()).unwrap();
        // ML-KEM decapsulation with the wrong key yields an implicit-rejection
        // secret rather than an error.
        let wrong = other.decap(&ct).unwrap();
        assert_ne!(ss, wrong);
    }

    #[test]
    fn combine_is_order_sensitive_and_wipes() {
        let mut a = [1u8; SHARED_SECRET_SIZE];
        let mut b = [2u8; SHARED_SECRET_SIZE];
        let k1 = combine_shared_secrets(&mut a, &mut b);
        assert_eq!(a, [0u8; SHARED_SECRET_SIZE]);
        assert_eq!(b, [0u8; SHARED_SECRET_SIZE]);

        let mut a = [2u8; SHARED_SECRET_SIZE];
        let mut b = [1u8; SHARED_SECRET_SIZE];
        let k2 = combine_shared_secrets(&mut a, &mut b);
        assert_ne!(k1, k2);
    }

    #[test]
    fn encapsulation_randomness() {
        let kem = MlKem1024::generate();
        let (ct1, ss1) = mlkem_encap(kem.public_key()).unwrap();
        let (ct2, ss2) = mlkem_encap(kem.public_key()).unwrap();
        assert_ne!(ct1, ct2);
        assert_ne!(ss1, ss2);
    }

    #[test]
    fn bad_lengths_rejected() {
        let kem = EcdhKem::generate();
        assert!(kem.decap(&[0u8; 31]).is_err());
        assert!(EcdhKem::from_bytes(&[0u8; 16]).is_err());
        assert!(mlkem_encap(&[0u8; 100]).is_err());
        let pq = MlKem1024::generate();
        assert!(pq.decap(&[0u8; 100]).is_err());
    }
}
