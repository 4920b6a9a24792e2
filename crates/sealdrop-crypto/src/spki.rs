//! DER SubjectPublicKeyInfo framing for the classical public keys
//!
//! Ed25519 and X25519 public keys travel as 44-byte RFC 8410 SPKI blobs.
//! The DER header for these algorithms is a fixed 12-byte prefix, so
//! wrapping is a concatenation and unwrapping is a prefix check.

use crate::{CryptoError, Result};

/// Length of a raw Curve25519 public key
pub const RAW_KEY_SIZE: usize = 32;

/// Length of the SPKI-framed form
pub const SPKI_KEY_SIZE: usize = 44;

/// The two classical algorithms that get SPKI framing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpkiAlgorithm {
    /// id-Ed25519, OID 1.3.101.112
    Ed25519,
    /// id-X25519, OID 1.3.101.110
    X25519,
}

impl SpkiAlgorithm {
    /// DER prefix: SEQUENCE(44) { SEQUENCE { OID }, BIT STRING(33) }
    fn prefix(self) -> [u8; 12] {
        let oid_octet = match self {
            Self::Ed25519 => 0x70,
            Self::X25519 => 0x6e,
        };
        [
            0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, oid_octet, 0x03, 0x21, 0x00,
        ]
    }
}

/// Frame a raw 32-byte public key as SPKI DER
pub fn spki_wrap(alg: SpkiAlgorithm, raw: &[u8]) -> Result<[u8; SPKI_KEY_SIZE]> {
    if raw.len() != RAW_KEY_SIZE {
        return Err(CryptoError::invalid(format!(
            "raw public key must be {RAW_KEY_SIZE} bytes, got {}",
            raw.len()
        )));
    }
    let mut out = [0u8; SPKI_KEY_SIZE];
    out[..12].copy_from_slice(&alg.prefix());
    out[12..].copy_from_slice(raw);
    Ok(out)
}

/// Strip the SPKI framing, checking the algorithm prefix
pub fn spki_unwrap(alg: SpkiAlgorithm, der: &[u8]) -> Result<[u8; RAW_KEY_SIZE]> {
    if der.len() != SPKI_KEY_SIZE {
        return Err(CryptoError::invalid(format!(
            "SPKI blob must be {SPKI_KEY_SIZE} bytes, got {}",
            der.len()
        )));
    }
    if der[..12] != alg.prefix() {
        return Err(CryptoError::invalid("SPKI prefix does not match algorithm"));
    }
    let mut raw = [0u8; RAW_KEY_SIZE];
    raw.copy_from_slice(&der[12..]);
    Ok(raw)
}
