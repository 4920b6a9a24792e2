//! SHA-256 digests for canonical strings and hybrid secret combination

use sha2::{Digest, Sha256};

/// Size of a SHA-256 digest
pub const DIGEST_SIZE: usize = 32;

/// Compute SHA-256 over a byte slice
pub fn sha256(bytes: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Compute SHA-256 and return the lowercase hex digest
///
/// This is the form embedded in file canonical strings, so it must stay
/// bit-stable across client and server.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // NIST test vector for "abc"
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_size() {
        assert_eq!(sha256(b"x").len(), DIGEST_SIZE);
    }
}
