//! Envelope encryption for file content and metadata
//!
//! Every file gets a fresh FEK (content) and MEK (metadata), each used with
//! its own random 16-byte nonce. The record stored on the server is
//! authenticated by a dual signature over the canonical string
//! `owner|sha256(content)|sha256(metadata)` computed on ciphertext bytes,
//! so the server never needs the plaintext to validate an upload.

use crate::bundle::KeyBundle;
use crate::cipher::{self, IV_SIZE, KEY_SIZE};
use crate::encoding::{b64_decode, b64_encode};
use crate::hashing::sha256_hex;
use crate::rng::random_array;
use crate::signer::HybridSignature;
use crate::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Plaintext metadata attached to an upload
///
/// Serialized in field order; the same process encrypts and decrypts, so no
/// canonical key sorting is needed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub original_filename: String,
    pub file_size_bytes: u64,
    pub file_type: String,
}

impl FileMetadata {
    /// Describe a plaintext buffer
    pub fn for_content(filename: impl Into<String>, content: &[u8], file_type: impl Into<String>) -> Self {
        Self {
            original_filename: filename.into(),
            file_size_bytes: content.len() as u64,
            file_type: file_type.into(),
        }
    }
}

use crate::encoding::base64_array_serde as b64_array;

/// Per-file secrets held by the owner (and by recipients after a share)
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ClientFileData {
    pub file_id: u64,
    pub filename: String,
    #[serde(rename = "fek_b64", with = "b64_array")]
    pub fek: [u8; KEY_SIZE],
    #[serde(rename = "file_nonce_b64", with = "b64_array")]
    pub file_nonce: [u8; IV_SIZE],
    #[serde(rename = "mek_b64", with = "b64_array")]
    pub mek: [u8; KEY_SIZE],
    #[serde(rename = "metadata_nonce_b64", with = "b64_array")]
    pub metadata_nonce: [u8; IV_SIZE],
}

impl std::fmt::Debug for ClientFileData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ClientFileData(file_id={}, filename={:?}, keys=[REDACTED])",
            self.file_id, self.filename
        )
    }
}

/// Result of envelope-encrypting one file
pub struct EncryptedFile {
    pub enc_content: Vec<u8>,
    pub enc_metadata: Vec<u8>,
    pub client_data: ClientFileData,
}

/// Encrypt content and metadata under fresh keys
///
/// `client_data.file_id` is zero until the server assigns one at upload.
/// Zero-length content is allowed; an empty filename is not.
pub fn encrypt_file(plaintext: &[u8], metadata: &FileMetadata) -> Result<EncryptedFile> {
    if metadata.original_filename.is_empty() {
        return Err(CryptoError::invalid("filename must not be empty"));
    }

    let fek: [u8; KEY_SIZE] = random_array();
    let mek: [u8; KEY_SIZE] = random_array();
    let file_nonce: [u8; IV_SIZE] = random_array();
    let metadata_nonce: [u8; IV_SIZE] = random_array();

    let metadata_json =
        serde_json::to_vec(metadata).map_err(|e| CryptoError::invalid(e.to_string()))?;

    let enc_content = cipher::encrypt_with_iv(plaintext, &fek, &file_nonce)?;
    let enc_metadata = cipher::encrypt_with_iv(&metadata_json, &mek, &metadata_nonce)?;

    Ok(EncryptedFile {
        enc_content,
        enc_metadata,
        client_data: ClientFileData {
            file_id: 0,
            filename: metadata.original_filename.clone(),
            fek,
            file_nonce,
            mek,
            metadata_nonce,
        },
    })
}

/// Decrypt file content with its FEK and nonce
pub fn decrypt_content(enc_content: &[u8], fek: &[u8], file_nonce: &[u8]) -> Result<Vec<u8>> {
    cipher::decrypt(enc_content, fek, file_nonce)
}

/// Decrypt and parse metadata with its MEK and nonce
pub fn decrypt_metadata(
    enc_metadata: &[u8],
    mek: &[u8],
    metadata_nonce: &[u8],
) -> Result<FileMetadata> {
    let mut plaintext = cipher::decrypt(enc_metadata, mek, metadata_nonce)?;
    let parsed = serde_json::from_slice(&plaintext)
        .map_err(|e| CryptoError::invalid(format!("metadata JSON: {e}")));
    plaintext.zeroize();
    parsed
}

/// The canonical string both file signatures cover
///
/// `{owner}|{sha256_hex(content_bytes)}|{sha256_hex(metadata_bytes)}`
pub fn file_canonical(
    owner_username: &str,
    enc_content_b64: &str,
    enc_metadata_b64: &str,
) -> Result<String> {
    let content = b64_decode(enc_content_b64)?;
    let metadata = b64_decode(enc_metadata_b64)?;
    Ok(format!(
        "{}|{}|{}",
        owner_username,
        sha256_hex(&content),
        sha256_hex(&metadata)
    ))
}

/// Sign a file record; returns `(pre_sig_b64, post_sig_b64)`
pub fn sign_file_record(
    owner_username: &str,
    enc_content_b64: &str,
    enc_metadata_b64: &str,
    bundle: &KeyBundle,
) -> Result<(String, String)> {
    let canonical = file_canonical(owner_username, enc_content_b64, enc_metadata_b64)?;
    let sig = bundle.sign_hybrid(canonical.as_bytes())?;
    Ok((b64_encode(&sig.classical), b64_encode(&sig.post_quantum)))
}

/// Check both signatures of a file record against the owner's public bundle
pub fn verify_file_record(
    owner_username: &str,
    enc_content_b64: &str,
    enc_metadata_b64: &str,
    pre_sig_b64: &str,
    post_sig_b64: &str,
    bundle: &KeyBundle,
) -> bool {
    let Ok(canonical) = file_canonical(owner_username, enc_content_b64, enc_metadata_b64) else {
        return false;
    };
    let (Ok(classical), Ok(post_quantum)) = (b64_decode(pre_sig_b64), b64_decode(post_sig_b64))
    else {
        return false;
    };
    bundle.verify_hybrid(
        canonical.as_bytes(),
        &HybridSignature {
            classical,
            post_quantum,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> FileMetadata {
        FileMetadata {
            original_filename: "a.txt".to_string(),
            file_size_bytes: 11,
            file_type: "text/plain".to_string(),
        }
    }

    #[test]
    fn envelope_roundtrip_byte_exact() {
        let plaintext = b"hello world";
        let metadata = sample_metadata();
        let encrypted = encrypt_file(plaintext, &metadata).unwrap();

        let content = decrypt_content(
            &encrypted.enc_content,
            &encrypted.client_data.fek,
            &encrypted.client_data.file_nonce,
        )
        .unwrap();
        assert_eq!(content.as_slice(), plaintext.as_slice());

        let restored = decrypt_metadata(
            &encrypted.enc_metadata,
            &encrypted.client_data.mek,
            &encrypted.client_data.metadata_nonce,
        )
        .unwrap();
        assert_eq!(restored, metadata);
    }

    #[test]
    fn zero_length_file_allowed() {
        let metadata = FileMetadata::for_content("empty.bin", b"", "application/octet-stream");
        let encrypted = encrypt_file(b"", &metadata).unwrap();
        assert!(encrypted.enc_content.is_empty());
        let content = decrypt_content(
            &encrypted.enc_content,
            &encrypted.client_data.fek,
            &encrypted.client_data.file_nonce,
        )
        .unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn empty_filename_rejected() {
        let metadata = FileMetadata {
            original_filename: String::new(),
            file_size_bytes: 0,
            file_type: "text/plain".to_string(),
        };
        assert!(encrypt_file(b"data", &metadata).is_err());
    }

    #[test]
    fn fresh_keys_every_call() {
        let metadata = sample_metadata();
        let a = encrypt_file(b"hello world", &metadata).unwrap();
        let b = encrypt_file(b"hello world", &metadata).unwrap();
        assert_ne!(a.client_data.fek, b.client_data.fek);
        assert_ne!(a.client_data.mek, b.client_data.mek);
        assert_ne!(a.client_data.file_nonce, b.client_data.file_nonce);
        assert_ne!(a.client_data.metadata_nonce, b.client_data.metadata_nonce);
        assert_ne!(a.enc_content, b.enc_content);
    }

    #[test]
    fn fek_and_mek_are_independent() {
        let metadata = sample_metadata();
        let encrypted = encrypt_file(b"hello world", &metadata).unwrap();
        // Content does not decrypt under the MEK
        let garbled = decrypt_content(
            &encrypted.enc_content,
            &encrypted.client_data.mek,
            &encrypted.client_data.file_nonce,
        )
        .unwrap();
        assert_ne!(garbled.as_slice(), b"hello world".as_slice());
    }

    #[test]
    fn client_data_json_layout() {
        let metadata = sample_metadata();
        let mut data = encrypt_file(b"hello world", &metadata).unwrap().client_data;
        data.file_id = 7;
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["file_id"], 7);
        assert_eq!(json["filename"], "a.txt");
        for key in ["fek_b64", "file_nonce_b64", "mek_b64", "metadata_nonce_b64"] {
            assert!(json[key].is_string(), "missing {key}");
        }

        let restored: ClientFileData = serde_json::from_value(json).unwrap();
        assert_eq!(restored.fek, data.fek);
        assert_eq!(restored.metadata_nonce, data.metadata_nonce);
    }

    #[test]
    fn canonical_string_shape() {
        let canonical = file_canonical("alice", &b64_encode(b"ct"), &b64_encode(b"md")).unwrap();
        let parts: Vec<&str> = canonical.split('|').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "alice");
        assert_eq!(parts[1].len(), 64);
        assert_eq!(parts[2].len(), 64);
    }

    #[test]
    fn file_record_sign_verify() {
        let bundle = KeyBundle::generate();
        let metadata = sample_metadata();
        let encrypted = encrypt_file(b"hello world", &metadata).unwrap();
        let content_b64 = b64_encode(&encrypted.enc_content);
        let metadata_b64 = b64_encode(&encrypted.enc_metadata);

        let (pre, post) = sign_file_record("alice", &content_b64, &metadata_b64, &bundle).unwrap();
        assert!(verify_file_record(
            "alice",
            &content_b64,
            &metadata_b64,
            &pre,
            &post,
            &bundle
        ));
        // Different owner breaks the canonical string
        assert!(!verify_file_record(
            "mallory",
            &content_b64,
            &metadata_b64,
            &pre,
            &post,
            &bundle
        ));
    }

    #[test]
    fn flipped_ciphertext_byte_fails_verification() {
        let bundle = KeyBundle::generate();
        let metadata = sample_metadata();
        let encrypted = encrypt_file(b"hello world", &metadata).unwrap();
        let content_b64 = b64_encode(&encrypted.enc_content);
        let metadata_b64 = b64_encode(&encrypted.enc_metadata);
        let (pre, post) = sign_file_record("alice", &content_b64, &metadata_b64, &bundle).unwrap();

        let mut tampered = encrypted.enc_content.clone();
        tampered[0] ^= 0x01;
        assert!(!verify_file_record(
            "alice",
            &b64_encode(&tampered),
            &metadata_b64,
            &pre,
            &post,
            &bundle
        ));
    }

    #[test]
    fn verify_tolerates_malformed_b64() {
        let bundle = KeyBundle::generate();
        assert!(!verify_file_record("alice", "!!", "??", "@@", "##", &bundle));
    }
}
