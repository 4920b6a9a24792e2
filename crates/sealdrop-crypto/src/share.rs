//! Rewrapping per-file secrets for a recipient
//!
//! A share hands the recipient the file's FEK and MEK without the server
//! ever seeing either. Both KEMs run against the recipient's bundle, the
//! shared secrets are bound into one key, and the FEK/MEK are encrypted
//! under it with fresh IVs. The server schema has a single ephemeral slot,
//! so the classical ephemeral public key and the ML-KEM ciphertext travel
//! as one length-prefixed composite.

use crate::bundle::KeyBundle;
use crate::cipher::{self, IV_SIZE, KEY_SIZE};
use crate::filecrypto::ClientFileData;
use crate::kem::{combine_shared_secrets, ecdh_encap, mlkem_encap};
use crate::rng::random_array;
use crate::{CryptoError, Result};
use thiserror::Error;
use zeroize::Zeroize;

/// Errors in the share protocol
#[derive(Error, Debug)]
pub enum ShareError {
    /// The recipient's bundle is missing or malformed
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Sharing a file with its owner
    #[error("cannot share a file with its owner")]
    SelfShareForbidden,

    /// `(owner, recipient, file_id)` already exists
    #[error("file already shared with this user")]
    AlreadyShared,

    /// No share record exists for this `(recipient, file_id)`
    #[error("file is not shared with this user")]
    NotShared,
}

/// A share record as stored by the server, minus the identifying columns
#[derive(Clone, Debug)]
pub struct ShareGrant {
    /// `u32_be(len(ct_classical)) ‖ ct_classical ‖ ct_post_quantum`
    pub ephemeral_public_key: Vec<u8>,
    pub encrypted_fek: Vec<u8>,
    pub encrypted_fek_nonce: [u8; IV_SIZE],
    pub encrypted_mek: Vec<u8>,
    pub encrypted_mek_nonce: [u8; IV_SIZE],
    pub file_content_nonce: [u8; IV_SIZE],
    pub metadata_nonce: [u8; IV_SIZE],
}

/// Pack the two KEM ciphertexts into the single ephemeral slot
pub fn pack_ephemeral(ct_classical: &[u8], ct_post_quantum: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + ct_classical.len() + ct_post_quantum.len());
    out.extend_from_slice(&(ct_classical.len() as u32).to_be_bytes());
    out.extend_from_slice(ct_classical);
    out.extend_from_slice(ct_post_quantum);
    out
}

/// Split the composite ephemeral slot back into its two ciphertexts
pub fn split_ephemeral(composite: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    if composite.len() < 4 {
        return Err(CryptoError::invalid("ephemeral composite too short"));
    }
    let classical_len = u32::from_be_bytes(composite[..4].try_into().unwrap()) as usize;
    let rest = &composite[4..];
    if classical_len > rest.len() {
        return Err(CryptoError::invalid("ephemeral composite length prefix out of range"));
    }
    Ok((
        rest[..classical_len].to_vec(),
        rest[classical_len..].to_vec(),
    ))
}

/// Wrap a file's FEK/MEK for a recipient's public bundle
pub fn create_share(
    data: &ClientFileData,
    recipient: &KeyBundle,
) -> std::result::Result<ShareGrant, ShareError> {
    let (ct_classical, mut ss_classical) = ecdh_encap(recipient.x25519_public())
        .map_err(|e| ShareError::InvalidRecipient(e.to_string()))?;
    let (ct_post_quantum, mut ss_post_quantum) = mlkem_encap(recipient.pq_kem_public())
        .map_err(|e| ShareError::InvalidRecipient(e.to_string()))?;

    let mut share_key = combine_shared_secrets(&mut ss_classical, &mut ss_post_quantum);

    let encrypted_fek_nonce: [u8; IV_SIZE] = random_array();
    let encrypted_mek_nonce: [u8; IV_SIZE] = random_array();
    let encrypted_fek = cipher::encrypt_with_iv(&data.fek, &share_key, &encrypted_fek_nonce)
        .map_err(|e| ShareError::InvalidRecipient(e.to_string()))?;
    let encrypted_mek = cipher::encrypt_with_iv(&data.mek, &share_key, &encrypted_mek_nonce)
        .map_err(|e| ShareError::InvalidRecipient(e.to_string()))?;
    share_key.zeroize();

    Ok(ShareGrant {
        ephemeral_public_key: pack_ephemeral(&ct_classical, &ct_post_quantum),
        encrypted_fek,
        encrypted_fek_nonce,
        encrypted_mek,
        encrypted_mek_nonce,
        file_content_nonce: data.file_nonce,
        metadata_nonce: data.metadata_nonce,
    })
}

/// Recover the per-file secrets from a share record (recipient side)
pub fn receive_share(
    grant: &ShareGrant,
    recipient: &KeyBundle,
    file_id: u64,
    filename: impl Into<String>,
) -> Result<ClientFileData> {
    let (ct_classical, ct_post_quantum) = split_ephemeral(&grant.ephemeral_public_key)?;
    let mut ss_classical = recipient.decap_classical(&ct_classical)?;
    let mut ss_post_quantum = recipient.decap_post_quantum(&ct_post_quantum)?;
    let mut share_key = combine_shared_secrets(&mut ss_classical, &mut ss_post_quantum);

    let mut fek_bytes = cipher::decrypt(&grant.encrypted_fek, &share_key, &grant.encrypted_fek_nonce)?;
    let mut mek_bytes = cipher::decrypt(&grant.encrypted_mek, &share_key, &grant.encrypted_mek_nonce)?;
    share_key.zeroize();

    if fek_bytes.len() != KEY_SIZE || mek_bytes.len() != KEY_SIZE {
        fek_bytes.zeroize();
        mek_bytes.zeroize();
        return Err(CryptoError::invalid("wrapped key has wrong length"));
    }

    let mut fek = [0u8; KEY_SIZE];
    let mut mek = [0u8; KEY_SIZE];
    fek.copy_from_slice(&fek_bytes);
    mek.copy_from_slice(&mek_bytes);
    fek_bytes.zeroize();
    mek_bytes.zeroize();

    Ok(ClientFileData {
        file_id,
        filename: filename.into(),
        fek,
        file_nonce: grant.file_content_nonce,
        mek,
        metadata_nonce: grant.metadata_nonce,
    })
}
