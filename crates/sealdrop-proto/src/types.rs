//! Request and response bodies for the Sealdrop HTTP API
//!
//! All byte-valued fields are standard padded base64 strings. Field names
//! here are the wire contract; client and server both serialize through
//! these types, so the canonical request string covers identical bytes on
//! both sides.

use sealdrop_crypto::share::ShareGrant;
use sealdrop_crypto::{b64_decode, b64_encode, CryptoError};
use serde::{Deserialize, Serialize};

/// Route paths, shared by the router and the client
pub mod routes {
    pub const REGISTER: &str = "/api/keyhandler/register";
    pub const GET_BUNDLE: &str = "/api/keyhandler/getbundle";
    pub const UPLOAD: &str = "/api/fs/upload";
    pub const LIST: &str = "/api/fs/list";
    pub const DOWNLOAD: &str = "/api/fs/download";
    pub const DELETE: &str = "/api/fs/delete";
    pub const SHARE: &str = "/api/fs/share";
    pub const REVOKE: &str = "/api/fs/revoke";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    /// Public bundle JSON document (`KeyBundle` public layout)
    pub public_key_bundle: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetBundleRequest {
    pub username: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetBundleResponse {
    pub key_bundle: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadRequest {
    pub file_content: String,
    pub metadata: String,
    pub pre_quantum_signature: String,
    pub post_quantum_signature: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListRequest {
    pub page: u32,
}

/// One entry of a paged listing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileMetadataListItem {
    pub file_id: u64,
    /// Encrypted metadata blob; the caller decrypts with its MEK
    pub metadata: String,
    pub upload_ts: String,
    pub is_owner: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_access: Option<SharedAccess>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListResponse {
    #[serde(rename = "fileData")]
    pub file_data: Vec<FileMetadataListItem>,
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub file_id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub file_content: String,
    pub metadata: String,
    pub pre_quantum_signature: String,
    pub post_quantum_signature: String,
    pub owner_user_id: u64,
    /// Needed by recipients to recompute the file canonical string
    pub owner_username: String,
    pub is_owner: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_access: Option<SharedAccess>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub file_id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShareRequest {
    pub file_id: u64,
    pub shared_with_username: String,
    pub encrypted_fek: String,
    pub encrypted_fek_nonce: String,
    pub encrypted_mek: String,
    pub encrypted_mek_nonce: String,
    pub ephemeral_public_key: String,
    pub file_content_nonce: String,
    pub metadata_nonce: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevokeRequest {
    pub file_id: u64,
    pub username: String,
}

/// The share record fields a recipient needs to rebuild the share key
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SharedAccess {
    pub ephemeral_public_key: String,
    pub encrypted_fek: String,
    pub encrypted_fek_nonce: String,
    pub encrypted_mek: String,
    pub encrypted_mek_nonce: String,
    pub file_content_nonce: String,
    pub metadata_nonce: String,
}

/// Uniform error body; 401 always carries `{"message": "Unauthorized"}`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl SharedAccess {
    /// Encode a grant for the wire
    pub fn from_grant(grant: &ShareGrant) -> Self {
        Self {
            ephemeral_public_key: b64_encode(&grant.ephemeral_public_key),
            encrypted_fek: b64_encode(&grant.encrypted_fek),
            encrypted_fek_nonce: b64_encode(grant.encrypted_fek_nonce),
            encrypted_mek: b64_encode(&grant.encrypted_mek),
            encrypted_mek_nonce: b64_encode(grant.encrypted_mek_nonce),
            file_content_nonce: b64_encode(grant.file_content_nonce),
            metadata_nonce: b64_encode(grant.metadata_nonce),
        }
    }

    /// Decode the wire form back into a grant
    pub fn to_grant(&self) -> Result<ShareGrant, CryptoError> {
        Ok(ShareGrant {
            ephemeral_public_key: b64_decode(&self.ephemeral_public_key)?,
            encrypted_fek: b64_decode(&self.encrypted_fek)?,
            encrypted_fek_nonce: decode_nonce(&self.encrypted_fek_nonce)?,
            encrypted_mek: b64_decode(&self.encrypted_mek)?,
            encrypted_mek_nonce: decode_nonce(&self.encrypted_mek_nonce)?,
            file_content_nonce: decode_nonce(&self.file_content_nonce)?,
            metadata_nonce: decode_nonce(&self.metadata_nonce)?,
        })
    }
}

impl From<&ShareRequest> for SharedAccess {
    fn from(req: &ShareRequest) -> Self {
        Self {
            ephemeral_public_key: req.ephemeral_public_key.clone(),
            encrypted_fek: req.encrypted_fek.clone(),
            encrypted_fek_nonce: req.encrypted_fek_nonce.clone(),
            encrypted_mek: req.encrypted_mek.clone(),
            encrypted_mek_nonce: req.encrypted_mek_nonce.clone(),
            file_content_nonce: req.file_content_nonce.clone(),
            metadata_nonce: req.metadata_nonce.clone(),
        }
    }
}

fn decode_nonce(b64: &str) -> Result<[u8; 16], CryptoError> {
    let bytes = b64_decode(b64)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::invalid(format!("nonce must be 16 bytes, got {}", bytes.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealdrop_crypto::filecrypto::{encrypt_file, FileMetadata};
    use sealdrop_crypto::{create_share, KeyBundle};

    #[test]
    fn list_response_wire_names() {
        let resp = ListResponse {
            file_data: vec![],
            has_next_page: false,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("fileData").is_some());
        assert!(json.get("hasNextPage").is_some());
    }

    #[test]
    fn shared_access_grant_roundtrip() {
        let metadata = FileMetadata::for_content("f.txt", b"data", "text/plain");
        let data = encrypt_file(b"data", &metadata).unwrap().client_data;
        let recipient = KeyBundle::generate();
        let grant = create_share(&data, &recipient).unwrap();

        let wire = SharedAccess::from_grant(&grant);
        let restored = wire.to_grant().unwrap();
        assert_eq!(restored.ephemeral_public_key, grant.ephemeral_public_key);
        assert_eq!(restored.encrypted_fek, grant.encrypted_fek);
        assert_eq!(restored.encrypted_fek_nonce, grant.encrypted_fek_nonce);
        assert_eq!(restored.metadata_nonce, grant.metadata_nonce);
    }

    #[test]
    fn bad_nonce_length_rejected() {
        let mut wire = SharedAccess {
            ephemeral_public_key: b64_encode(b"ct"),
            encrypted_fek: b64_encode(b"fek"),
            encrypted_fek_nonce: b64_encode([0u8; 16]),
            encrypted_mek: b64_encode(b"mek"),
            encrypted_mek_nonce: b64_encode([0u8; 16]),
            file_content_nonce: b64_encode([0u8; 16]),
            metadata_nonce: b64_encode([0u8; 16]),
        };
        assert!(wire.to_grant().is_ok());
        wire.metadata_nonce = b64_encode([0u8; 12]);
        assert!(wire.to_grant().is_err());
    }

    #[test]
    fn optional_shared_access_omitted() {
        let item = FileMetadataListItem {
            file_id: 1,
            metadata: String::new(),
            upload_ts: "2026-08-01T12:00:00Z".into(),
            is_owner: true,
            shared_access: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("shared_access").is_none());
    }
}
