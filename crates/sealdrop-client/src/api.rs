//! Authenticated API client
//!
//! Every call serializes its body once, signs those exact bytes with the
//! unlocked bundle, and sends them unmodified, so the server recomputes an
//! identical canonical string. Signing happens under the store lock;
//! network I/O strictly after it is released.

use crate::config::Config;
use crate::error::{ClientError, Result, StorageError};
use crate::store::ClientStore;
use chrono::Utc;
use reqwest::header;
use sealdrop_crypto::filecrypto::{
    decrypt_content, decrypt_metadata, encrypt_file, sign_file_record, verify_file_record,
    FileMetadata,
};
use sealdrop_crypto::share::{create_share, receive_share, ShareError};
use sealdrop_crypto::{b64_decode, b64_encode, KeyBundle};
use sealdrop_proto::{
    routes, sign_request, AuthHeaders, DeleteRequest, DownloadRequest, DownloadResponse,
    GetBundleRequest, GetBundleResponse, ListRequest, ListResponse, RegisterRequest,
    RevokeRequest, ShareRequest, SharedAccess, UploadRequest, UploadResponse, HEADER_SIGNATURE,
    HEADER_TIMESTAMP, HEADER_USERNAME,
};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// Sealdrop API client
pub struct ApiClient {
    config: Config,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone());

        if let Some(ca_path) = &config.ca_bundle {
            let pem = std::fs::read(ca_path).map_err(StorageError::IoFailed)?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(ClientError::Network)?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder.build().map_err(ClientError::Network)?;
        Ok(Self { config, http })
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Account ====================

    /// Generate an identity, register it, and initialize the local store
    #[instrument(skip(self, store, password))]
    pub async fn register(&self, store: &ClientStore, username: &str, password: &str) -> Result<()> {
        let bundle = KeyBundle::generate();
        let public_key_bundle: serde_json::Value =
            serde_json::from_str(&bundle.to_public_json()?)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        let body = encode_body(&RegisterRequest {
            username: username.to_string(),
            public_key_bundle,
        })?;
        // Bootstrap: the store has no user yet, so the request is signed
        // directly with the new bundle and the server verifies it against
        // the bundle inside the body.
        let headers = sign_request(&bundle, username, "POST", routes::REGISTER, &body, Utc::now())?;
        let resp = self.send(routes::REGISTER, body, headers).await?;

        match resp.status().as_u16() {
            200 | 201 => {
                store.set_user_with_password(username, password, bundle)?;
                Ok(())
            }
            409 => Err(ClientError::DuplicateUsername),
            401 => Err(ClientError::AuthRejected),
            status => Err(ClientError::ServerStatus(status)),
        }
    }

    /// Fetch another user's public bundle
    #[instrument(skip(self, store))]
    pub async fn get_bundle(&self, store: &ClientStore, username: &str) -> Result<KeyBundle> {
        let body = encode_body(&GetBundleRequest {
            username: username.to_string(),
        })?;
        let resp = self.post_signed(store, routes::GET_BUNDLE, body).await?;
        let parsed: GetBundleResponse = expect_json(resp, None).await?;
        Ok(KeyBundle::from_public_json(&parsed.key_bundle.to_string())?)
    }

    // ==================== Files ====================

    /// Envelope-encrypt, sign, and upload; returns the assigned file id
    #[instrument(skip(self, store, plaintext, metadata))]
    pub async fn upload(
        &self,
        store: &ClientStore,
        plaintext: &[u8],
        metadata: &FileMetadata,
    ) -> Result<u64> {
        let encrypted = encrypt_file(plaintext, metadata)?;
        let file_content = b64_encode(&encrypted.enc_content);
        let enc_metadata = b64_encode(&encrypted.enc_metadata);

        let (pre_sig, post_sig) = store.with_unlocked(|view| {
            sign_file_record(view.username, &file_content, &enc_metadata, view.bundle)
        })??;

        let body = encode_body(&UploadRequest {
            file_content,
            metadata: enc_metadata,
            pre_quantum_signature: pre_sig,
            post_quantum_signature: post_sig,
        })?;
        let resp = self.post_signed(store, routes::UPLOAD, body).await?;
        let parsed: UploadResponse = expect_json(resp, None).await?;

        let mut client_data = encrypted.client_data;
        client_data.file_id = parsed.file_id;
        store.upsert_file(client_data)?;

        debug!(file_id = parsed.file_id, "upload complete");
        Ok(parsed.file_id)
    }

    /// Download, verify both signatures, and decrypt
    ///
    /// Verification happens before any decryption; a tampered record never
    /// surfaces plaintext.
    #[instrument(skip(self, store))]
    pub async fn download(
        &self,
        store: &ClientStore,
        file_id: u64,
    ) -> Result<(Vec<u8>, FileMetadata)> {
        let body = encode_body(&DownloadRequest { file_id })?;
        let resp = self.post_signed(store, routes::DOWNLOAD, body).await?;
        let record: DownloadResponse = expect_json(resp, None).await?;

        let owner_bundle = if record.is_owner {
            KeyBundle::from_public_json(&store.public_bundle()?.to_string())?
        } else {
            self.get_bundle(store, &record.owner_username).await?
        };

        if !verify_file_record(
            &record.owner_username,
            &record.file_content,
            &record.metadata,
            &record.pre_quantum_signature,
            &record.post_quantum_signature,
            &owner_bundle,
        ) {
            return Err(ClientError::TamperDetected);
        }

        let client_data = if record.is_owner {
            store.get_file(file_id).ok_or(ClientError::FileNotFound)?
        } else if let Some(cached) = store.get_file(file_id) {
            cached
        } else {
            let shared = record
                .shared_access
                .as_ref()
                .ok_or(ShareError::NotShared)?;
            let grant = shared.to_grant()?;
            store.with_unlocked(|view| receive_share(&grant, view.bundle, file_id, ""))??
        };

        let content = decrypt_content(
            &b64_decode(&record.file_content)?,
            &client_data.fek,
            &client_data.file_nonce,
        )?;
        let metadata = decrypt_metadata(
            &b64_decode(&record.metadata)?,
            &client_data.mek,
            &client_data.metadata_nonce,
        )?;

        // First successful shared download: cache the recovered secrets
        // under the real filename.
        if !record.is_owner && store.get_file(file_id).is_none() {
            let mut cached = client_data;
            cached.filename = metadata.original_filename.clone();
            store.upsert_file(cached)?;
        }

        Ok((content, metadata))
    }

    /// Page through the caller's visible files
    #[instrument(skip(self, store))]
    pub async fn list(&self, store: &ClientStore, page: u32) -> Result<ListResponse> {
        let body = encode_body(&ListRequest { page })?;
        let resp = self.post_signed(store, routes::LIST, body).await?;
        expect_json(resp, None).await
    }

    /// Delete an owned file and forget its secrets
    #[instrument(skip(self, store))]
    pub async fn delete(&self, store: &ClientStore, file_id: u64) -> Result<()> {
        let body = encode_body(&DeleteRequest { file_id })?;
        let resp = self.post_signed(store, routes::DELETE, body).await?;
        expect_ok(resp, None).await?;
        store.remove_file(file_id)?;
        Ok(())
    }

    // ==================== Sharing ====================

    /// Rewrap a file's secrets for another user and record the share
    #[instrument(skip(self, store))]
    pub async fn share(
        &self,
        store: &ClientStore,
        file_id: u64,
        recipient_username: &str,
    ) -> Result<()> {
        let own_username = store.username().ok_or(ClientError::NotLoggedIn)?;
        if own_username == recipient_username {
            return Err(ShareError::SelfShareForbidden.into());
        }

        let client_data = store.get_file(file_id).ok_or(ClientError::FileNotFound)?;
        let recipient = self.get_bundle(store, recipient_username).await?;
        let grant = create_share(&client_data, &recipient)?;
        let shared = SharedAccess::from_grant(&grant);

        let body = encode_body(&ShareRequest {
            file_id,
            shared_with_username: recipient_username.to_string(),
            encrypted_fek: shared.encrypted_fek,
            encrypted_fek_nonce: shared.encrypted_fek_nonce,
            encrypted_mek: shared.encrypted_mek,
            encrypted_mek_nonce: shared.encrypted_mek_nonce,
            ephemeral_public_key: shared.ephemeral_public_key,
            file_content_nonce: shared.file_content_nonce,
            metadata_nonce: shared.metadata_nonce,
        })?;
        let resp = self.post_signed(store, routes::SHARE, body).await?;
        expect_ok(resp, Some(ClientError::Share(ShareError::AlreadyShared))).await
    }

    /// Withdraw a previously granted share
    #[instrument(skip(self, store))]
    pub async fn revoke(&self, store: &ClientStore, file_id: u64, username: &str) -> Result<()> {
        let body = encode_body(&RevokeRequest {
            file_id,
            username: username.to_string(),
        })?;
        let resp = self.post_signed(store, routes::REVOKE, body).await?;
        expect_ok(resp, None).await
    }

    // ==================== Plumbing ====================

    async fn post_signed(
        &self,
        store: &ClientStore,
        path: &str,
        body: Vec<u8>,
    ) -> Result<reqwest::Response> {
        let headers = store.with_unlocked(|view| {
            sign_request(view.bundle, view.username, "POST", path, &body, Utc::now())
        })??;
        self.send(path, body, headers).await
    }

    async fn send(
        &self,
        path: &str,
        body: Vec<u8>,
        headers: AuthHeaders,
    ) -> Result<reqwest::Response> {
        self.http
            .post(self.config.url(path))
            .header(header::CONTENT_TYPE, "application/json")
            .header(HEADER_USERNAME, &headers.username)
            .header(HEADER_TIMESTAMP, &headers.timestamp)
            .header(HEADER_SIGNATURE, &headers.signature)
            .body(body)
            .send()
            .await
            .map_err(ClientError::Network)
    }
}

fn encode_body<T: serde::Serialize>(req: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(req).map_err(|e| StorageError::Corrupt(e.to_string()).into())
}

fn status_error(status: u16, conflict: Option<ClientError>) -> ClientError {
    match status {
        401 => ClientError::AuthRejected,
        404 => ClientError::FileNotFound,
        409 => conflict.unwrap_or(ClientError::ServerStatus(409)),
        other => ClientError::ServerStatus(other),
    }
}

async fn expect_json<T: DeserializeOwned>(
    resp: reqwest::Response,
    conflict: Option<ClientError>,
) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        resp.json().await.map_err(ClientError::Network)
    } else {
        Err(status_error(status.as_u16(), conflict))
    }
}

async fn expect_ok(resp: reqwest::Response, conflict: Option<ClientError>) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(status_error(status.as_u16(), conflict))
    }
}
