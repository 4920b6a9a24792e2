//! HTTP handlers for the Sealdrop API
//!
//! Authentication has already happened in the middleware; handlers only
//! enforce authorization (ownership, share existence) and move blobs. The
//! server never touches plaintext: content and metadata are opaque base64,
//! and the only cryptography here is re-checking the file record signature
//! on upload so nothing unverifiable is ever stored.

use crate::error::ApiError;
use crate::middleware::AuthedUser;
use crate::state::{AppState, ShareRecord, UserEntry};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use sealdrop_crypto::filecrypto::verify_file_record;
use sealdrop_crypto::share::ShareError;
use sealdrop_crypto::KeyBundle;
use sealdrop_proto::{
    format_timestamp, DeleteRequest, DownloadRequest, DownloadResponse, FileMetadataListItem,
    GetBundleRequest, GetBundleResponse, ListRequest, ListResponse, RegisterRequest,
    RevokeRequest, ShareRequest, SharedAccess, UploadRequest, UploadResponse,
};
use std::sync::Arc;
use tracing::info;

fn current_user(state: &AppState, auth: &AuthedUser) -> Result<Arc<UserEntry>, ApiError> {
    state
        .user_by_name(&auth.username)
        .ok_or(ApiError::Unauthorized)
}

/// POST /api/keyhandler/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let bundle = KeyBundle::from_public_json(&req.public_key_bundle.to_string())
        .map_err(|_| ApiError::BadRequest("Invalid key bundle"))?;
    let user_id = state.register_user(&req.username, req.public_key_bundle, bundle)?;
    info!(user_id, username = %req.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "user_id": user_id })),
    ))
}

/// POST /api/keyhandler/getbundle
pub async fn get_bundle(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GetBundleRequest>,
) -> Result<Json<GetBundleResponse>, ApiError> {
    let user = state.user_by_name(&req.username).ok_or(ApiError::NotFound)?;
    Ok(Json(GetBundleResponse {
        key_bundle: user.bundle_json.clone(),
    }))
}

/// POST /api/fs/upload
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let user = current_user(&state, &auth)?;

    if !verify_file_record(
        &user.username,
        &req.file_content,
        &req.metadata,
        &req.pre_quantum_signature,
        &req.post_quantum_signature,
        &user.bundle,
    ) {
        return Err(ApiError::BadRequest("File record signature invalid"));
    }

    let file_id = state.insert_file(
        user.user_id,
        req.file_content,
        req.metadata,
        req.pre_quantum_signature,
        req.post_quantum_signature,
    );
    info!(file_id, owner = user.user_id, "file stored");
    Ok(Json(UploadResponse { file_id }))
}

/// POST /api/fs/list
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Json(req): Json<ListRequest>,
) -> Result<Json<ListResponse>, ApiError> {
    if req.page < 1 {
        return Err(ApiError::BadRequest("Page must be at least 1"));
    }
    let user = current_user(&state, &auth)?;

    let visible = state.visible_files(user.user_id);
    let page_size = state.config.page_size;
    let start = (req.page as usize - 1) * page_size;
    let has_next_page = visible.len() > start + page_size;

    let file_data = visible
        .into_iter()
        .skip(start)
        .take(page_size)
        .map(|(record, share)| FileMetadataListItem {
            file_id: record.file_id,
            metadata: record.metadata_b64,
            upload_ts: format_timestamp(record.upload_ts),
            is_owner: share.is_none(),
            shared_access: share.map(|s| s.access),
        })
        .collect();

    Ok(Json(ListResponse {
        file_data,
        has_next_page,
    }))
}

/// POST /api/fs/download
pub async fn download(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Json(req): Json<DownloadRequest>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let user = current_user(&state, &auth)?;
    let record = state.file(req.file_id).ok_or(ApiError::NotFound)?;

    let is_owner = record.owner_user_id == user.user_id;
    // Non-owners see the file only through a live share; a missing or
    // revoked share is indistinguishable from a missing file.
    let shared_access = if is_owner {
        None
    } else {
        let share = state
            .share(record.owner_user_id, user.user_id, record.file_id)
            .ok_or(ApiError::NotFound)?;
        Some(share.access)
    };

    let owner_username = state
        .username_by_id(record.owner_user_id)
        .ok_or(ApiError::Internal)?;

    Ok(Json(DownloadResponse {
        file_content: record.content_b64,
        metadata: record.metadata_b64,
        pre_quantum_signature: record.pre_sig,
        post_quantum_signature: record.post_sig,
        owner_user_id: record.owner_user_id,
        owner_username,
        is_owner,
        shared_access,
    }))
}

/// POST /api/fs/delete
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = current_user(&state, &auth)?;
    let record = state.file(req.file_id).ok_or(ApiError::NotFound)?;
    if record.owner_user_id != user.user_id {
        return Err(ApiError::Forbidden);
    }
    state.remove_file(req.file_id);
    info!(file_id = req.file_id, "file deleted");
    Ok(Json(serde_json::json!({})))
}

/// POST /api/fs/share
pub async fn share(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Json(req): Json<ShareRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = current_user(&state, &auth)?;
    let record = state.file(req.file_id).ok_or(ApiError::NotFound)?;
    if record.owner_user_id != user.user_id {
        return Err(ApiError::Forbidden);
    }
    if req.shared_with_username == user.username {
        return Err(ShareError::SelfShareForbidden.into());
    }
    let recipient = state
        .user_by_name(&req.shared_with_username)
        .ok_or(ApiError::NotFound)?;

    state.insert_share(ShareRecord {
        file_id: req.file_id,
        owner_user_id: user.user_id,
        shared_with_user_id: recipient.user_id,
        access: SharedAccess::from(&req),
    })?;
    info!(
        file_id = req.file_id,
        owner = user.user_id,
        recipient = recipient.user_id,
        "share recorded"
    );
    Ok(Json(serde_json::json!({})))
}

/// POST /api/fs/revoke
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = current_user(&state, &auth)?;
    let recipient = state.user_by_name(&req.username).ok_or(ApiError::NotFound)?;
    state
        .remove_share(user.user_id, recipient.user_id, req.file_id)
        .ok_or(ApiError::NotFound)?;
    info!(
        file_id = req.file_id,
        owner = user.user_id,
        recipient = recipient.user_id,
        "share revoked"
    );
    Ok(Json(serde_json::json!({})))
}
