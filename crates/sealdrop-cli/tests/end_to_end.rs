//! End-to-end scenarios against the real router: register, upload,
//! download, tamper detection, share, revoke, and replay rejection.

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use sealdrop_cli::{routes as server_routes, AppState, ServerConfig};
use sealdrop_crypto::filecrypto::{
    decrypt_content, decrypt_metadata, encrypt_file, sign_file_record, verify_file_record,
    ClientFileData, FileMetadata,
};
use sealdrop_crypto::share::{create_share, receive_share};
use sealdrop_crypto::{b64_decode, b64_encode, KeyBundle};
use sealdrop_proto::{
    routes, sign_request, SharedAccess, HEADER_SIGNATURE, HEADER_TIMESTAMP, HEADER_USERNAME,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    server_routes::create_router(Arc::new(AppState::new(ServerConfig::default())))
}

async fn post_signed_at(
    app: &Router,
    path: &str,
    bundle: &KeyBundle,
    username: &str,
    body: &Value,
    at: DateTime<Utc>,
) -> (StatusCode, Value) {
    let bytes = serde_json::to_vec(body).unwrap();
    let headers = sign_request(bundle, username, "POST", path, &bytes, at).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(CONTENT_TYPE, "application/json")
        .header(HEADER_USERNAME, &headers.username)
        .header(HEADER_TIMESTAMP, &headers.timestamp)
        .header(HEADER_SIGNATURE, &headers.signature)
        .body(Body::from(bytes))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };
    (status, value)
}

async fn post_signed(
    app: &Router,
    path: &str,
    bundle: &KeyBundle,
    username: &str,
    body: &Value,
) -> (StatusCode, Value) {
    post_signed_at(app, path, bundle, username, body, Utc::now()).await
}

async fn register(app: &Router, bundle: &KeyBundle, username: &str) -> StatusCode {
    let public: Value = serde_json::from_str(&bundle.to_public_json().unwrap()).unwrap();
    let body = json!({ "username": username, "public_key_bundle": public });
    post_signed(app, routes::REGISTER, bundle, username, &body).await.0
}

/// Upload a file for `username`; returns `(file_id, client_data)`
async fn upload(
    app: &Router,
    bundle: &KeyBundle,
    username: &str,
    plaintext: &[u8],
    metadata: &FileMetadata,
) -> (u64, ClientFileData) {
    let encrypted = encrypt_file(plaintext, metadata).unwrap();
    let file_content = b64_encode(&encrypted.enc_content);
    let enc_metadata = b64_encode(&encrypted.enc_metadata);
    let (pre_sig, post_sig) =
        sign_file_record(username, &file_content, &enc_metadata, bundle).unwrap();

    let body = json!({
        "file_content": file_content,
        "metadata": enc_metadata,
        "pre_quantum_signature": pre_sig,
        "post_quantum_signature": post_sig,
    });
    let (status, resp) = post_signed(app, routes::UPLOAD, bundle, username, &body).await;
    assert_eq!(status, StatusCode::OK);

    let file_id = resp["file_id"].as_u64().unwrap();
    let mut client_data = encrypted.client_data;
    client_data.file_id = file_id;
    (file_id, client_data)
}

fn text_metadata() -> FileMetadata {
    FileMetadata {
        original_filename: "a.txt".to_string(),
        file_size_bytes: 11,
        file_type: "text/plain".to_string(),
    }
}

#[tokio::test]
async fn register_then_duplicate_conflicts() {
    let app = app();
    let alice = KeyBundle::generate();
    assert_eq!(register(&app, &alice, "alice").await, StatusCode::CREATED);

    let impostor = KeyBundle::generate();
    assert_eq!(register(&app, &impostor, "alice").await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_header_body_username_mismatch_is_unauthorized() {
    let app = app();
    let bundle = KeyBundle::generate();
    let public: Value = serde_json::from_str(&bundle.to_public_json().unwrap()).unwrap();
    let body = json!({ "username": "alice", "public_key_bundle": public });
    // Signed as mallory, body says alice
    let (status, resp) = post_signed(&app, routes::REGISTER, &bundle, "mallory", &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["message"], "Unauthorized");
}

#[tokio::test]
async fn missing_headers_rejected() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri(routes::LIST)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"page":1}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_user_rejected() {
    let app = app();
    let bundle = KeyBundle::generate();
    let (status, resp) =
        post_signed(&app, routes::LIST, &bundle, "ghost", &json!({ "page": 1 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["message"], "Unauthorized");
}

#[tokio::test]
async fn wrong_key_signature_rejected() {
    let app = app();
    let alice = KeyBundle::generate();
    register(&app, &alice, "alice").await;

    // Mallory signs with her own bundle under alice's name
    let mallory = KeyBundle::generate();
    let (status, _) =
        post_signed(&app, routes::LIST, &mallory, "alice", &json!({ "page": 1 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn upload_download_roundtrip() {
    let app = app();
    let alice = KeyBundle::generate();
    register(&app, &alice, "alice").await;

    let (file_id, client_data) =
        upload(&app, &alice, "alice", b"hello world", &text_metadata()).await;
    assert!(file_id >= 1);

    let (status, record) = post_signed(
        &app,
        routes::DOWNLOAD,
        &alice,
        "alice",
        &json!({ "file_id": file_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["is_owner"], true);
    assert_eq!(record["owner_username"], "alice");

    // Both signatures verify against the owner's public bundle
    assert!(verify_file_record(
        "alice",
        record["file_content"].as_str().unwrap(),
        record["metadata"].as_str().unwrap(),
        record["pre_quantum_signature"].as_str().unwrap(),
        record["post_quantum_signature"].as_str().unwrap(),
        &alice,
    ));

    let content = decrypt_content(
        &b64_decode(record["file_content"].as_str().unwrap()).unwrap(),
        &client_data.fek,
        &client_data.file_nonce,
    )
    .unwrap();
    assert_eq!(content, b"hello world");

    let metadata = decrypt_metadata(
        &b64_decode(record["metadata"].as_str().unwrap()).unwrap(),
        &client_data.mek,
        &client_data.metadata_nonce,
    )
    .unwrap();
    assert_eq!(metadata, text_metadata());
}

#[tokio::test]
async fn tampered_content_fails_verification() {
    let app = app();
    let alice = KeyBundle::generate();
    register(&app, &alice, "alice").await;
    let (file_id, _) = upload(&app, &alice, "alice", b"hello world", &text_metadata()).await;

    let (_, record) = post_signed(
        &app,
        routes::DOWNLOAD,
        &alice,
        "alice",
        &json!({ "file_id": file_id }),
    )
    .await;

    // Flip one byte of the stored content blob
    let mut blob = b64_decode(record["file_content"].as_str().unwrap()).unwrap();
    blob[0] ^= 0x01;
    let tampered_b64 = b64_encode(&blob);

    assert!(!verify_file_record(
        "alice",
        &tampered_b64,
        record["metadata"].as_str().unwrap(),
        record["pre_quantum_signature"].as_str().unwrap(),
        record["post_quantum_signature"].as_str().unwrap(),
        &alice,
    ));
}

#[tokio::test]
async fn forged_upload_signature_rejected() {
    let app = app();
    let alice = KeyBundle::generate();
    register(&app, &alice, "alice").await;

    let encrypted = encrypt_file(b"data", &text_metadata()).unwrap();
    let file_content = b64_encode(&encrypted.enc_content);
    let enc_metadata = b64_encode(&encrypted.enc_metadata);
    // File record signed by someone else entirely
    let mallory = KeyBundle::generate();
    let (pre_sig, post_sig) =
        sign_file_record("alice", &file_content, &enc_metadata, &mallory).unwrap();

    let body = json!({
        "file_content": file_content,
        "metadata": enc_metadata,
        "pre_quantum_signature": pre_sig,
        "post_quantum_signature": post_sig,
    });
    let (status, _) = post_signed(&app, routes::UPLOAD, &alice, "alice", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn share_list_download_flow() {
    let app = app();
    let alice = KeyBundle::generate();
    let bob = KeyBundle::generate();
    register(&app, &alice, "alice").await;
    register(&app, &bob, "bob").await;

    let (file_id, client_data) =
        upload(&app, &alice, "alice", b"hello world", &text_metadata()).await;

    // Alice fetches bob's bundle and rewraps the file secrets
    let (status, bundle_resp) = post_signed(
        &app,
        routes::GET_BUNDLE,
        &alice,
        "alice",
        &json!({ "username": "bob" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bob_public =
        KeyBundle::from_public_json(&bundle_resp["key_bundle"].to_string()).unwrap();

    let grant = create_share(&client_data, &bob_public).unwrap();
    let shared = SharedAccess::from_grant(&grant);
    let share_body = json!({
        "file_id": file_id,
        "shared_with_username": "bob",
        "encrypted_fek": shared.encrypted_fek,
        "encrypted_fek_nonce": shared.encrypted_fek_nonce,
        "encrypted_mek": shared.encrypted_mek,
        "encrypted_mek_nonce": shared.encrypted_mek_nonce,
        "ephemeral_public_key": shared.ephemeral_public_key,
        "file_content_nonce": shared.file_content_nonce,
        "metadata_nonce": shared.metadata_nonce,
    });
    let (status, _) = post_signed(&app, routes::SHARE, &alice, "alice", &share_body).await;
    assert_eq!(status, StatusCode::OK);

    // Duplicate share conflicts
    let (status, _) = post_signed(&app, routes::SHARE, &alice, "alice", &share_body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Bob's listing shows the file as shared-with
    let (status, listing) =
        post_signed(&app, routes::LIST, &bob, "bob", &json!({ "page": 1 })).await;
    assert_eq!(status, StatusCode::OK);
    let items = listing["fileData"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["file_id"].as_u64().unwrap(), file_id);
    assert_eq!(items[0]["is_owner"], false);
    assert!(items[0]["shared_access"].is_object());

    // Bob downloads, verifies against alice's bundle, and decrypts
    let (status, record) = post_signed(
        &app,
        routes::DOWNLOAD,
        &bob,
        "bob",
        &json!({ "file_id": file_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["is_owner"], false);
    assert_eq!(record["owner_username"], "alice");

    assert!(verify_file_record(
        "alice",
        record["file_content"].as_str().unwrap(),
        record["metadata"].as_str().unwrap(),
        record["pre_quantum_signature"].as_str().unwrap(),
        record["post_quantum_signature"].as_str().unwrap(),
        &alice,
    ));

    let access: SharedAccess =
        serde_json::from_value(record["shared_access"].clone()).unwrap();
    let recovered = receive_share(&access.to_grant().unwrap(), &bob, file_id, "a.txt").unwrap();
    assert_eq!(recovered.fek, client_data.fek);
    assert_eq!(recovered.mek, client_data.mek);

    let content = decrypt_content(
        &b64_decode(record["file_content"].as_str().unwrap()).unwrap(),
        &recovered.fek,
        &recovered.file_nonce,
    )
    .unwrap();
    assert_eq!(content, b"hello world");
}

#[tokio::test]
async fn self_share_and_unknown_recipient_rejected() {
    let app = app();
    let alice = KeyBundle::generate();
    register(&app, &alice, "alice").await;
    let (file_id, client_data) =
        upload(&app, &alice, "alice", b"hello world", &text_metadata()).await;

    let grant = create_share(&client_data, &alice.public_clone()).unwrap();
    let shared = SharedAccess::from_grant(&grant);
    let mut body = json!({
        "file_id": file_id,
        "shared_with_username": "alice",
        "encrypted_fek": shared.encrypted_fek,
        "encrypted_fek_nonce": shared.encrypted_fek_nonce,
        "encrypted_mek": shared.encrypted_mek,
        "encrypted_mek_nonce": shared.encrypted_mek_nonce,
        "ephemeral_public_key": shared.ephemeral_public_key,
        "file_content_nonce": shared.file_content_nonce,
        "metadata_nonce": shared.metadata_nonce,
    });
    let (status, _) = post_signed(&app, routes::SHARE, &alice, "alice", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    body["shared_with_username"] = json!("nobody");
    let (status, _) = post_signed(&app, routes::SHARE, &alice, "alice", &body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revoke_cuts_off_download() {
    let app = app();
    let alice = KeyBundle::generate();
    let bob = KeyBundle::generate();
    register(&app, &alice, "alice").await;
    register(&app, &bob, "bob").await;
    let (file_id, client_data) =
        upload(&app, &alice, "alice", b"hello world", &text_metadata()).await;

    let (_, bundle_resp) = post_signed(
        &app,
        routes::GET_BUNDLE,
        &alice,
        "alice",
        &json!({ "username": "bob" }),
    )
    .await;
    let bob_public =
        KeyBundle::from_public_json(&bundle_resp["key_bundle"].to_string()).unwrap();
    let shared = SharedAccess::from_grant(&create_share(&client_data, &bob_public).unwrap());
    let share_body = json!({
        "file_id": file_id,
        "shared_with_username": "bob",
        "encrypted_fek": shared.encrypted_fek,
        "encrypted_fek_nonce": shared.encrypted_fek_nonce,
        "encrypted_mek": shared.encrypted_mek,
        "encrypted_mek_nonce": shared.encrypted_mek_nonce,
        "ephemeral_public_key": shared.ephemeral_public_key,
        "file_content_nonce": shared.file_content_nonce,
        "metadata_nonce": shared.metadata_nonce,
    });
    post_signed(&app, routes::SHARE, &alice, "alice", &share_body).await;

    let (status, _) = post_signed(
        &app,
        routes::REVOKE,
        &alice,
        "alice",
        &json!({ "file_id": file_id, "username": "bob" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Bob is cut off; the file no longer exists for him
    let (status, _) = post_signed(
        &app,
        routes::DOWNLOAD,
        &bob,
        "bob",
        &json!({ "file_id": file_id }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Revoking again is a 404
    let (status, _) = post_signed(
        &app,
        routes::REVOKE,
        &alice,
        "alice",
        &json!({ "file_id": file_id, "username": "bob" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn replayed_request_rejected() {
    let app = app();
    let alice = KeyBundle::generate();
    register(&app, &alice, "alice").await;

    // Captured 61 seconds ago, replayed now
    let (status, resp) = post_signed_at(
        &app,
        routes::LIST,
        &alice,
        "alice",
        &json!({ "page": 1 }),
        Utc::now() - Duration::seconds(61),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["message"], "Unauthorized");

    // A timestamp from the future is just as stale
    let (status, _) = post_signed_at(
        &app,
        routes::LIST,
        &alice,
        "alice",
        &json!({ "page": 1 }),
        Utc::now() + Duration::seconds(61),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delete_removes_file_and_shares() {
    let app = app();
    let alice = KeyBundle::generate();
    let bob = KeyBundle::generate();
    register(&app, &alice, "alice").await;
    register(&app, &bob, "bob").await;
    let (file_id, _) = upload(&app, &alice, "alice", b"hello world", &text_metadata()).await;

    // Bob cannot delete alice's file
    let (status, _) = post_signed(
        &app,
        routes::DELETE,
        &bob,
        "bob",
        &json!({ "file_id": file_id }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post_signed(
        &app,
        routes::DELETE,
        &alice,
        "alice",
        &json!({ "file_id": file_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_signed(
        &app,
        routes::DOWNLOAD,
        &alice,
        "alice",
        &json!({ "file_id": file_id }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_paginates_at_ten() {
    let app = app();
    let alice = KeyBundle::generate();
    register(&app, &alice, "alice").await;

    for i in 0..11u64 {
        let metadata = FileMetadata {
            original_filename: format!("file-{i}.txt"),
            file_size_bytes: 4,
            file_type: "text/plain".to_string(),
        };
        upload(&app, &alice, "alice", b"data", &metadata).await;
    }

    let (status, page1) =
        post_signed(&app, routes::LIST, &alice, "alice", &json!({ "page": 1 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page1["fileData"].as_array().unwrap().len(), 10);
    assert_eq!(page1["hasNextPage"], true);

    let (_, page2) =
        post_signed(&app, routes::LIST, &alice, "alice", &json!({ "page": 2 })).await;
    assert_eq!(page2["fileData"].as_array().unwrap().len(), 1);
    assert_eq!(page2["hasNextPage"], false);

    let (status, _) =
        post_signed(&app, routes::LIST, &alice, "alice", &json!({ "page": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
