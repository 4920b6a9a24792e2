//! Request authentication and logging middleware
//!
//! Authentication buffers the raw body, because the canonical request
//! string covers the exact bytes on the wire; the verified bytes are then
//! handed back to the router unchanged. The pipeline is strict: parse
//! headers, check freshness, split the signature pair, recompute the
//! canonical string, verify both halves. Any failure is a bare 401.
//!
//! Registration is the bootstrap case: no bundle is stored yet, so the
//! request verifies against the bundle carried in its own body, which binds
//! the new username to that bundle from the very first request.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use sealdrop_crypto::KeyBundle;
use sealdrop_proto::{
    routes, verify_request, AuthError, AuthHeaders, RegisterRequest, HEADER_SIGNATURE,
    HEADER_TIMESTAMP, HEADER_USERNAME,
};
use std::sync::Arc;

/// The authenticated identity, attached as a request extension
#[derive(Clone, Debug)]
pub struct AuthedUser {
    pub username: String,
}

/// Authentication middleware; every API route passes through here
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn authenticate(
    state: &AppState,
    request: Request<Body>,
) -> Result<Request<Body>, ApiError> {
    let (mut parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, state.config.max_body_size)
        .await
        .map_err(|_| ApiError::BadRequest("Body too large"))?;

    let headers = auth_headers(&parts.headers)?;
    let method = parts.method.as_str().to_owned();
    // The signed path is the request target exactly as sent, query included.
    let path = parts
        .uri
        .path_and_query()
        .map(|target| target.as_str())
        .unwrap_or_else(|| parts.uri.path())
        .to_owned();

    if path == routes::REGISTER {
        let req: RegisterRequest = serde_json::from_slice(&bytes)
            .map_err(|_| ApiError::BadRequest("Malformed JSON body"))?;
        if req.username != headers.username {
            return Err(ApiError::Unauthorized);
        }
        let bundle = KeyBundle::from_public_json(&req.public_key_bundle.to_string())
            .map_err(|_| ApiError::BadRequest("Invalid key bundle"))?;
        verify_request(&bundle, &headers, &method, &path, &bytes, Utc::now())?;
    } else {
        let user = state
            .user_by_name(&headers.username)
            .ok_or_else(|| AuthError::UserUnknown(headers.username.clone()))?;
        verify_request(&user.bundle, &headers, &method, &path, &bytes, Utc::now())?;
    }

    parts.extensions.insert(AuthedUser {
        username: headers.username,
    });
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

fn auth_headers(headers: &HeaderMap) -> Result<AuthHeaders, ApiError> {
    let get = |name: &'static str| -> Result<String, AuthError> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .ok_or(AuthError::Missing(name))
    };
    Ok(AuthHeaders {
        username: get(HEADER_USERNAME)?,
        timestamp: get(HEADER_TIMESTAMP)?,
        signature: get(HEADER_SIGNATURE)?,
    })
}

/// Logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "request completed"
    );

    response
}
