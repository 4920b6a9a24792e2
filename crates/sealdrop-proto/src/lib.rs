//! # Sealdrop Proto
//!
//! The wire protocol between the Sealdrop client and gateway: the canonical
//! request string, the dual-signature authentication headers, the replay
//! window, and every request/response body. Both sides depend on this crate
//! so the signed bytes are identical by construction.

pub mod auth;
pub mod canonical;
pub mod error;
pub mod types;

pub use auth::{
    sign_request, split_signature, verify_request, AuthHeaders, HEADER_SIGNATURE,
    HEADER_TIMESTAMP, HEADER_USERNAME, SIGNATURE_SEPARATOR,
};
pub use canonical::{
    format_timestamp, is_fresh, parse_timestamp, request_canonical, REPLAY_WINDOW_SECS,
    TIMESTAMP_FORMAT,
};
pub use error::{AuthError, ProtocolError};
pub use types::routes;
pub use types::{
    DeleteRequest, DownloadRequest, DownloadResponse, ErrorResponse, FileMetadataListItem,
    GetBundleRequest, GetBundleResponse, ListRequest, ListResponse, RegisterRequest,
    RevokeRequest, ShareRequest, SharedAccess, UploadRequest, UploadResponse,
};
