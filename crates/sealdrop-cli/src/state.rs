//! Application state: the user, file, and share tables
//!
//! The gateway is stateless per request; these in-memory tables are the
//! only shared state. Authorization never goes beyond them, and the
//! uniqueness of `(owner, recipient, file_id)` serializes duplicate share
//! inserts without any locking beyond the map entry.

use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sealdrop_crypto::share::ShareError;
use sealdrop_crypto::KeyBundle;
use sealdrop_proto::{ProtocolError, SharedAccess};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A registered user: server-assigned id plus the public bundle, kept both
/// as the original JSON document (served back verbatim) and parsed for
/// per-request signature verification
pub struct UserEntry {
    pub user_id: u64,
    pub username: String,
    pub bundle_json: serde_json::Value,
    pub bundle: KeyBundle,
}

/// A stored file record: opaque blobs plus the dual signature
#[derive(Clone)]
pub struct FileRecord {
    pub file_id: u64,
    pub owner_user_id: u64,
    pub content_b64: String,
    pub metadata_b64: String,
    pub pre_sig: String,
    pub post_sig: String,
    pub upload_ts: DateTime<Utc>,
}

/// A share record keyed by `(owner, recipient, file_id)`
#[derive(Clone)]
pub struct ShareRecord {
    pub file_id: u64,
    pub owner_user_id: u64,
    pub shared_with_user_id: u64,
    pub access: SharedAccess,
}

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    users: DashMap<String, Arc<UserEntry>>,
    usernames_by_id: DashMap<u64, String>,
    files: DashMap<u64, FileRecord>,
    shares: DashMap<(u64, u64, u64), ShareRecord>,
    next_user_id: AtomicU64,
    next_file_id: AtomicU64,
}

impl AppState {
    /// Create empty state with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            users: DashMap::new(),
            usernames_by_id: DashMap::new(),
            files: DashMap::new(),
            shares: DashMap::new(),
            next_user_id: AtomicU64::new(1),
            next_file_id: AtomicU64::new(1),
        }
    }

    // ==================== Users ====================

    /// Insert a new user; duplicate usernames conflict
    pub fn register_user(
        &self,
        username: &str,
        bundle_json: serde_json::Value,
        bundle: KeyBundle,
    ) -> Result<u64, ProtocolError> {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => Err(ProtocolError::DuplicateUsername),
            Entry::Vacant(slot) => {
                let user_id = self.next_user_id.fetch_add(1, Ordering::SeqCst);
                slot.insert(Arc::new(UserEntry {
                    user_id,
                    username: username.to_string(),
                    bundle_json,
                    bundle,
                }));
                self.usernames_by_id.insert(user_id, username.to_string());
                Ok(user_id)
            }
        }
    }

    /// Look up a user by name
    pub fn user_by_name(&self, username: &str) -> Option<Arc<UserEntry>> {
        self.users.get(username).map(|entry| Arc::clone(&entry))
    }

    /// Look up a username by server-assigned id
    pub fn username_by_id(&self, user_id: u64) -> Option<String> {
        self.usernames_by_id.get(&user_id).map(|name| name.clone())
    }

    // ==================== Files ====================

    /// Store an uploaded record and assign its id
    pub fn insert_file(
        &self,
        owner_user_id: u64,
        content_b64: String,
        metadata_b64: String,
        pre_sig: String,
        post_sig: String,
    ) -> u64 {
        let file_id = self.next_file_id.fetch_add(1, Ordering::SeqCst);
        self.files.insert(
            file_id,
            FileRecord {
                file_id,
                owner_user_id,
                content_b64,
                metadata_b64,
                pre_sig,
                post_sig,
                upload_ts: Utc::now(),
            },
        );
        file_id
    }

    /// Fetch a file record
    pub fn file(&self, file_id: u64) -> Option<FileRecord> {
        self.files.get(&file_id).map(|record| record.clone())
    }

    /// Remove a file and every share that points at it
    pub fn remove_file(&self, file_id: u64) -> Option<FileRecord> {
        let removed = self.files.remove(&file_id).map(|(_, record)| record);
        if removed.is_some() {
            self.shares.retain(|key, _| key.2 != file_id);
        }
        removed
    }

    /// All files a user can see, ascending by id: owned plus shared-with
    pub fn visible_files(&self, user_id: u64) -> Vec<(FileRecord, Option<ShareRecord>)> {
        let mut visible: Vec<(FileRecord, Option<ShareRecord>)> = self
            .files
            .iter()
            .filter_map(|entry| {
                let record = entry.value();
                if record.owner_user_id == user_id {
                    Some((record.clone(), None))
                } else {
                    self.share(record.owner_user_id, user_id, record.file_id)
                        .map(|share| (record.clone(), Some(share)))
                }
            })
            .collect();
        visible.sort_by_key(|(record, _)| record.file_id);
        visible
    }

    // ==================== Shares ====================

    /// Record a share; the `(owner, recipient, file_id)` key is unique
    pub fn insert_share(&self, record: ShareRecord) -> Result<(), ShareError> {
        let key = (
            record.owner_user_id,
            record.shared_with_user_id,
            record.file_id,
        );
        match self.shares.entry(key) {
            Entry::Occupied(_) => Err(ShareError::AlreadyShared),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// Fetch one share record
    pub fn share(&self, owner: u64, recipient: u64, file_id: u64) -> Option<ShareRecord> {
        self.shares
            .get(&(owner, recipient, file_id))
            .map(|record| record.clone())
    }

    /// Remove one share record; `None` if it never existed
    pub fn remove_share(&self, owner: u64, recipient: u64, file_id: u64) -> Option<ShareRecord> {
        self.shares
            .remove(&(owner, recipient, file_id))
            .map(|(_, record)| record)
    }
}
