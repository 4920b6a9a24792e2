//! Encrypted local store: the at-rest user record and per-file secrets
//!
//! The store is a state machine: `NoUser` (fresh install), `EncryptedOnly`
//! (a user record exists on disk but no password has unwrapped it), and
//! `Unlocked` (master key and full bundle resident in RAM). Registration,
//! login, logout, and password change are the only transitions.
//!
//! At rest, the master key is wrapped under an Argon2id password key and
//! the private bundle JSON under the master key; the per-file secret map is
//! plaintext JSON, protected only by filesystem permissions, exactly like
//! the original deployment. Persistence is atomic: write to a temp file,
//! fsync, rename.
//!
//! One mutex guards the whole store. Every public method bounds its hold
//! time to a memory copy plus at most one cryptographic operation; nothing
//! here performs network I/O.

use crate::error::{ClientError, Result, StorageError};
use parking_lot::Mutex;
use sealdrop_crypto::encoding::{base64_array_serde, base64_serde};
use sealdrop_crypto::kdf::SALT_SIZE;
use sealdrop_crypto::{cipher, derive_password_key, random_array, ClientFileData, KeyBundle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

/// The at-rest user record, exactly as serialized to disk
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub username: String,
    #[serde(with = "base64_array_serde")]
    pub salt: [u8; SALT_SIZE],
    #[serde(with = "base64_array_serde")]
    pub master_nonce: [u8; cipher::IV_SIZE],
    #[serde(with = "base64_serde")]
    pub master_enc: Vec<u8>,
    #[serde(with = "base64_array_serde")]
    pub priv_nonce: [u8; cipher::IV_SIZE],
    #[serde(with = "base64_serde")]
    pub priv_enc: Vec<u8>,
    pub public_keybundle: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct StoreDocument {
    user: Option<StoredUser>,
    files: Vec<ClientFileData>,
}

enum Session {
    NoUser,
    EncryptedOnly {
        record: StoredUser,
    },
    Unlocked {
        record: StoredUser,
        master_key: [u8; cipher::KEY_SIZE],
        bundle: KeyBundle,
    },
}

struct Inner {
    session: Session,
    files: HashMap<u64, ClientFileData>,
}

/// Borrowed view of an unlocked session, valid while the store lock is held
pub struct UnlockedView<'a> {
    pub username: &'a str,
    pub bundle: &'a KeyBundle,
}

/// The client-side store; one mutex guards user state and the file map
pub struct ClientStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl ClientStore {
    /// Open (or initialize) a store at the given path
    ///
    /// A missing or zero-length file is an empty store, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let inner = match fs::read(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Inner {
                session: Session::NoUser,
                files: HashMap::new(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(StorageError::PermissionDenied.into());
            }
            Err(e) => return Err(StorageError::IoFailed(e).into()),
            Ok(bytes) if bytes.is_empty() => Inner {
                session: Session::NoUser,
                files: HashMap::new(),
            },
            Ok(bytes) => {
                let doc: StoreDocument = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::Corrupt(e.to_string()))?;
                Inner {
                    session: match doc.user {
                        Some(record) => Session::EncryptedOnly { record },
                        None => Session::NoUser,
                    },
                    files: doc.files.into_iter().map(|f| (f.file_id, f)).collect(),
                }
            }
        };
        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    /// The on-disk path of this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ==================== Session transitions ====================

    /// Register: wrap a freshly generated bundle under a password
    ///
    /// Generates salt and master key, wraps the master key under the
    /// password-derived key and the private bundle JSON under the master
    /// key, persists, and leaves the session unlocked.
    pub fn set_user_with_password(
        &self,
        username: &str,
        password: &str,
        bundle: KeyBundle,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        if !matches!(inner.session, Session::NoUser) {
            return Err(ClientError::DuplicateUsername);
        }

        let salt: [u8; SALT_SIZE] = random_array();
        let mut password_key = derive_password_key(password, &salt)?;
        let master_key: [u8; cipher::KEY_SIZE] = random_array();

        let (master_enc, master_nonce) = cipher::encrypt(&master_key, &password_key)?;
        password_key.zeroize();

        let mut priv_json = bundle.to_private_json()?;
        let (priv_enc, priv_nonce) = cipher::encrypt(priv_json.as_bytes(), &master_key)?;
        priv_json.zeroize();

        let public_keybundle: serde_json::Value = serde_json::from_str(&bundle.to_public_json()?)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        let record = StoredUser {
            username: username.to_string(),
            salt,
            master_nonce,
            master_enc,
            priv_nonce,
            priv_enc,
            public_keybundle,
        };

        inner.session = Session::Unlocked {
            record,
            master_key,
            bundle,
        };
        self.save_locked(&inner)
    }

    /// Unlock the stored record with a password
    ///
    /// A wrong password leaves the session exactly as it was.
    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let record = match &inner.session {
            Session::NoUser => return Err(StorageError::NotFound.into()),
            Session::EncryptedOnly { record } | Session::Unlocked { record, .. } => record.clone(),
        };
        if record.username != username {
            return Err(StorageError::NotFound.into());
        }

        let mut password_key = derive_password_key(password, &record.salt)?;
        let mut master_bytes =
            cipher::decrypt(&record.master_enc, &password_key, &record.master_nonce)?;
        password_key.zeroize();

        // CTR decryption cannot fail on a wrong key; the failure shows up
        // when the private bundle JSON does not parse.
        let unwrap_bundle = || -> Option<(KeyBundle, [u8; cipher::KEY_SIZE])> {
            let master_key: [u8; cipher::KEY_SIZE] = master_bytes.as_slice().try_into().ok()?;
            let mut priv_bytes =
                cipher::decrypt(&record.priv_enc, &master_key, &record.priv_nonce).ok()?;
            let parsed = std::str::from_utf8(&priv_bytes)
                .ok()
                .and_then(|json| KeyBundle::from_private_json(json).ok());
            priv_bytes.zeroize();
            parsed.map(|bundle| (bundle, master_key))
        };

        let Some((bundle, master_key)) = unwrap_bundle() else {
            master_bytes.zeroize();
            return Err(ClientError::WrongPassword);
        };
        master_bytes.zeroize();

        inner.session = Session::Unlocked {
            record,
            master_key,
            bundle,
        };
        Ok(())
    }

    /// Wipe in-RAM secrets; on-disk blobs stay intact
    pub fn logout(&self) {
        let mut inner = self.inner.lock();
        if let Session::Unlocked { .. } = inner.session {
            let Session::Unlocked {
                record,
                mut master_key,
                bundle,
            } = std::mem::replace(&mut inner.session, Session::NoUser)
            else {
                unreachable!();
            };
            master_key.zeroize();
            drop(bundle); // zeroizes private buffers on drop
            inner.session = Session::EncryptedOnly { record };
        }
    }

    /// Re-wrap the master key under a new password; atomic on disk
    pub fn change_password(&self, new_password: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let Session::Unlocked {
            record, master_key, ..
        } = &mut inner.session
        else {
            return Err(ClientError::NotLoggedIn);
        };

        let salt: [u8; SALT_SIZE] = random_array();
        let mut password_key = derive_password_key(new_password, &salt)?;
        let (master_enc, master_nonce) = cipher::encrypt(master_key, &password_key)?;
        password_key.zeroize();

        record.salt = salt;
        record.master_nonce = master_nonce;
        record.master_enc = master_enc;
        self.save_locked(&inner)
    }

    // ==================== Accessors ====================

    /// Username of the stored record, if any
    pub fn username(&self) -> Option<String> {
        match &self.inner.lock().session {
            Session::NoUser => None,
            Session::EncryptedOnly { record } | Session::Unlocked { record, .. } => {
                Some(record.username.clone())
            }
        }
    }

    /// Whether a session is currently unlocked
    pub fn is_unlocked(&self) -> bool {
        matches!(self.inner.lock().session, Session::Unlocked { .. })
    }

    /// The stored public bundle JSON
    pub fn public_bundle(&self) -> Result<serde_json::Value> {
        match &self.inner.lock().session {
            Session::NoUser => Err(StorageError::NotFound.into()),
            Session::EncryptedOnly { record } | Session::Unlocked { record, .. } => {
                Ok(record.public_keybundle.clone())
            }
        }
    }

    /// Run a closure against the unlocked session
    ///
    /// The store lock is held for the duration, so callers keep the work to
    /// one signing or unwrapping operation; network I/O happens after this
    /// returns.
    pub fn with_unlocked<R>(&self, f: impl FnOnce(UnlockedView<'_>) -> R) -> Result<R> {
        let inner = self.inner.lock();
        match &inner.session {
            Session::Unlocked { record, bundle, .. } => Ok(f(UnlockedView {
                username: &record.username,
                bundle,
            })),
            _ => Err(ClientError::NotLoggedIn),
        }
    }

    // ==================== File map ====================

    /// Insert or replace the secrets for a file
    pub fn upsert_file(&self, data: ClientFileData) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.files.insert(data.file_id, data);
        self.save_locked(&inner)
    }

    /// Fetch a copy of the secrets for a file
    pub fn get_file(&self, file_id: u64) -> Option<ClientFileData> {
        self.inner.lock().files.get(&file_id).cloned()
    }

    /// Drop the secrets for a file
    pub fn remove_file(&self, file_id: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.files.remove(&file_id);
        self.save_locked(&inner)
    }

    /// All known file ids, ascending
    pub fn file_ids(&self) -> Vec<u64> {
        let inner = self.inner.lock();
        let mut ids: Vec<u64> = inner.files.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    // ==================== Persistence ====================

    // Caller holds the lock. Atomic: temp file, fsync, rename.
    fn save_locked(&self, inner: &Inner) -> Result<()> {
        let record = match &inner.session {
            Session::NoUser => None,
            Session::EncryptedOnly { record } | Session::Unlocked { record, .. } => {
                Some(record.clone())
            }
        };
        let mut files: Vec<ClientFileData> = inner.files.values().cloned().collect();
        files.sort_by_key(|f| f.file_id);

        let doc = StoreDocument {
            user: record,
            files,
        };
        let json = serde_json::to_vec_pretty(&doc).map_err(|e| {
            ClientError::Storage(StorageError::Corrupt(e.to_string()))
        })?;

        let tmp_path = self.path.with_extension("tmp");
        let mut tmp = fs::File::create(&tmp_path).map_err(StorageError::IoFailed)?;
        tmp.write_all(&json).map_err(StorageError::IoFailed)?;
        tmp.sync_all().map_err(StorageError::IoFailed)?;
        drop(tmp);
        fs::rename(&tmp_path, &self.path).map_err(StorageError::IoFailed)?;
        Ok(())
    }
}
