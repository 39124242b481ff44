//! Admin session held in durable key-value storage.
//!
//! A session is the pair (bearer token, admin identity). Both records are
//! written together and removed together; a store holding only one of them
//! reads as logged out.

use range_common::AdminIdentity;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const TOKEN_KEY: &str = "cyber_range_admin_token";
pub const IDENTITY_KEY: &str = "cyber_range_admin_info";

/// Snapshot of every record in a store.
pub type Records = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session storage is corrupted: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Durable key-value storage backing a [`Session`].
pub trait SessionStore: Send + Sync {
    /// Reads all records in one consistent view.
    fn snapshot(&self) -> Result<Records, SessionError>;

    /// Inserts or replaces the given records in a single write.
    fn write(&self, records: &[(&str, String)]) -> Result<(), SessionError>;

    /// Removes the given keys in a single write.
    fn remove(&self, keys: &[&str]) -> Result<(), SessionError>;
}

// In-memory storage implementation for development/testing
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<Records>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn snapshot(&self) -> Result<Records, SessionError> {
        Ok(self.records().clone())
    }

    fn write(&self, records: &[(&str, String)]) -> Result<(), SessionError> {
        let mut current = self.records();
        for (key, value) in records {
            current.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), SessionError> {
        let mut current = self.records();
        for key in keys {
            current.remove(*key);
        }
        Ok(())
    }
}

/// JSON file store. Every write replaces the file atomically (temp file in
/// the same directory, then rename).
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Records, SessionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Records::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Records::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, records: &Records) -> Result<(), SessionError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(records)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), "Session file written");
        Ok(())
    }

    fn modify(&self, apply: impl FnOnce(&mut Records)) -> Result<(), SessionError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // An unreadable file is replaced rather than blocking logout/login.
        let mut records = self.read().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), "Discarding unreadable session file: {}", e);
            Records::new()
        });
        apply(&mut records);
        self.persist(&records)
    }
}

impl SessionStore for FileSessionStore {
    fn snapshot(&self) -> Result<Records, SessionError> {
        self.read()
    }

    fn write(&self, records: &[(&str, String)]) -> Result<(), SessionError> {
        self.modify(|current| {
            for (key, value) in records {
                current.insert((*key).to_string(), value.clone());
            }
        })
    }

    fn remove(&self, keys: &[&str]) -> Result<(), SessionError> {
        self.modify(|current| {
            for key in keys {
                current.remove(*key);
            }
        })
    }
}

/// Process-wide admin session, injected into the gateway client and the
/// session guard.
///
/// The stored pair is loaded once by [`Session::init`] and kept in memory
/// afterwards; `login` and `teardown` write through to the store.
pub struct Session {
    store: Arc<dyn SessionStore>,
    current: Mutex<Option<(String, AdminIdentity)>>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// Loads the stored session, clearing half-written or unreadable state so
    /// that presence stays all-or-nothing.
    pub fn init(&self) -> Result<Option<AdminIdentity>, SessionError> {
        let records = match self.store.snapshot() {
            Ok(records) => records,
            Err(e) => {
                warn!("Session storage unreadable, starting logged out: {}", e);
                self.teardown()?;
                return Ok(None);
            }
        };

        let has_any = records.contains_key(TOKEN_KEY) || records.contains_key(IDENTITY_KEY);
        match decode(&records) {
            Some((token, identity)) => {
                info!(admin = %identity.username, "Restored admin session");
                *self.lock() = Some((token, identity.clone()));
                Ok(Some(identity))
            }
            None if has_any => {
                warn!("Partial session found in storage, clearing it");
                self.teardown()?;
                Ok(None)
            }
            None => {
                *self.lock() = None;
                Ok(None)
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.lock().as_ref().map(|(token, _)| token.clone())
    }

    pub fn identity(&self) -> Option<AdminIdentity> {
        self.lock().as_ref().map(|(_, identity)| identity.clone())
    }

    pub fn is_present(&self) -> bool {
        self.lock().is_some()
    }

    /// Stores token and identity together.
    pub fn login(&self, token: &str, identity: &AdminIdentity) -> Result<(), SessionError> {
        let identity_json = serde_json::to_string(identity)?;
        self.store.write(&[
            (TOKEN_KEY, token.to_string()),
            (IDENTITY_KEY, identity_json),
        ])?;
        *self.lock() = Some((token.to_string(), identity.clone()));
        info!(admin = %identity.username, "Admin session stored");
        Ok(())
    }

    /// Clears token and identity together. The in-memory copy is dropped
    /// even if the store cannot be written.
    pub fn teardown(&self) -> Result<(), SessionError> {
        *self.lock() = None;
        self.store.remove(&[TOKEN_KEY, IDENTITY_KEY])
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<(String, AdminIdentity)>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn decode(records: &Records) -> Option<(String, AdminIdentity)> {
    let token = records.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
    let identity = serde_json::from_str(records.get(IDENTITY_KEY)?).ok()?;
    Some((token.clone(), identity))
}
