//! Attachment relocation collaborator boundary.
//!
//! Archiving or deleting an invoice relocates its attachment files to an
//! archival/deleted area and drops a small info document next to them. The
//! policy is best effort and never destroys data: a failed move is logged and
//! the file stays where it was, but the owning state transition still
//! completes. Byte handling lives entirely behind this trait.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use thiserror::Error;

/// Failure reported by an [`AttachmentStore`]; logged by the engine, never
/// propagated.
#[derive(Error, Debug)]
#[error("attachment store failure: {0}")]
pub struct StorageError(pub String);

pub trait AttachmentStore: Send + Sync {
    /// Moves a stored file from `source` to `destination`.
    fn relocate(&self, source: &str, destination: &str) -> Result<(), StorageError>;

    /// Writes a new document at `destination`.
    fn write(&self, bytes: &[u8], destination: &str) -> Result<(), StorageError>;
}

/// Accepts every request without touching anything; the default collaborator.
#[derive(Debug, Default)]
pub struct NullAttachmentStore;

impl AttachmentStore for NullAttachmentStore {
    fn relocate(&self, _source: &str, _destination: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn write(&self, _bytes: &[u8], _destination: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// In-memory store with switchable failure, used to exercise the best-effort
/// relocation policy in tests.
#[derive(Debug, Default)]
pub struct MemoryAttachmentStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    moves: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl MemoryAttachmentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every `(source, destination)` move performed so far.
    pub fn moves(&self) -> Vec<(String, String)> {
        self.moves.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Whether a document exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }
}

impl AttachmentStore for MemoryAttachmentStore {
    fn relocate(&self, source: &str, destination: &str) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError(format!("cannot move {source}")));
        }
        self.moves
            .lock()
            .map_err(|_| StorageError("store mutex poisoned".to_string()))?
            .push((source.to_string(), destination.to_string()));
        Ok(())
    }

    fn write(&self, bytes: &[u8], destination: &str) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError(format!("cannot write {destination}")));
        }
        self.files
            .lock()
            .map_err(|_| StorageError("store mutex poisoned".to_string()))?
            .insert(destination.to_string(), bytes.to_vec());
        Ok(())
    }
}
