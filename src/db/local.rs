// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-local key/value storage (the browser `localStorage` analogue).
//!
//! Holds the persisted provider session and the demo flag. Values are
//! plain strings; callers serialize anything richer themselves.

use crate::error::AppError;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key under which demo mode is recorded.
pub const DEMO_FLAG_KEY: &str = "isDemoUser";

/// String key/value store scoped to this client.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Typed access to the demo flag.
#[derive(Clone)]
pub struct DemoFlag {
    store: Arc<dyn LocalStore>,
}

impl DemoFlag {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub fn is_set(&self) -> Result<bool, AppError> {
        Ok(self.store.get(DEMO_FLAG_KEY)?.as_deref() == Some("true"))
    }

    pub fn set(&self) -> Result<(), AppError> {
        self.store.set(DEMO_FLAG_KEY, "true")
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.store.remove(DEMO_FLAG_KEY)
    }
}

// ─── In-memory ───────────────────────────────────────────────────

/// Volatile store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ─── File-backed ─────────────────────────────────────────────────

/// Store persisted as a single JSON object file.
///
/// Every mutation rewrites the file through a temp file and rename, so a
/// crash leaves either the old or the new contents.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::LocalStorage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                AppError::LocalStorage(format!("Corrupt store {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(AppError::LocalStorage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Local store opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::LocalStorage(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                AppError::LocalStorage(format!("Failed to write {}: {}", self.path.display(), e))
            })
    }

    fn update<F>(&self, mutate: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::LocalStorage("Local store lock poisoned".to_string()))?;

        let mut next = entries.clone();
        if !mutate(&mut next) {
            return Ok(());
        }

        // Only swap in the new map once it is on disk.
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AppError::LocalStorage("Local store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.update(|entries| entries.remove(key).is_some())
    }
}
