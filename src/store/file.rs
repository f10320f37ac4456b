//! File-based store with atomic writes.
//!
//! Stores one JSON record per license under `dirs::data_dir()/<namespace>/`.
//! File names are the SHA-256 of the license id, so arbitrary ids never
//! reach the filesystem. Uses temp file + rename for atomic writes.

use crate::license::record::LicenseRecord;
use crate::store::{next_version, sort_records, LicenseStore};
use crate::LifecycleError;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// File-based store.
#[derive(Debug)]
pub struct FileStore {
    /// Directory holding record files.
    dir: PathBuf,
    /// Serializes version check + write within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a file store with the given namespace.
    ///
    /// Records are stored under `dirs::data_dir()/<namespace>/`.
    pub fn new(namespace: &str) -> Result<Self, LifecycleError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| LifecycleError::StoreIO("Could not find data directory".to_string()))?;
        Self::with_path(base_dir.join(namespace))
    }

    /// Create a file store rooted at a specific directory.
    pub fn with_path(dir: PathBuf) -> Result<Self, LifecycleError> {
        fs::create_dir_all(&dir)
            .map_err(|e| LifecycleError::StoreIO(format!("Failed to create store dir: {}", e)))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash_license_id(id)))
    }

    /// Read a record, deleted or not.
    fn read_raw(&self, id: &str) -> Result<Option<LicenseRecord>, LifecycleError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| LifecycleError::StoreIO(format!("Failed to read record: {}", e)))?;
        let record = serde_json::from_str(&json)
            .map_err(|e| LifecycleError::StoreIO(format!("Failed to parse record: {}", e)))?;
        Ok(Some(record))
    }

    fn write_atomic(&self, record: &LicenseRecord) -> Result<(), LifecycleError> {
        let target_path = self.record_path(record.id());
        let temp_path = target_path.with_extension("tmp");

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| LifecycleError::StoreIO(format!("Failed to serialize record: {}", e)))?;

        fs::write(&temp_path, &json)
            .map_err(|e| LifecycleError::StoreIO(format!("Failed to write temp file: {}", e)))?;
        fs::rename(&temp_path, &target_path)
            .map_err(|e| LifecycleError::StoreIO(format!("Failed to rename record file: {}", e)))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, LifecycleError> {
        self.write_lock
            .lock()
            .map_err(|_| LifecycleError::StoreIO("file store lock poisoned".to_string()))
    }
}

impl LicenseStore for FileStore {
    fn load(&self, id: &str) -> Result<LicenseRecord, LifecycleError> {
        self.read_raw(id)?
            .filter(|record| !record.is_deleted())
            .ok_or_else(|| LifecycleError::NotFound { id: id.to_string() })
    }

    fn save(&self, record: &LicenseRecord) -> Result<LicenseRecord, LifecycleError> {
        let _guard = self.lock()?;

        let existing = self.read_raw(record.id())?;
        let version = match next_version(existing.as_ref(), record) {
            Ok(version) => version,
            Err(e) => {
                warn!(license_id = %record.id(), version = record.version(), error = %e, "save rejected");
                return Err(e);
            }
        };

        let stored = record.clone().with_version(version);
        self.write_atomic(&stored)?;
        debug!(license_id = %stored.id(), version, "license saved");
        Ok(stored)
    }

    fn delete(&self, id: &str, at: DateTime<Utc>) -> Result<LicenseRecord, LifecycleError> {
        let _guard = self.lock()?;

        let current = self
            .read_raw(id)?
            .filter(|record| !record.is_deleted())
            .ok_or_else(|| LifecycleError::NotFound { id: id.to_string() })?;

        let version = current.version() + 1;
        let deleted = current.marked_deleted(at).with_version(version);
        self.write_atomic(&deleted)?;
        debug!(license_id = %id, "license soft-deleted");
        Ok(deleted)
    }

    fn list(&self) -> Result<Vec<LicenseRecord>, LifecycleError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .map_err(|e| LifecycleError::StoreIO(format!("Failed to read store dir: {}", e)))?
        {
            let entry = entry
                .map_err(|e| LifecycleError::StoreIO(format!("Failed to read entry: {}", e)))?;
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }

            let json = fs::read_to_string(&path)
                .map_err(|e| LifecycleError::StoreIO(format!("Failed to read record: {}", e)))?;
            let record: LicenseRecord = serde_json::from_str(&json)
                .map_err(|e| LifecycleError::StoreIO(format!("Failed to parse record: {}", e)))?;
            if !record.is_deleted() {
                records.push(record);
            }
        }
        sort_records(&mut records);
        Ok(records)
    }
}

/// SHA-256 hex of a license id, used as its file name.
pub fn hash_license_id(id: &str) -> String {
    hex::encode(Sha256::digest(id.as_bytes()))
}
