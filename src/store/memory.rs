//! In-memory store.

use crate::license::record::LicenseRecord;
use crate::store::{next_version, sort_records, LicenseStore};
use crate::LifecycleError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Process-local store backed by a locked map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, LicenseRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, LicenseRecord>>, LifecycleError> {
        self.records
            .read()
            .map_err(|_| LifecycleError::StoreIO("memory store lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, LicenseRecord>>, LifecycleError> {
        self.records
            .write()
            .map_err(|_| LifecycleError::StoreIO("memory store lock poisoned".to_string()))
    }
}

impl LicenseStore for MemoryStore {
    fn load(&self, id: &str) -> Result<LicenseRecord, LifecycleError> {
        self.read()?
            .get(id)
            .filter(|record| !record.is_deleted())
            .cloned()
            .ok_or_else(|| LifecycleError::NotFound { id: id.to_string() })
    }

    fn save(&self, record: &LicenseRecord) -> Result<LicenseRecord, LifecycleError> {
        let mut records = self.write()?;

        let version = match next_version(records.get(record.id()), record) {
            Ok(version) => version,
            Err(e) => {
                warn!(license_id = %record.id(), version = record.version(), error = %e, "save rejected");
                return Err(e);
            }
        };

        let stored = record.clone().with_version(version);
        records.insert(stored.id().to_string(), stored.clone());
        debug!(license_id = %stored.id(), version, "license saved");
        Ok(stored)
    }

    fn delete(&self, id: &str, at: DateTime<Utc>) -> Result<LicenseRecord, LifecycleError> {
        let mut records = self.write()?;

        let current = records
            .get(id)
            .filter(|record| !record.is_deleted())
            .cloned()
            .ok_or_else(|| LifecycleError::NotFound { id: id.to_string() })?;

        let version = current.version() + 1;
        let deleted = current.marked_deleted(at).with_version(version);
        records.insert(id.to_string(), deleted.clone());
        debug!(license_id = %id, "license soft-deleted");
        Ok(deleted)
    }

    fn list(&self) -> Result<Vec<LicenseRecord>, LifecycleError> {
        let mut records: Vec<LicenseRecord> = self
            .read()?
            .values()
            .filter(|record| !record.is_deleted())
            .cloned()
            .collect();
        sort_records(&mut records);
        Ok(records)
    }
}
