//! Persistence collaborator.
//!
//! The lifecycle engine never touches storage. The orchestrating layer loads
//! a record, applies a coordinator operation and saves the result; `save`
//! enforces optimistic concurrency through the record's `version`.

pub mod file;
pub mod memory;
pub mod query;

use crate::license::record::LicenseRecord;
use crate::LifecycleError;
use chrono::{DateTime, Utc};
use self::query::LicenseFilter;

/// Storage boundary for license records.
pub trait LicenseStore: Send + Sync {
    /// Load a live record.
    ///
    /// # Errors
    /// * `NotFound` - absent or soft-deleted
    fn load(&self, id: &str) -> Result<LicenseRecord, LifecycleError>;

    /// Persist a record and return the stored copy with its new version.
    ///
    /// # Errors
    /// * `Conflict` - the stored version moved since `record` was loaded
    /// * `NotFound` - the record was deleted, or never stored but carries a version
    fn save(&self, record: &LicenseRecord) -> Result<LicenseRecord, LifecycleError>;

    /// Soft-delete a record. Later loads report `NotFound`.
    fn delete(&self, id: &str, at: DateTime<Utc>) -> Result<LicenseRecord, LifecycleError>;

    /// All live records, oldest first.
    fn list(&self) -> Result<Vec<LicenseRecord>, LifecycleError>;

    /// Live records matching `filter`, with status derived at `now`.
    fn search(
        &self,
        filter: &LicenseFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<LicenseRecord>, LifecycleError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|record| filter.matches(record, now))
            .collect())
    }
}

/// Version the incoming record gets if it may overwrite `existing`.
pub(crate) fn next_version(
    existing: Option<&LicenseRecord>,
    incoming: &LicenseRecord,
) -> Result<u64, LifecycleError> {
    match existing {
        None if incoming.version() == 0 => Ok(1),
        None => Err(LifecycleError::NotFound {
            id: incoming.id().to_string(),
        }),
        Some(current) if current.is_deleted() => Err(LifecycleError::NotFound {
            id: incoming.id().to_string(),
        }),
        Some(current) if current.version() != incoming.version() => {
            Err(LifecycleError::Conflict {
                id: incoming.id().to_string(),
            })
        }
        Some(current) => Ok(current.version() + 1),
    }
}

pub(crate) fn sort_records(records: &mut [LicenseRecord]) {
    records.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}
