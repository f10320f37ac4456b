//! License record and creation request.

use crate::license::status::{current_status, LicenseStatus, TerminalStatus};
use crate::LifecycleError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Persistent license entity.
///
/// Fields are only reachable through accessors: status, validity and the
/// device set are changed exclusively by lifecycle operations, which take a
/// record snapshot and return a new one. Deserialization rejects records
/// whose device set exceeds the cap, whose end passes `max_end`, or whose
/// `updated_at` precedes `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLicenseRecord")]
pub struct LicenseRecord {
    id: String,
    publication_ref: String,
    user_ref: String,

    /// Explicit terminal override; `None` means the status is derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    terminal: Option<TerminalStatus>,

    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    #[serde(default)]
    max_end: Option<DateTime<Utc>>,

    device_max: u32,

    /// Registered device identifiers. `device_count` is its cardinality.
    #[serde(default)]
    devices: BTreeSet<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    deleted_at: Option<DateTime<Utc>>,

    /// Optimistic-concurrency version, owned by the store.
    #[serde(default)]
    version: u64,
}

/// Wire shape of a stored record, checked before it becomes a `LicenseRecord`.
#[derive(Deserialize)]
struct RawLicenseRecord {
    id: String,
    publication_ref: String,
    user_ref: String,
    #[serde(default)]
    terminal: Option<TerminalStatus>,
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    #[serde(default)]
    max_end: Option<DateTime<Utc>>,
    device_max: u32,
    #[serde(default)]
    devices: BTreeSet<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    version: u64,
}

impl TryFrom<RawLicenseRecord> for LicenseRecord {
    type Error = LifecycleError;

    fn try_from(raw: RawLicenseRecord) -> Result<Self, Self::Error> {
        if raw.device_max > 0 && raw.devices.len() > raw.device_max as usize {
            return Err(LifecycleError::InvalidRequest(format!(
                "license {} has {} devices over a cap of {}",
                raw.id,
                raw.devices.len(),
                raw.device_max
            )));
        }
        if raw.created_at > raw.updated_at {
            return Err(LifecycleError::InvalidRequest(format!(
                "license {} was updated at {} before its creation at {}",
                raw.id, raw.updated_at, raw.created_at
            )));
        }
        if let (Some(end), Some(max_end)) = (raw.end, raw.max_end) {
            if end > max_end {
                return Err(LifecycleError::InvalidRequest(format!(
                    "license {} ends at {} past its ceiling {}",
                    raw.id, end, max_end
                )));
            }
        }

        Ok(Self {
            id: raw.id,
            publication_ref: raw.publication_ref,
            user_ref: raw.user_ref,
            terminal: raw.terminal,
            start: raw.start,
            end: raw.end,
            max_end: raw.max_end,
            device_max: raw.device_max,
            devices: raw.devices,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            deleted_at: raw.deleted_at,
            version: raw.version,
        })
    }
}

impl LicenseRecord {
    /// Build a fresh record from an already-resolved creation request.
    pub(crate) fn from_request(request: NewLicense, id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            publication_ref: request.publication_ref,
            user_ref: request.user_ref,
            terminal: None,
            start: request.start,
            end: request.end,
            max_end: request.max_end,
            device_max: request.device_max.unwrap_or(0),
            devices: BTreeSet::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            version: 0,
        }
    }

    /// Opaque license identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier of the licensed publication.
    pub fn publication_ref(&self) -> &str {
        &self.publication_ref
    }

    /// Identifier of the licensee.
    pub fn user_ref(&self) -> &str {
        &self.user_ref
    }

    /// Explicit terminal status, if one was set.
    pub fn terminal_status(&self) -> Option<TerminalStatus> {
        self.terminal
    }

    /// Effective status at `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> LicenseStatus {
        current_status(self, now)
    }

    /// Start of the validity window (`None` = unbounded).
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// End of the validity window (`None` = unbounded).
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Ceiling for renewals.
    pub fn max_end(&self) -> Option<DateTime<Utc>> {
        self.max_end
    }

    /// Maximum number of registered devices (0 = uncapped).
    pub fn device_max(&self) -> u32 {
        self.device_max
    }

    /// Number of registered devices.
    pub fn device_count(&self) -> u32 {
        u32::try_from(self.devices.len()).unwrap_or(u32::MAX)
    }

    /// Registered device identifiers, in sorted order.
    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(String::as_str)
    }

    /// Whether `device_id` is registered.
    pub fn has_device(&self, device_id: &str) -> bool {
        self.devices.contains(device_id)
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last mutating transition.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Soft-deletion time, if the record was deleted.
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Whether the record has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Optimistic-concurrency version (0 = never persisted).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Copy of this record carrying `version`.
    ///
    /// For store implementations stamping a persisted copy.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Copy of this record marked as deleted at `at`.
    ///
    /// For store implementations; lifecycle operations treat a deleted
    /// record as not found.
    pub fn marked_deleted(mut self, at: DateTime<Utc>) -> Self {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(at);
            self.touch(at);
        }
        self
    }

    /// `NotFound` if the record has been soft-deleted.
    pub(crate) fn ensure_live(&self) -> Result<(), LifecycleError> {
        if self.is_deleted() {
            return Err(LifecycleError::NotFound {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Bump `updated_at`, never moving it backwards.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = self.updated_at.max(now);
    }

    pub(crate) fn set_end(&mut self, end: DateTime<Utc>) {
        self.end = Some(end);
    }

    pub(crate) fn set_max_end(&mut self, max_end: DateTime<Utc>) {
        self.max_end = Some(max_end);
    }

    pub(crate) fn set_terminal(&mut self, terminal: TerminalStatus) {
        self.terminal = Some(terminal);
    }

    /// Returns `false` if the device was already present.
    pub(crate) fn insert_device(&mut self, device_id: &str) -> bool {
        self.devices.insert(device_id.to_string())
    }

    /// Returns `false` if the device was not present.
    pub(crate) fn remove_device(&mut self, device_id: &str) -> bool {
        self.devices.remove(device_id)
    }

    pub(crate) fn clear_devices(&mut self) {
        self.devices.clear();
    }
}

/// Request to create a license.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewLicense {
    /// Caller-chosen identifier; a v4 UUID is generated when absent.
    pub id: Option<String>,
    /// Identifier of the licensed publication.
    pub publication_ref: String,
    /// Identifier of the licensee.
    pub user_ref: String,
    /// Start of the validity window.
    pub start: Option<DateTime<Utc>>,
    /// End of the validity window.
    pub end: Option<DateTime<Utc>>,
    /// Renewal ceiling; derived from `end` when absent.
    pub max_end: Option<DateTime<Utc>>,
    /// Device cap; the configured default applies when absent.
    pub device_max: Option<u32>,
}

impl NewLicense {
    /// Request for an unbounded license of `publication_ref` for `user_ref`.
    pub fn new(publication_ref: impl Into<String>, user_ref: impl Into<String>) -> Self {
        Self {
            publication_ref: publication_ref.into(),
            user_ref: user_ref.into(),
            ..Self::default()
        }
    }

    /// Use a caller-chosen identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the validity window.
    pub fn with_window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Set an explicit renewal ceiling.
    pub fn with_max_end(mut self, max_end: DateTime<Utc>) -> Self {
        self.max_end = Some(max_end);
        self
    }

    /// Set the device cap.
    pub fn with_device_max(mut self, device_max: u32) -> Self {
        self.device_max = Some(device_max);
        self
    }

    /// Reject requests that cannot produce a consistent record.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.publication_ref.trim().is_empty() {
            return Err(LifecycleError::InvalidRequest(
                "publication_ref cannot be empty".to_string(),
            ));
        }
        if self.user_ref.trim().is_empty() {
            return Err(LifecycleError::InvalidRequest(
                "user_ref cannot be empty".to_string(),
            ));
        }
        if matches!(&self.id, Some(id) if id.trim().is_empty()) {
            return Err(LifecycleError::InvalidRequest(
                "id cannot be empty when supplied".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(LifecycleError::InvalidRequest(format!(
                    "start {} is after end {}",
                    start, end
                )));
            }
        }
        if let (Some(end), Some(max_end)) = (self.end, self.max_end) {
            if max_end < end {
                return Err(LifecycleError::InvalidRequest(format!(
                    "max_end {} is before end {}",
                    max_end, end
                )));
            }
        }
        Ok(())
    }
}
