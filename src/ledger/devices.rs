//! Device registration ledger.
//!
//! Admits or rejects device activations against a license's device cap.
//! The ledger's authoritative state is the record's set of device
//! identifiers, so re-registering a known device is a no-op rather than a
//! second count.

use crate::license::record::LicenseRecord;
use crate::license::status::{require_status, LicenseStatus};
use crate::license::Transition;
use crate::LifecycleError;
use chrono::{DateTime, Utc};

/// Device cap information for a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCaps {
    /// Device limit (None = uncapped).
    pub limit: Option<u32>,

    /// Devices currently registered.
    pub registered: u32,
}

impl DeviceCaps {
    /// Extract caps from a license record.
    pub fn from_record(record: &LicenseRecord) -> Self {
        Self {
            limit: (record.device_max() > 0).then_some(record.device_max()),
            registered: record.device_count(),
        }
    }

    /// Whether `additional` new devices fit under the cap.
    pub fn allows(&self, additional: u32) -> bool {
        match self.limit {
            Some(limit) => u64::from(self.registered) + u64::from(additional) <= u64::from(limit),
            None => true,
        }
    }

    /// Free device slots (None = uncapped).
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.saturating_sub(self.registered))
    }

    /// Check if any cap exists.
    pub fn has_cap(&self) -> bool {
        self.limit.is_some()
    }
}

fn validate_device_id(device_id: &str) -> Result<(), LifecycleError> {
    if device_id.trim().is_empty() {
        return Err(LifecycleError::InvalidRequest(
            "device id cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Check whether `device_id` could be registered at `now` without mutating.
///
/// # Returns
/// * `Ok(true)` - the device would be newly registered
/// * `Ok(false)` - the device is already registered
/// * `Err(InvalidState)` - the license is expired or terminal
/// * `Err(DeviceLimitExceeded)` - the cap is full and the device is new
pub fn check_registration(
    record: &LicenseRecord,
    device_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, LifecycleError> {
    validate_device_id(device_id)?;
    require_status(
        record,
        now,
        "register a device on",
        &[LicenseStatus::Ready, LicenseStatus::Active],
    )?;

    if record.has_device(device_id) {
        return Ok(false);
    }

    let caps = DeviceCaps::from_record(record);
    if !caps.allows(1) {
        return Err(LifecycleError::DeviceLimitExceeded {
            max: record.device_max(),
        });
    }

    Ok(true)
}

/// Register `device_id` on the license.
///
/// Known devices yield `Unchanged`; new ones are added and bump `updated_at`.
pub fn register_device(
    record: &LicenseRecord,
    device_id: &str,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    if !check_registration(record, device_id, now)? {
        return Ok(Transition::unchanged(record));
    }

    let mut next = record.clone();
    next.insert_device(device_id);
    next.touch(now);
    Ok(Transition::updated(next))
}

/// Remove a registered device from the license.
///
/// Allowed on `ready`, `active` and `expired` licenses. Terminal licenses
/// are frozen and fail with `InvalidState`; an unknown device fails with
/// `DeviceNotFound`.
pub fn deregister_device(
    record: &LicenseRecord,
    device_id: &str,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    validate_device_id(device_id)?;
    require_status(
        record,
        now,
        "deregister a device from",
        &[LicenseStatus::Ready, LicenseStatus::Active, LicenseStatus::Expired],
    )?;

    let mut next = record.clone();
    if !next.remove_device(device_id) {
        return Err(LifecycleError::DeviceNotFound {
            device_id: device_id.to_string(),
        });
    }
    next.touch(now);
    Ok(Transition::updated(next))
}
