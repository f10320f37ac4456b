//! Lifecycle Coordinator - the main public API.
//!
//! The `LifecycleCoordinator` applies license-affecting events to a record
//! snapshot and returns the next snapshot plus an [`Outcome`](crate::license::Outcome):
//! - create, device registration and deregistration
//! - renewal
//! - return, revoke and cancel (terminal transitions)
//! - status queries
//!
//! It never loads or saves records; the caller persists the result.

use crate::clock::{Clock, SystemClock};
use crate::config::LifecycleConfig;
use crate::ledger::devices;
use crate::license::record::{LicenseRecord, NewLicense};
use crate::license::status::{current_status, LicenseStatus, TerminalStatus};
use crate::license::Transition;
use crate::policy::renewal;
use crate::LifecycleError;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Build a new `ready` license from a creation request.
///
/// A request with an `end` but no `max_end` gets
/// `max_end = end + renew_max_days`.
pub fn create_license(
    mut request: NewLicense,
    config: &LifecycleConfig,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    request.validate()?;

    let id = request
        .id
        .take()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if request.device_max.is_none() {
        request.device_max = Some(config.default_device_max);
    }

    if let (Some(end), None) = (request.end, request.max_end) {
        let max_end = end
            .checked_add_signed(Duration::days(i64::from(config.renew_max_days)))
            .ok_or_else(|| {
                LifecycleError::InvalidRequest(format!(
                    "end {} leaves no room for a renewal ceiling",
                    end
                ))
            })?;
        request.max_end = Some(max_end);
    }

    Ok(Transition::created(LicenseRecord::from_request(
        request, id, now,
    )))
}

/// Return the license: access ends at `now` and all devices are released.
///
/// `end` never moves forward: an expired license keeps its past end, and the
/// new end never passes `max_end`. Allowed from `active` and `expired`; a
/// no-op on an already returned license.
pub fn return_license(
    record: &LicenseRecord,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    match current_status(record, now) {
        LicenseStatus::Returned => Ok(Transition::unchanged(record)),
        LicenseStatus::Active | LicenseStatus::Expired => {
            let mut next = record.clone();
            next.set_terminal(TerminalStatus::Returned);
            let end = record.end().map_or(now, |end| end.min(now));
            next.set_end(record.max_end().map_or(end, |max_end| end.min(max_end)));
            next.clear_devices();
            next.touch(now);
            Ok(Transition::updated(next))
        }
        status => Err(LifecycleError::InvalidState {
            operation: "return",
            status,
        }),
    }
}

/// Administratively revoke the license, whatever its current status.
///
/// A no-op on a license that is already revoked or cancelled.
pub fn revoke_license(
    record: &LicenseRecord,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    match current_status(record, now) {
        LicenseStatus::Revoked | LicenseStatus::Cancelled => Ok(Transition::unchanged(record)),
        _ => {
            let mut next = record.clone();
            next.set_terminal(TerminalStatus::Revoked);
            next.touch(now);
            Ok(Transition::updated(next))
        }
    }
}

/// Cancel a license that was never activated.
///
/// Only a `ready` license can be cancelled; a no-op when already cancelled.
pub fn cancel_license(
    record: &LicenseRecord,
    now: DateTime<Utc>,
) -> Result<Transition, LifecycleError> {
    match current_status(record, now) {
        LicenseStatus::Cancelled => Ok(Transition::unchanged(record)),
        LicenseStatus::Ready => {
            let mut next = record.clone();
            next.set_terminal(TerminalStatus::Cancelled);
            next.touch(now);
            Ok(Transition::updated(next))
        }
        status => Err(LifecycleError::InvalidState {
            operation: "cancel",
            status,
        }),
    }
}

/// Lifecycle coordinator.
///
/// Stateless apart from its configuration and clock; safe to share across
/// request handlers as long as each call gets its own freshly loaded record.
pub struct LifecycleCoordinator {
    config: LifecycleConfig,
    clock: Arc<dyn Clock>,
}

impl LifecycleCoordinator {
    /// Create a coordinator using the system clock.
    ///
    /// # Errors
    /// Returns `ConfigError` if the configuration fails validation.
    pub fn new(config: LifecycleConfig) -> Result<Self, LifecycleError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a coordinator with an injected clock.
    pub fn with_clock(
        config: LifecycleConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LifecycleError> {
        config.validate()?;
        Ok(Self { config, clock })
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }

    /// Build a new license in `ready` state.
    ///
    /// # Errors
    /// - `InvalidRequest` - missing refs, inverted window, ceiling below end
    pub fn create(&self, request: NewLicense) -> Result<Transition, LifecycleError> {
        create_license(request, &self.config, self.now())
    }

    /// Register a device on the license.
    ///
    /// # Errors
    /// - `NotFound` - the record is soft-deleted
    /// - `InvalidState` - the license is expired or terminal
    /// - `DeviceLimitExceeded` - cap reached and the device is new
    pub fn register_device(
        &self,
        record: &LicenseRecord,
        device_id: &str,
    ) -> Result<Transition, LifecycleError> {
        record.ensure_live()?;
        devices::register_device(record, device_id, self.now())
    }

    /// Remove a registered device.
    ///
    /// # Errors
    /// - `NotFound` - the record is soft-deleted
    /// - `InvalidState` - the license is terminal
    /// - `DeviceNotFound` - the device is not registered
    pub fn deregister_device(
        &self,
        record: &LicenseRecord,
        device_id: &str,
    ) -> Result<Transition, LifecycleError> {
        record.ensure_live()?;
        devices::deregister_device(record, device_id, self.now())
    }

    /// Extend the validity window.
    ///
    /// Without `requested_end`, extends by the configured `renew_max_days`.
    ///
    /// # Errors
    /// - `NotFound` - the record is soft-deleted
    /// - `InvalidState` - the license is expired or terminal
    /// - `RenewalTooLate` - past `max_end`
    /// - `RenewalInPast` - not in the future, or shrinks validity
    pub fn renew(
        &self,
        record: &LicenseRecord,
        requested_end: Option<DateTime<Utc>>,
    ) -> Result<Transition, LifecycleError> {
        record.ensure_live()?;
        renewal::renew(
            record,
            requested_end,
            self.now(),
            self.config.renew_max_days,
        )
    }

    /// Return the license.
    ///
    /// # Errors
    /// - `NotFound` - the record is soft-deleted
    /// - `InvalidState` - the license is ready, revoked or cancelled
    pub fn return_license(&self, record: &LicenseRecord) -> Result<Transition, LifecycleError> {
        record.ensure_live()?;
        return_license(record, self.now())
    }

    /// Revoke the license.
    ///
    /// # Errors
    /// - `NotFound` - the record is soft-deleted
    pub fn revoke(&self, record: &LicenseRecord) -> Result<Transition, LifecycleError> {
        record.ensure_live()?;
        revoke_license(record, self.now())
    }

    /// Cancel a never-activated license.
    ///
    /// # Errors
    /// - `NotFound` - the record is soft-deleted
    /// - `InvalidState` - the license is not ready
    pub fn cancel(&self, record: &LicenseRecord) -> Result<Transition, LifecycleError> {
        record.ensure_live()?;
        cancel_license(record, self.now())
    }

    /// Current effective status, without mutation.
    ///
    /// # Errors
    /// - `NotFound` - the record is soft-deleted
    pub fn query_status(&self, record: &LicenseRecord) -> Result<LicenseStatus, LifecycleError> {
        record.ensure_live()?;
        Ok(current_status(record, self.now()))
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }
}

impl std::fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
