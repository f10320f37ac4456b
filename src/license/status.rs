//! Status engine.
//!
//! A license's status is never stored as free-standing state. It is derived
//! from the validity window, the registered device set and the current time,
//! except for the explicit terminal statuses (`returned`, `revoked`,
//! `cancelled`), which override everything once set.

use crate::license::record::LicenseRecord;
use crate::LifecycleError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Effective status of a license at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// Created, no device registered yet.
    Ready,
    /// At least one device registered, within the validity window.
    Active,
    /// The validity window's end has passed.
    Expired,
    /// Returned by the user.
    Returned,
    /// Revoked by an administrator.
    Revoked,
    /// Cancelled before it was ever activated.
    Cancelled,
}

impl LicenseStatus {
    /// Lowercase wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Returned => "returned",
            Self::Revoked => "revoked",
            Self::Cancelled => "cancelled",
        }
    }

    /// Explicitly set statuses that are never recomputed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Returned | Self::Revoked | Self::Cancelled)
    }

    /// Whether new devices may be registered in this status.
    pub fn is_activatable(&self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Self::Ready),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "returned" => Ok(Self::Returned),
            "revoked" => Ok(Self::Revoked),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(LifecycleError::InvalidRequest(format!(
                "unknown license status: {}",
                other
            ))),
        }
    }
}

/// Terminal status recorded on a license by return, revoke or cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    /// See [`LicenseStatus::Returned`].
    Returned,
    /// See [`LicenseStatus::Revoked`].
    Revoked,
    /// See [`LicenseStatus::Cancelled`].
    Cancelled,
}

impl From<TerminalStatus> for LicenseStatus {
    fn from(terminal: TerminalStatus) -> Self {
        match terminal {
            TerminalStatus::Returned => Self::Returned,
            TerminalStatus::Revoked => Self::Revoked,
            TerminalStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// Derive the effective status of a license at `now`.
///
/// 1. A terminal override wins unconditionally.
/// 2. A set `end` strictly before `now` yields `Expired`.
/// 3. One or more registered devices yields `Active`.
/// 4. Otherwise `Ready`.
pub fn current_status(record: &LicenseRecord, now: DateTime<Utc>) -> LicenseStatus {
    if let Some(terminal) = record.terminal_status() {
        return terminal.into();
    }

    if matches!(record.end(), Some(end) if now > end) {
        return LicenseStatus::Expired;
    }

    if record.device_count() >= 1 {
        LicenseStatus::Active
    } else {
        LicenseStatus::Ready
    }
}

/// Fail with `InvalidState` unless the derived status is one of `allowed`.
pub(crate) fn require_status(
    record: &LicenseRecord,
    now: DateTime<Utc>,
    operation: &'static str,
    allowed: &[LicenseStatus],
) -> Result<LicenseStatus, LifecycleError> {
    let status = current_status(record, now);
    if allowed.contains(&status) {
        Ok(status)
    } else {
        Err(LifecycleError::InvalidState { operation, status })
    }
}
