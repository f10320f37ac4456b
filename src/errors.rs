//! License lifecycle error types.

use crate::license::status::LicenseStatus;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned by lifecycle operations and the persistence boundary.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Operation not permitted in the record's current derived status.
    #[error("cannot {operation} a license in status {status}")]
    InvalidState {
        /// The rejected operation (e.g. "renew").
        operation: &'static str,
        /// The derived status at the time of the call.
        status: LicenseStatus,
    },

    /// Requested or derived end exceeds the license's `max_end`.
    #[error("renewal to {requested} exceeds the maximum end {max_end}")]
    RenewalTooLate {
        /// The end date that was asked for (or computed).
        requested: DateTime<Utc>,
        /// The ceiling it ran into.
        max_end: DateTime<Utc>,
    },

    /// Requested end does not extend validity.
    #[error("renewal to {requested} does not extend the license")]
    RenewalInPast {
        /// The end date that was asked for (or computed).
        requested: DateTime<Utc>,
    },

    /// Device cap reached for an unrecognized device.
    #[error("device limit exceeded (max {max} devices)")]
    DeviceLimitExceeded {
        /// The configured device cap.
        max: u32,
    },

    /// Deregistration of a device that is not registered.
    #[error("device not registered: {device_id}")]
    DeviceNotFound {
        /// The unknown device identifier.
        device_id: String,
    },

    /// Record absent (or soft-deleted) at the persistence boundary.
    #[error("license not found: {id}")]
    NotFound {
        /// The license identifier that was looked up.
        id: String,
    },

    /// Optimistic-concurrency collision on save; reload and retry.
    #[error("license {id} was modified concurrently")]
    Conflict {
        /// The license identifier that collided.
        id: String,
    },

    /// Request payload failed validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Store I/O or (de)serialization failure.
    #[error("Store I/O error: {0}")]
    StoreIO(String),
}

/// Fieldless discriminant of [`LifecycleError`], for mapping onto
/// transport-level response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`LifecycleError::InvalidState`].
    InvalidState,
    /// See [`LifecycleError::RenewalTooLate`].
    RenewalTooLate,
    /// See [`LifecycleError::RenewalInPast`].
    RenewalInPast,
    /// See [`LifecycleError::DeviceLimitExceeded`].
    DeviceLimitExceeded,
    /// See [`LifecycleError::DeviceNotFound`].
    DeviceNotFound,
    /// See [`LifecycleError::NotFound`].
    NotFound,
    /// See [`LifecycleError::Conflict`].
    Conflict,
    /// See [`LifecycleError::InvalidRequest`].
    InvalidRequest,
    /// See [`LifecycleError::ConfigError`].
    Config,
    /// See [`LifecycleError::StoreIO`].
    StoreIO,
}

impl LifecycleError {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::RenewalTooLate { .. } => ErrorKind::RenewalTooLate,
            Self::RenewalInPast { .. } => ErrorKind::RenewalInPast,
            Self::DeviceLimitExceeded { .. } => ErrorKind::DeviceLimitExceeded,
            Self::DeviceNotFound { .. } => ErrorKind::DeviceNotFound,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::ConfigError(_) => ErrorKind::Config,
            Self::StoreIO(_) => ErrorKind::StoreIO,
        }
    }

    /// Whether the caller should reload the record and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
