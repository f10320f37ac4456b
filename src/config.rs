//! Lifecycle configuration.

use crate::LifecycleError;
use serde::Deserialize;

/// Upper bound on `renew_max_days` (100 years).
pub const MAX_RENEW_DAYS: u32 = 36_500;

/// Plain-value configuration consumed by the lifecycle coordinator.
///
/// The host application loads this however it likes (file, env, flags);
/// the engine only ever sees the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Default renewal window length in days.
    ///
    /// Also used to derive `max_end = end + renew_max_days` when a license
    /// is created with an end date but no explicit ceiling. Zero (the
    /// default) means the ceiling equals the initial end.
    pub renew_max_days: u32,

    /// Device cap applied when a create request does not specify one.
    /// Zero means no cap.
    pub default_device_max: u32,
}

impl LifecycleConfig {
    /// Set the renewal window length.
    pub fn with_renew_max_days(mut self, days: u32) -> Self {
        self.renew_max_days = days;
        self
    }

    /// Set the default device cap.
    pub fn with_default_device_max(mut self, max: u32) -> Self {
        self.default_device_max = max;
        self
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.renew_max_days > MAX_RENEW_DAYS {
            return Err(LifecycleError::ConfigError(format!(
                "renew_max_days must be at most {}, got {}",
                MAX_RENEW_DAYS, self.renew_max_days
            )));
        }
        Ok(())
    }
}
