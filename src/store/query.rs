//! Search filters over stored licenses.

use crate::license::record::LicenseRecord;
use crate::license::status::LicenseStatus;
use crate::LifecycleError;
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Inclusive range of registered-device counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCountRange {
    /// Lowest count included.
    pub min: u32,
    /// Highest count included.
    pub max: u32,
}

impl DeviceCountRange {
    /// Build a range, rejecting `min > max`.
    pub fn new(min: u32, max: u32) -> Result<Self, LifecycleError> {
        if min > max {
            return Err(LifecycleError::InvalidRequest(format!(
                "invalid device count range: {} > {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Whether `count` falls in the range.
    pub fn contains(&self, count: u32) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

/// Parses the `"min:max"` form.
impl FromStr for DeviceCountRange {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LifecycleError::InvalidRequest(format!("invalid count parameter: {}", s));

        let (min, max) = s.split_once(':').ok_or_else(invalid)?;
        let min = min.trim().parse::<u32>().map_err(|_| invalid())?;
        let max = max.trim().parse::<u32>().map_err(|_| invalid())?;
        Self::new(min, max)
    }
}

/// Criterion for searching licenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseFilter {
    /// Licenses held by a user.
    User(String),
    /// Licenses for a publication.
    Publication(String),
    /// Licenses whose derived status matches.
    Status(LicenseStatus),
    /// Licenses whose device count falls in a range.
    DeviceCount(DeviceCountRange),
}

impl LicenseFilter {
    /// Build a filter from a query parameter (`user`, `pub`, `status`, `count`).
    pub fn parse(key: &str, value: &str) -> Result<Self, LifecycleError> {
        match key {
            "user" => Ok(Self::User(value.to_string())),
            "pub" => Ok(Self::Publication(value.to_string())),
            "status" => Ok(Self::Status(value.parse()?)),
            "count" => Ok(Self::DeviceCount(value.parse()?)),
            other => Err(LifecycleError::InvalidRequest(format!(
                "unknown search parameter: {}",
                other
            ))),
        }
    }

    /// Whether `record` satisfies the filter at `now`.
    pub fn matches(&self, record: &LicenseRecord, now: DateTime<Utc>) -> bool {
        match self {
            Self::User(user) => record.user_ref() == user,
            Self::Publication(publication) => record.publication_ref() == publication,
            Self::Status(status) => record.status_at(now) == *status,
            Self::DeviceCount(range) => range.contains(record.device_count()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_range() {
        let range: DeviceCountRange = "1:3".parse().unwrap();
        assert_eq!(range, DeviceCountRange { min: 1, max: 3 });
        assert!(range.contains(1));
        assert!(range.contains(3));
        assert!(!range.contains(0));
        assert!(!range.contains(4));
    }

    #[test]
    fn test_parse_count_range_malformed() {
        for input in ["", "3", "1:2:3", "a:2", "1:b", "5:1", "-1:2"] {
            assert!(
                matches!(input.parse::<DeviceCountRange>(), Err(LifecycleError::InvalidRequest(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(
            LicenseFilter::parse("user", "u-1").unwrap(),
            LicenseFilter::User("u-1".into())
        );
        assert_eq!(
            LicenseFilter::parse("status", "expired").unwrap(),
            LicenseFilter::Status(LicenseStatus::Expired)
        );
        assert_eq!(
            LicenseFilter::parse("count", "0:0").unwrap(),
            LicenseFilter::DeviceCount(DeviceCountRange { min: 0, max: 0 })
        );
        assert!(LicenseFilter::parse("color", "red").is_err());
        assert!(LicenseFilter::parse("status", "lost").is_err());
    }
}
