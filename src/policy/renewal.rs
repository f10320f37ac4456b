//! Renewal policy.
//!
//! Decides the new end of a license's validity window and whether a renewal
//! request is admissible:
//! - only `ready` or `active` licenses renew
//! - the new end never exceeds `max_end`
//! - the new end must lie in the future and never shrink validity

use crate::license::record::LicenseRecord;
use crate::license::status::{require_status, LicenseStatus};
use crate::license::Transition;
use crate::LifecycleError;
use chrono::{DateTime, Duration, Utc};

/// Default end when the request does not name one:
/// `max(end, now) + renew_max_days`.
///
/// Saturates at the latest representable time; the `max_end` check then
/// rejects it for any license with a ceiling.
pub fn default_renewal_end(
    record: &LicenseRecord,
    now: DateTime<Utc>,
    renew_max_days: u32,
) -> DateTime<Utc> {
    let base = record.end().map_or(now, |end| end.max(now));
    base.checked_add_signed(Duration::days(i64::from(renew_max_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Resolve and validate the end a renewal would set.
///
/// # Errors
/// * `InvalidState` - the license is expired or terminal
/// * `RenewalTooLate` - the new end is past `max_end`
/// * `RenewalInPast` - the new end is not after `now`, or before the current end
pub fn check_renewal(
    record: &LicenseRecord,
    requested_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    renew_max_days: u32,
) -> Result<DateTime<Utc>, LifecycleError> {
    require_status(
        record,
        now,
        "renew",
        &[LicenseStatus::Ready, LicenseStatus::Active],
    )?;

    let new_end =
        requested_end.unwrap_or_else(|| default_renewal_end(record, now, renew_max_days));

    if let Some(max_end) = record.max_end() {
        if new_end > max_end {
            return Err(LifecycleError::RenewalTooLate {
                requested: new_end,
                max_end,
            });
        }
    }

    if new_end <= now || record.end().is_some_and(|end| new_end < end) {
        return Err(LifecycleError::RenewalInPast { requested: new_end });
    }

    Ok(new_end)
}

/// Extend the license's validity to `requested_end` (or the default end).
///
/// A license with no ceiling gets `max_end = new end` on its first renewal.
pub fn renew(
    record: &LicenseRecord,
    requested_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    renew_max_days: u32,
) -> Result<Transition, LifecycleError> {
    let new_end = check_renewal(record, requested_end, now, renew_max_days)?;

    if record.end() == Some(new_end) && record.max_end().is_some() {
        return Ok(Transition::unchanged(record));
    }

    let mut next = record.clone();
    next.set_end(new_end);
    if next.max_end().is_none() {
        next.set_max_end(new_end);
    }
    next.touch(now);
    Ok(Transition::updated(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::record::NewLicense;
    use crate::license::status::TerminalStatus;
    use crate::license::Outcome;
    use chrono::TimeZone;

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn make_record(end: Option<DateTime<Utc>>, max_end: Option<DateTime<Utc>>) -> LicenseRecord {
        let mut request = NewLicense::new("pub", "user").with_window(None, end);
        request.max_end = max_end;
        LicenseRecord::from_request(request, "lic".into(), t() - Duration::days(30))
    }

    #[test]
    fn test_renew_within_ceiling_then_too_late() {
        let record = make_record(Some(t()), Some(t() + Duration::days(30)));
        let now = t() - Duration::days(1);

        let first = renew(&record, Some(t() + Duration::days(10)), now, 0).unwrap();
        assert_eq!(first.outcome, Outcome::Updated);
        assert_eq!(first.record.end(), Some(t() + Duration::days(10)));
        assert_eq!(first.record.max_end(), Some(t() + Duration::days(30)));
        assert_eq!(first.record.updated_at(), now);

        let second = renew(&first.record, Some(t() + Duration::days(40)), now, 0);
        assert!(matches!(second, Err(LifecycleError::RenewalTooLate { .. })));
    }

    #[test]
    fn test_renew_exactly_to_ceiling() {
        let record = make_record(Some(t()), Some(t() + Duration::days(30)));
        let result = renew(&record, Some(t() + Duration::days(30)), t(), 0).unwrap();
        assert_eq!(result.record.end(), record.max_end());
    }

    #[test]
    fn test_default_end_extends_from_current_end() {
        let record = make_record(Some(t() + Duration::days(5)), None);
        let end = default_renewal_end(&record, t(), 7);
        assert_eq!(end, t() + Duration::days(12));
    }

    #[test]
    fn test_default_end_extends_from_now_when_unbounded() {
        let record = make_record(None, None);
        assert_eq!(default_renewal_end(&record, t(), 7), t() + Duration::days(7));
    }

    #[test]
    fn test_default_end_saturates_near_time_limit() {
        let edge = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        let record = make_record(Some(edge), Some(edge));
        assert_eq!(default_renewal_end(&record, t(), 30), DateTime::<Utc>::MAX_UTC);

        assert!(matches!(
            renew(&record, None, t(), 30),
            Err(LifecycleError::RenewalTooLate { max_end, .. }) if max_end == edge
        ));
    }

    #[test]
    fn test_first_renewal_sets_ceiling() {
        let record = make_record(Some(t() + Duration::days(1)), None);
        let result = renew(&record, None, t(), 10).unwrap();
        assert_eq!(result.record.end(), Some(t() + Duration::days(11)));
        assert_eq!(result.record.max_end(), Some(t() + Duration::days(11)));
    }

    #[test]
    fn test_renew_rejects_shrinking() {
        let record = make_record(Some(t() + Duration::days(10)), None);
        let result = renew(&record, Some(t() + Duration::days(5)), t(), 0);
        assert!(matches!(result, Err(LifecycleError::RenewalInPast { .. })));
    }

    #[test]
    fn test_renew_rejects_end_not_after_now() {
        let record = make_record(None, None);
        assert!(matches!(
            renew(&record, Some(t()), t(), 0),
            Err(LifecycleError::RenewalInPast { .. })
        ));
        // zero-day default lands on `now` itself
        assert!(matches!(
            renew(&record, None, t(), 0),
            Err(LifecycleError::RenewalInPast { .. })
        ));
    }

    #[test]
    fn test_renew_same_end_is_unchanged() {
        let record = make_record(Some(t() + Duration::days(3)), Some(t() + Duration::days(9)));
        let result = renew(&record, Some(t() + Duration::days(3)), t(), 0).unwrap();
        assert_eq!(result.outcome, Outcome::Unchanged);
        assert_eq!(result.record, record);
    }

    #[test]
    fn test_renew_rejected_when_expired() {
        let record = make_record(Some(t()), Some(t() + Duration::days(30)));
        let result = renew(&record, Some(t() + Duration::days(5)), t() + Duration::days(1), 0);
        assert!(matches!(
            result,
            Err(LifecycleError::InvalidState { status: LicenseStatus::Expired, .. })
        ));
    }

    #[test]
    fn test_renew_rejected_when_terminal() {
        let mut record = make_record(Some(t()), None);
        record.set_terminal(TerminalStatus::Returned);
        assert!(matches!(
            renew(&record, None, t() - Duration::days(1), 5),
            Err(LifecycleError::InvalidState { status: LicenseStatus::Returned, .. })
        ));
    }
}
