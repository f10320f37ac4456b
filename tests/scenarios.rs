//! End-to-end lifecycle scenarios through the public API.

use chrono::{DateTime, Duration, TimeZone, Utc};
use license_lifecycle::coordinator::{create_license, return_license};
use license_lifecycle::ledger::devices::register_device;
use license_lifecycle::policy::renewal::renew;
use license_lifecycle::{
    current_status, LicenseFilter, LicenseRecord, LicenseService, LicenseStatus,
    LicenseStore, LifecycleConfig, LifecycleCoordinator, LifecycleError, MemoryStore, MockClock,
    NewLicense, Outcome,
};
use std::sync::Arc;

fn t() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap()
}

fn create(request: NewLicense) -> LicenseRecord {
    create_license(request, &LifecycleConfig::default(), t())
        .unwrap()
        .record
}

#[test]
fn device_cap_of_two() {
    let record = create(NewLicense::new("pub", "user").with_device_max(2));
    assert_eq!(current_status(&record, t()), LicenseStatus::Ready);
    assert_eq!(record.device_count(), 0);

    let a = register_device(&record, "A", t()).unwrap().record;
    assert_eq!(a.device_count(), 1);
    assert_eq!(current_status(&a, t()), LicenseStatus::Active);

    let b = register_device(&a, "B", t()).unwrap().record;
    assert_eq!(b.device_count(), 2);

    let c = register_device(&b, "C", t());
    assert!(matches!(c, Err(LifecycleError::DeviceLimitExceeded { .. })));
    assert_eq!(b.device_count(), 2);
}

#[test]
fn renewal_bounded_by_ceiling() {
    let record = create(
        NewLicense::new("pub", "user")
            .with_window(None, Some(t()))
            .with_max_end(t() + Duration::days(30)),
    );
    let now = t() - Duration::hours(1);

    let renewed = renew(&record, Some(t() + Duration::days(10)), now, 0).unwrap();
    assert_eq!(renewed.record.end(), Some(t() + Duration::days(10)));

    let too_late = renew(&renewed.record, Some(t() + Duration::days(40)), now, 0);
    assert!(matches!(too_late, Err(LifecycleError::RenewalTooLate { .. })));
}

#[test]
fn return_is_idempotent() {
    let record = create(
        NewLicense::new("pub", "user")
            .with_window(None, Some(t() + Duration::days(30)))
            .with_device_max(3),
    );
    let active = register_device(&record, "A", t()).unwrap().record;
    assert_eq!(current_status(&active, t()), LicenseStatus::Active);

    let t2 = t() + Duration::days(2);
    let returned = return_license(&active, t2).unwrap();
    assert_eq!(returned.outcome, Outcome::Updated);
    assert_eq!(current_status(&returned.record, t2), LicenseStatus::Returned);
    assert_eq!(returned.record.end(), Some(t2));
    assert_eq!(returned.record.device_count(), 0);

    let again = return_license(&returned.record, t2 + Duration::hours(1)).unwrap();
    assert_eq!(again.outcome, Outcome::Unchanged);
    assert_eq!(again.record, returned.record);
}

#[test]
fn unbounded_license_never_expires() {
    let record = create(NewLicense::new("pub", "user"));
    assert_eq!(record.end(), None);

    for years in [0, 1, 10, 100] {
        let now = t() + Duration::days(365 * years);
        assert_eq!(current_status(&record, now), LicenseStatus::Ready);
    }

    let active = register_device(&record, "A", t()).unwrap().record;
    for years in [0, 1, 10, 100] {
        let now = t() + Duration::days(365 * years);
        assert_eq!(current_status(&active, now), LicenseStatus::Active);
    }
}

#[test]
fn service_reports_conflict_for_stale_writer() {
    let clock = Arc::new(MockClock::new(t()));
    let coordinator = LifecycleCoordinator::with_clock(
        LifecycleConfig::default().with_default_device_max(1),
        clock.clone(),
    )
    .unwrap();
    let service = LicenseService::new(coordinator, MemoryStore::new());
    service
        .create(NewLicense::new("pub", "user").with_id("lic-1"))
        .unwrap();

    // two handlers load the same snapshot and race
    let snapshot = service.get("lic-1").unwrap();
    let first = service.coordinator().register_device(&snapshot, "A").unwrap();
    let second = service.coordinator().register_device(&snapshot, "B").unwrap();

    service.store().save(&first.record).unwrap();
    let err = service.store().save(&second.record).unwrap_err();
    assert!(err.is_retryable());

    // the losing handler reloads and the cap now applies
    clock.advance(Duration::minutes(1));
    assert!(matches!(
        service.register_device("lic-1", "B"),
        Err(LifecycleError::DeviceLimitExceeded { max: 1 })
    ));
}

#[test]
fn search_by_status_uses_query_time() {
    let clock = Arc::new(MockClock::new(t()));
    let coordinator =
        LifecycleCoordinator::with_clock(LifecycleConfig::default(), clock.clone()).unwrap();
    let service = LicenseService::new(coordinator, MemoryStore::new());

    service
        .create(
            NewLicense::new("pub", "user")
                .with_id("short")
                .with_window(None, Some(t() + Duration::days(1))),
        )
        .unwrap();
    service
        .create(NewLicense::new("pub", "user").with_id("open"))
        .unwrap();

    let expired = LicenseFilter::parse("status", "expired").unwrap();
    assert!(service.search(&expired, t()).unwrap().is_empty());

    let later = t() + Duration::days(2);
    let ids: Vec<String> = service
        .search(&expired, later)
        .unwrap()
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    assert_eq!(ids, vec!["short".to_string()]);
}
