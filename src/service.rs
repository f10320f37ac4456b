//! Load / apply / save orchestration over a [`LicenseStore`].
//!
//! Each call loads a fresh record, runs one coordinator operation on it and
//! saves the result only when something changed. A `Conflict` from the
//! store is returned to the caller untouched; nothing here retries.

use crate::coordinator::LifecycleCoordinator;
use crate::license::record::{LicenseRecord, NewLicense};
use crate::license::status::LicenseStatus;
use crate::license::Transition;
use crate::store::query::LicenseFilter;
use crate::store::LicenseStore;
use crate::LifecycleError;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Lifecycle operations bound to a store.
#[derive(Debug)]
pub struct LicenseService<S: LicenseStore> {
    coordinator: LifecycleCoordinator,
    store: S,
}

impl<S: LicenseStore> LicenseService<S> {
    /// Bind a coordinator to a store.
    pub fn new(coordinator: LifecycleCoordinator, store: S) -> Self {
        Self { coordinator, store }
    }

    /// Create and persist a new license.
    pub fn create(&self, request: NewLicense) -> Result<Transition, LifecycleError> {
        let created = self.coordinator.create(request)?;
        let record = self.store.save(&created.record)?;
        info!(license_id = %record.id(), publication = %record.publication_ref(), user = %record.user_ref(), "license created");
        Ok(Transition {
            record,
            outcome: created.outcome,
        })
    }

    /// Register a device on a stored license.
    pub fn register_device(&self, id: &str, device_id: &str) -> Result<Transition, LifecycleError> {
        self.apply(id, "register_device", |c, record| c.register_device(record, device_id))
    }

    /// Deregister a device from a stored license.
    pub fn deregister_device(&self, id: &str, device_id: &str) -> Result<Transition, LifecycleError> {
        self.apply(id, "deregister_device", |c, record| {
            c.deregister_device(record, device_id)
        })
    }

    /// Renew a stored license.
    pub fn renew(
        &self,
        id: &str,
        requested_end: Option<DateTime<Utc>>,
    ) -> Result<Transition, LifecycleError> {
        self.apply(id, "renew", |c, record| c.renew(record, requested_end))
    }

    /// Return a stored license.
    pub fn return_license(&self, id: &str) -> Result<Transition, LifecycleError> {
        self.apply(id, "return", |c, record| c.return_license(record))
    }

    /// Revoke a stored license.
    pub fn revoke(&self, id: &str) -> Result<Transition, LifecycleError> {
        self.apply(id, "revoke", |c, record| c.revoke(record))
    }

    /// Cancel a stored license.
    pub fn cancel(&self, id: &str) -> Result<Transition, LifecycleError> {
        self.apply(id, "cancel", |c, record| c.cancel(record))
    }

    /// Current status of a stored license.
    pub fn status(&self, id: &str) -> Result<LicenseStatus, LifecycleError> {
        let record = self.store.load(id)?;
        self.coordinator.query_status(&record)
    }

    /// Fetch a stored license.
    pub fn get(&self, id: &str) -> Result<LicenseRecord, LifecycleError> {
        self.store.load(id)
    }

    /// Soft-delete a stored license.
    pub fn delete(&self, id: &str, at: DateTime<Utc>) -> Result<LicenseRecord, LifecycleError> {
        let deleted = self.store.delete(id, at)?;
        info!(license_id = %id, "license deleted");
        Ok(deleted)
    }

    /// Search stored licenses; status filters are evaluated at `now`.
    pub fn search(
        &self,
        filter: &LicenseFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<LicenseRecord>, LifecycleError> {
        self.store.search(filter, now)
    }

    /// The underlying coordinator.
    pub fn coordinator(&self) -> &LifecycleCoordinator {
        &self.coordinator
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn apply<F>(&self, id: &str, operation: &'static str, op: F) -> Result<Transition, LifecycleError>
    where
        F: FnOnce(&LifecycleCoordinator, &LicenseRecord) -> Result<Transition, LifecycleError>,
    {
        let record = self.store.load(id)?;

        let transition = match op(&self.coordinator, &record) {
            Ok(transition) => transition,
            Err(e) => {
                debug!(license_id = %id, operation, error = %e, "operation rejected");
                return Err(e);
            }
        };

        if !transition.changed() {
            debug!(license_id = %id, operation, "license unchanged");
            return Ok(transition);
        }

        match self.store.save(&transition.record) {
            Ok(saved) => {
                info!(license_id = %id, operation, version = saved.version(), "license updated");
                Ok(Transition {
                    record: saved,
                    outcome: transition.outcome,
                })
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(license_id = %id, operation, "concurrent update, caller should reload");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::config::LifecycleConfig;
    use crate::license::Outcome;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn test_service() -> (LicenseService<MemoryStore>, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(t0()));
        let coordinator = LifecycleCoordinator::with_clock(
            LifecycleConfig::default().with_renew_max_days(30).with_default_device_max(2),
            clock.clone(),
        )
        .unwrap();
        (LicenseService::new(coordinator, MemoryStore::new()), clock)
    }

    #[test]
    fn test_full_lifecycle() {
        let (service, clock) = test_service();
        let created = service
            .create(NewLicense::new("pub", "user").with_id("lic-1").with_window(None, Some(t0() + Duration::days(10))))
            .unwrap();
        assert_eq!(created.outcome, Outcome::Created);
        assert_eq!(created.record.version(), 1);

        let registered = service.register_device("lic-1", "dev-a").unwrap();
        assert_eq!(registered.record.version(), 2);
        assert_eq!(service.status("lic-1").unwrap(), LicenseStatus::Active);

        clock.advance(Duration::days(5));
        let renewed = service.renew("lic-1", None).unwrap();
        assert_eq!(renewed.record.end(), Some(t0() + Duration::days(40)));

        let returned = service.return_license("lic-1").unwrap();
        assert_eq!(returned.record.device_count(), 0);
        assert_eq!(service.status("lic-1").unwrap(), LicenseStatus::Returned);
        assert_eq!(service.get("lic-1").unwrap().version(), 4);
    }

    #[test]
    fn test_unchanged_is_not_saved() {
        let (service, _) = test_service();
        service.create(NewLicense::new("pub", "user").with_id("lic-1")).unwrap();
        service.register_device("lic-1", "dev-a").unwrap();

        let again = service.register_device("lic-1", "dev-a").unwrap();
        assert_eq!(again.outcome, Outcome::Unchanged);
        assert_eq!(service.get("lic-1").unwrap().version(), 2);
    }

    #[test]
    fn test_errors_propagate_unchanged() {
        let (service, _) = test_service();
        assert!(matches!(
            service.revoke("missing"),
            Err(LifecycleError::NotFound { .. })
        ));

        service.create(NewLicense::new("pub", "user").with_id("lic-1")).unwrap();
        service.register_device("lic-1", "a").unwrap();
        service.register_device("lic-1", "b").unwrap();
        assert!(matches!(
            service.register_device("lic-1", "c"),
            Err(LifecycleError::DeviceLimitExceeded { max: 2 })
        ));
        assert_eq!(service.get("lic-1").unwrap().device_count(), 2);
    }

    #[test]
    fn test_deleted_license_is_not_found() {
        let (service, _) = test_service();
        service.create(NewLicense::new("pub", "user").with_id("lic-1")).unwrap();
        service.delete("lic-1", t0()).unwrap();
        assert!(matches!(service.status("lic-1"), Err(LifecycleError::NotFound { .. })));
        assert!(service.search(&LicenseFilter::User("user".into()), t0()).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_create_conflicts() {
        let (service, _) = test_service();
        service.create(NewLicense::new("pub", "user").with_id("lic-1")).unwrap();
        let duplicate = service.create(NewLicense::new("pub", "other").with_id("lic-1"));
        assert!(matches!(duplicate, Err(LifecycleError::Conflict { .. })));
    }
}
