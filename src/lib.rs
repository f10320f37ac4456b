//! # license-lifecycle
//!
//! **Lifecycle engine for publication licenses.**
//!
//! A license binds a publication to a user and is bounded by a validity
//! window, a renewal ceiling and a device cap. This crate decides what a
//! license's status is and which lifecycle events it accepts. It does no
//! I/O of its own: every operation takes a record snapshot and returns the
//! next snapshot with an outcome code, and the caller persists it.
//!
//! ## Features
//!
//! - **Derived status** - `ready`/`active`/`expired` are computed from the
//!   record and the clock; `returned`/`revoked`/`cancelled` are sticky
//! - **Renewal policy** - extensions never shrink validity or pass `max_end`
//! - **Device ledger** - idempotent registrations tracked by device identity
//! - **Optimistic concurrency** - stores reject stale saves with `Conflict`
//!
//! ## Quickstart
//!
//! ```
//! use license_lifecycle::{LifecycleConfig, LifecycleCoordinator, LicenseStatus, NewLicense};
//!
//! fn main() -> Result<(), license_lifecycle::LifecycleError> {
//!     let config = LifecycleConfig::default()
//!         .with_renew_max_days(30)
//!         .with_default_device_max(2);
//!     let coordinator = LifecycleCoordinator::new(config)?;
//!
//!     let created = coordinator.create(NewLicense::new("urn:isbn:9780000000001", "user-42"))?;
//!     let activated = coordinator.register_device(&created.record, "ereader-1")?;
//!
//!     assert_eq!(coordinator.query_status(&activated.record)?, LicenseStatus::Active);
//!     Ok(())
//! }
//! ```
//!
//! ## Persistence
//!
//! [`LicenseStore`] is the storage boundary. [`MemoryStore`] and
//! [`FileStore`] implement it, and [`LicenseService`] runs the
//! load / apply / save cycle. A [`LifecycleError::Conflict`] means another
//! writer got there first: reload and retry.

#![deny(warnings)]
#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Engine
pub mod license;
pub mod ledger;
pub mod policy;

// Coordinator (main public API)
pub mod coordinator;

// Persistence boundary
pub mod store;
pub mod service;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::LifecycleConfig;
pub use coordinator::LifecycleCoordinator;
pub use errors::{ErrorKind, LifecycleError};
pub use ledger::devices::DeviceCaps;
pub use license::record::{LicenseRecord, NewLicense};
pub use license::status::{current_status, LicenseStatus, TerminalStatus};
pub use license::{Outcome, Transition};
pub use service::LicenseService;
pub use store::file::FileStore;
pub use store::memory::MemoryStore;
pub use store::query::{DeviceCountRange, LicenseFilter};
pub use store::LicenseStore;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
