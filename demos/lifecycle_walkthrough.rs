//! Lifecycle walkthrough.
//!
//! Creates a license, activates it on two devices, renews it and returns it,
//! printing the outcome of each step.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=license_lifecycle=debug cargo run --example lifecycle_walkthrough
//! ```

use chrono::{Duration, Utc};
use license_lifecycle::{
    LicenseFilter, LicenseService, LifecycleConfig, LifecycleCoordinator, LifecycleError,
    MemoryStore, NewLicense,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("walkthrough failed ({:?}): {}", e.kind(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), LifecycleError> {
    let config = LifecycleConfig::default()
        .with_renew_max_days(30)
        .with_default_device_max(2);
    let service = LicenseService::new(LifecycleCoordinator::new(config)?, MemoryStore::new());

    let end = Utc::now() + Duration::days(14);
    let created = service.create(
        NewLicense::new("urn:isbn:9780000000001", "reader-7").with_window(None, Some(end)),
    )?;
    let id = created.record.id().to_string();
    println!("created {} (max_end {:?})", id, created.record.max_end());

    for device in ["phone", "tablet", "laptop"] {
        match service.register_device(&id, device) {
            Ok(t) => println!("register {}: {:?}, {} device(s)", device, t.outcome, t.record.device_count()),
            Err(e) => println!("register {}: rejected: {}", device, e),
        }
    }
    println!("status: {}", service.status(&id)?);

    let renewed = service.renew(&id, None)?;
    println!("renewed until {:?}", renewed.record.end());

    let returned = service.return_license(&id)?;
    println!("returned: {:?}, status {}", returned.outcome, service.status(&id)?);

    let again = service.return_license(&id)?;
    println!("returned again: {:?}", again.outcome);

    let held = service.search(&LicenseFilter::User("reader-7".into()), Utc::now())?;
    println!("licenses held by reader-7: {}", held.len());
    Ok(())
}
