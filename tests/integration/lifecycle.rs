#[path = "common/mod.rs"]
mod common;

use common::{manager_and_handle, registered};
use svcreg::error::ServiceError;
use svcreg::policy::StartupPolicy;

#[test]
fn register_then_is_registered() {
    let (_scm, mut service) = manager_and_handle("acme");
    assert!(!service.is_registered());

    service.register("/opt/acme/bin/acme").unwrap();
    assert!(service.is_registered());
}

#[test]
fn unregister_removes_the_entry_once_all_handles_close() {
    let (scm, mut service) = registered("acme", "Acme", "/opt/acme/bin/acme");

    service.unregister().unwrap();
    // The handle this object holds keeps the flagged entry alive.
    assert!(scm.contains("acme"));

    drop(service);
    assert!(!scm.contains("acme"));

    let mut reopened = svcreg::service::Service::with_backend(scm, "acme").unwrap();
    assert!(!reopened.is_registered());
}

#[test]
fn unregister_unknown_service_reports_not_found() {
    let (_scm, mut service) = manager_and_handle("ghost");
    let err = service.unregister().unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert_eq!(err.service(), Some("ghost"));
}

#[test]
fn reregistering_an_existing_name_fails() {
    let (_scm, mut service) = registered("acme", "Acme", "/opt/acme/bin/acme");
    let err = service.register("/opt/acme/bin/other").unwrap_err();
    assert!(matches!(err, ServiceError::RegistrationFailed { .. }));
    // The failed attempt must not clobber the existing entry.
    assert!(service.is_registered());
    assert_eq!(service.path().unwrap(), "/opt/acme/bin/acme");
}

#[test]
fn unregister_twice_reports_deletion_failed() {
    let (_scm, mut service) = registered("acme", "Acme", "/opt/acme/bin/acme");
    service.unregister().unwrap();
    let err = service.unregister().unwrap_err();
    assert!(matches!(err, ServiceError::DeletionFailed { .. }));
}

#[test]
fn reopening_does_not_complete_a_pending_deletion() {
    let (scm, mut service) = registered("acme", "Acme", "/opt/acme/bin/acme");
    service.unregister().unwrap();

    // Each of these reopens the handle; none of them may let the marked
    // entry slip away while this object still addresses it.
    assert!(service.is_registered());
    assert!(scm.contains("acme"));
    let err = service.unregister().unwrap_err();
    assert!(matches!(err, ServiceError::DeletionFailed { .. }));

    drop(service);
    assert!(!scm.contains("acme"));
}

#[test]
fn freshly_registered_service_reports_expected_record() {
    let (_scm, mut service) = registered("Acme", "Acme Daemon", "/opt/acme/bin/acme");

    assert_eq!(service.display_name().unwrap(), "Acme Daemon");
    assert_eq!(service.path().unwrap(), "/opt/acme/bin/acme");
    // register() leaves the demand-start default in place.
    assert_eq!(service.startup().unwrap(), StartupPolicy::Manual);
    assert!(!service.is_running().unwrap());
}

#[test]
fn manager_connection_outlives_failed_operations() {
    let (scm, mut service) = manager_and_handle("acme");
    assert!(service.unregister().is_err());
    assert!(service.is_running().is_err());

    // The object stays usable; only the service handle was missing.
    service.register("/opt/acme/bin/acme").unwrap();
    assert!(service.is_registered());
    drop(service);
    assert_eq!(scm.open_handles(), 0);
}
