#[path = "common/mod.rs"]
mod common;

use common::registered;
use svcreg::error::ServiceError;
use svcreg::policy::{self, StartupPolicy};

#[test]
fn startup_round_trips_for_every_policy() {
    let (_scm, mut service) = registered("acme", "Acme", "/opt/acme/bin/acme");

    for policy in [
        StartupPolicy::Automatic,
        StartupPolicy::Manual,
        StartupPolicy::Disabled,
    ] {
        service.set_startup(policy).unwrap();
        assert_eq!(service.startup().unwrap(), policy);
    }
}

#[test]
fn boot_and_system_start_read_back_as_automatic() {
    let (scm, mut service) = registered("acme", "Acme", "/opt/acme/bin/acme");

    for raw in [policy::BOOT_START, policy::SYSTEM_START, policy::AUTO_START] {
        scm.corrupt_start_type("acme", raw);
        assert_eq!(service.startup().unwrap(), StartupPolicy::Automatic);
    }
}

#[test]
fn out_of_domain_start_type_raises_instead_of_defaulting() {
    let (scm, mut service) = registered("acme", "Acme", "/opt/acme/bin/acme");
    scm.corrupt_start_type("acme", 42);

    match service.startup().unwrap_err() {
        ServiceError::CorruptStartType { service, raw } => {
            assert_eq!(service, "acme");
            assert_eq!(raw, 42);
        }
        other => panic!("expected a corrupt start type, got {other}"),
    }
}

#[test]
fn rejected_update_reports_config_update_failed() {
    let (scm, mut service) = registered("acme", "Acme", "/opt/acme/bin/acme");
    scm.reject_config_update(true);

    let err = service.set_startup(StartupPolicy::Automatic).unwrap_err();
    assert!(matches!(err, ServiceError::ConfigUpdateFailed { .. }));
    // The entry keeps its demand-start default.
    assert_eq!(scm.start_type_of("acme"), Some(policy::DEMAND_START));
}

#[test]
fn set_startup_leaves_other_fields_untouched() {
    let (_scm, mut service) = registered("acme", "Acme Daemon", "/opt/acme/bin/acme");

    service.set_startup(StartupPolicy::Disabled).unwrap();
    assert_eq!(service.display_name().unwrap(), "Acme Daemon");
    assert_eq!(service.path().unwrap(), "/opt/acme/bin/acme");
}
