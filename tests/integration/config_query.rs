#[path = "common/mod.rs"]
mod common;

use common::{manager_and_handle, registered};
use svcreg::error::ServiceError;

/// A display name long enough that the record cannot fit the initial
/// 4096-byte buffer guess.
fn oversized_display_name() -> String {
    "Acme Daemon ".repeat(512)
}

#[test]
fn config_query_retries_once_at_the_reported_size() {
    let (scm, mut service) = manager_and_handle("acme");
    let display_name = oversized_display_name();
    service
        .register_with_display_name("/opt/acme/bin/acme", &display_name)
        .unwrap();

    let queries_before = scm.counters().config_queries;
    assert_eq!(service.display_name().unwrap(), display_name);

    let counters = scm.counters();
    // One undersized attempt, one exact-size retry.
    assert_eq!(counters.config_queries - queries_before, 2);
}

#[test]
fn discarded_buffers_are_never_leaked() {
    let (scm, mut service) = registered("acme", &oversized_display_name(), "/opt/acme/bin/acme");

    service.display_name().unwrap();
    service.path().unwrap();
    service.startup().unwrap();

    let counters = scm.counters();
    assert_eq!(counters.buffers_allocated, counters.buffers_freed);
    assert_eq!(scm.buffers_outstanding(), 0);
}

#[test]
fn small_records_succeed_on_the_first_attempt() {
    let (scm, mut service) = registered("acme", "Acme Daemon", "/opt/acme/bin/acme");

    assert_eq!(service.path().unwrap(), "/opt/acme/bin/acme");
    let counters = scm.counters();
    assert_eq!(counters.config_queries, 1);
    assert_eq!(counters.buffers_allocated, 1);
    assert_eq!(counters.buffers_freed, 1);
}

#[test]
fn failed_query_still_frees_the_buffer() {
    let (scm, mut service) = registered("acme", "Acme Daemon", "/opt/acme/bin/acme");
    scm.fail_config_queries(true);

    let err = service.display_name().unwrap_err();
    assert!(matches!(err, ServiceError::QueryFailed { .. }));
    assert_eq!(scm.buffers_outstanding(), 0);
}

#[test]
fn allocation_exhaustion_is_its_own_error() {
    let (scm, mut service) = registered("acme", "Acme Daemon", "/opt/acme/bin/acme");
    scm.fail_allocation(true);

    let err = service.path().unwrap_err();
    assert!(matches!(err, ServiceError::AllocationFailed { .. }));
    assert_eq!(err.service(), Some("acme"));
}

#[test]
fn accessors_requery_instead_of_caching() {
    let (scm, mut service) = registered("acme", "Acme Daemon", "/opt/acme/bin/acme");
    assert_eq!(service.path().unwrap(), "/opt/acme/bin/acme");

    // Rewrite the registry entry behind the handle's back.
    scm.seed_service("acme", "Acme Daemon", "/opt/acme/bin/acme-v2");
    assert_eq!(service.path().unwrap(), "/opt/acme/bin/acme-v2");
}
