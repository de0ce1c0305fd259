#[path = "common/mod.rs"]
mod common;

use common::registered;
use svcreg::error::ServiceError;
use svcreg::scm::ServiceState;
use svcreg::scm::memory::StartBehavior;

#[test]
fn start_returns_once_the_service_is_running() {
    let (scm, mut service) = registered("web", "Web Server", "/usr/bin/web");
    scm.set_start_behavior(StartBehavior::Immediate);

    service.start().unwrap();
    assert!(service.is_running().unwrap());
}

#[test]
fn start_polls_through_the_pending_state() {
    let (scm, mut service) = registered("web", "Web Server", "/usr/bin/web");
    scm.set_start_behavior(StartBehavior::AfterPolls(3));

    service.start().unwrap();
    assert!(service.is_running().unwrap());
    // The poll loop had to ask more than once to get past start-pending.
    assert!(scm.counters().status_queries > 3);
}

#[test]
fn start_stuck_in_pending_times_out() {
    let (scm, mut service) = registered("web", "Web Server", "/usr/bin/web");
    scm.set_start_behavior(StartBehavior::NeverCompletes);

    match service.start().unwrap_err() {
        ServiceError::StartTimeout {
            service,
            waited_ms,
            last_state,
        } => {
            assert_eq!(service, "web");
            assert!(waited_ms >= common::FAST_CEILING.as_millis() as u64);
            assert_eq!(last_state, ServiceState::StartPending);
        }
        other => panic!("expected a start timeout, got {other}"),
    }
}

#[test]
fn rejected_start_fails_without_polling() {
    let (scm, mut service) = registered("web", "Web Server", "/usr/bin/web");
    scm.reject_start(true);

    let queries_before = scm.counters().status_queries;
    let err = service.start().unwrap_err();
    assert!(matches!(err, ServiceError::StartFailed { .. }));
    assert_eq!(scm.counters().status_queries, queries_before);
}

#[test]
fn status_query_failure_during_start_is_reported_as_query_failure() {
    let (scm, mut service) = registered("web", "Web Server", "/usr/bin/web");
    scm.set_start_behavior(StartBehavior::NeverCompletes);
    scm.fail_status_queries(true);

    let err = service.start().unwrap_err();
    assert!(matches!(err, ServiceError::QueryFailed { .. }));
}

#[test]
fn is_running_is_false_for_a_never_started_service() {
    let (_scm, mut service) = registered("web", "Web Server", "/usr/bin/web");
    assert!(!service.is_running().unwrap());
}

#[test]
fn stop_acknowledges_without_waiting_for_stopped() {
    let (scm, mut service) = registered("web", "Web Server", "/usr/bin/web");
    scm.set_start_behavior(StartBehavior::Immediate);
    service.start().unwrap();

    let queries_before = scm.counters().status_queries;
    service.stop().unwrap();
    // Stop is asymmetric with start: no status polling at all.
    assert_eq!(scm.counters().status_queries, queries_before);
    assert_eq!(scm.state_of("web"), Some(ServiceState::Stopped));
}

#[test]
fn stop_of_a_stopped_service_reports_stop_failed() {
    let (_scm, mut service) = registered("web", "Web Server", "/usr/bin/web");
    let err = service.stop().unwrap_err();
    assert!(matches!(err, ServiceError::StopFailed { .. }));
}

#[test]
fn start_of_an_unregistered_service_reports_not_found() {
    let (scm, mut service) = registered("web", "Web Server", "/usr/bin/web");
    service.unregister().unwrap();
    drop(service);

    let mut fresh = svcreg::service::Service::with_backend(scm, "web").unwrap();
    assert!(matches!(
        fresh.start().unwrap_err(),
        ServiceError::NotFound { .. }
    ));
}
