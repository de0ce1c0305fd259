#![allow(dead_code)]

use std::time::Duration;

use svcreg::scm::memory::MemoryScm;
use svcreg::service::Service;

/// Poll interval and ceiling tight enough for scripted start transitions.
pub const FAST_POLL: Duration = Duration::from_millis(1);
pub const FAST_CEILING: Duration = Duration::from_millis(25);

/// A fresh in-memory manager and a handle bound to `name`, with fast start
/// timing. The returned backend clone shares state with the service.
pub fn manager_and_handle(name: &str) -> (MemoryScm, Service<MemoryScm>) {
    let scm = MemoryScm::new();
    let service = Service::with_backend(scm.clone(), name)
        .expect("in-memory manager must accept connections")
        .with_start_timing(FAST_POLL, FAST_CEILING);
    (scm, service)
}

/// Same, but with `name` already registered.
pub fn registered(
    name: &str,
    display_name: &str,
    binary_path: &str,
) -> (MemoryScm, Service<MemoryScm>) {
    let (scm, mut service) = manager_and_handle(name);
    service
        .register_with_display_name(binary_path, display_name)
        .expect("registration on an empty registry must succeed");
    (scm, service)
}
