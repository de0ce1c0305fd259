//! Svcreg is a small client for the operating system's service control
//! manager: the registry of installable background services, their
//! executable paths, display names, and startup policies. It exposes one
//! addressable object per service name and hides the manager/service handle
//! pair, the resizable config-buffer protocol, and the polling required to
//! synchronize with asynchronous service starts.

/// CLI interface.
pub mod cli;

/// Named timing and buffer constants.
pub mod constants;

/// Error handling.
pub mod error;

/// Startup-policy translation.
pub mod policy;

/// Control manager backends and raw types.
pub mod scm;

/// The per-service handle object.
pub mod service;
