//! The per-service handle object.
//!
//! [`Service`] binds one service name to a control manager connection and
//! composes the manager's primitive operations into idempotent, safe-to-call
//! high-level ones. The native service handle is acquired lazily and
//! reopened on demand; callers must not assume handle identity is stable
//! across operations.

use std::{thread, time::Duration};

use tracing::debug;

use crate::constants::{
    CONFIG_BUFFER_INITIAL_SIZE, CONFIG_QUERY_MAX_ATTEMPTS, START_POLL_INTERVAL,
    START_TIMEOUT,
};
use crate::error::{ScmError, ServiceError};
use crate::policy::StartupPolicy;
use crate::scm::{ManagerHandle, ScmBackend, ServiceConfig, ServiceState, SvcHandle};

/// One addressable service in the OS registry.
///
/// Owns a manager connection for its whole lifetime and at most one native
/// service handle at a time; both are released in [`Drop`]. Not for
/// concurrent use from multiple threads; confine each instance to one
/// logical owner.
#[derive(Debug)]
pub struct Service<B: ScmBackend> {
    backend: B,
    name: String,
    manager: ManagerHandle,
    handle: Option<SvcHandle>,
    poll_interval: Duration,
    start_timeout: Duration,
}

impl<B: ScmBackend> Service<B> {
    /// Binds `name` to a fresh manager connection on `backend`.
    ///
    /// Opens the manager with full access; the service itself is not opened
    /// until the first operation that needs it.
    pub fn with_backend(backend: B, name: impl Into<String>) -> Result<Self, ServiceError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ServiceError::InvalidName);
        }
        let manager = backend
            .open_manager()
            .map_err(|source| ServiceError::ManagerUnavailable { source })?;
        debug!("Opened control manager connection for service '{name}'");
        Ok(Self {
            backend,
            name,
            manager,
            handle: None,
            poll_interval: START_POLL_INTERVAL,
            start_timeout: START_TIMEOUT,
        })
    }

    /// Overrides the start poll interval and ceiling.
    ///
    /// The defaults ([`START_POLL_INTERVAL`], [`START_TIMEOUT`]) suit real
    /// services; tests and latency-sensitive callers can tighten them.
    pub fn with_start_timing(mut self, interval: Duration, ceiling: Duration) -> Self {
        self.poll_interval = interval;
        self.start_timeout = ceiling;
        self
    }

    /// The service name this handle addresses.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True iff the named entry currently exists in the registry.
    ///
    /// Never fails: any refusal to open counts as "not registered".
    pub fn is_registered(&mut self) -> bool {
        self.try_open()
    }

    /// Creates the registry entry with the service name as display name.
    pub fn register(&mut self, binary_path: &str) -> Result<(), ServiceError> {
        let display_name = self.name.clone();
        self.register_with_display_name(binary_path, &display_name)
    }

    /// Creates the registry entry: own-process, demand-start, normal error
    /// severity, no dependencies or account.
    ///
    /// Any currently open handle is released first; on success the created
    /// entry's handle becomes the open handle.
    pub fn register_with_display_name(
        &mut self,
        binary_path: &str,
        display_name: &str,
    ) -> Result<(), ServiceError> {
        self.close_handle();
        let handle = self
            .backend
            .create_service(self.manager, &self.name, display_name, binary_path)
            .map_err(|source| ServiceError::RegistrationFailed {
                service: self.name.clone(),
                source,
            })?;
        debug!("Registered service '{}' at '{binary_path}'", self.name);
        self.handle = Some(handle);
        Ok(())
    }

    /// Flags the registry entry for deletion.
    ///
    /// The OS defers removal until every handle to the service closes, this
    /// object's included.
    pub fn unregister(&mut self) -> Result<(), ServiceError> {
        let handle = self.open()?;
        self.backend
            .delete_service(handle)
            .map_err(|source| ServiceError::DeletionFailed {
                service: self.name.clone(),
                source,
            })?;
        debug!("Unregistered service '{}'", self.name);
        Ok(())
    }

    /// True iff the reported state is Running.
    pub fn is_running(&mut self) -> Result<bool, ServiceError> {
        let handle = self.open()?;
        let state = self
            .backend
            .query_status(handle)
            .map_err(|source| self.query_failed(source))?;
        Ok(state == ServiceState::Running)
    }

    /// Starts the service and waits for it to reach Running.
    ///
    /// The start request itself is asynchronous at the OS level, so this
    /// polls the status every poll interval while the service reports
    /// start-pending, up to the configured ceiling. A service that settles
    /// in any state other than Running, or that is still pending at the
    /// ceiling, is reported as [`ServiceError::StartTimeout`]; the caller
    /// decides whether to retry.
    pub fn start(&mut self) -> Result<(), ServiceError> {
        let handle = self.open()?;
        self.backend
            .start_service(handle)
            .map_err(|source| ServiceError::StartFailed {
                service: self.name.clone(),
                source,
            })?;

        let mut waited = Duration::ZERO;
        while waited < self.start_timeout {
            match self.backend.query_status(handle) {
                Ok(ServiceState::StartPending) => {
                    debug!(
                        "Service '{}' still start-pending after {waited:?}",
                        self.name
                    );
                    thread::sleep(self.poll_interval);
                    waited += self.poll_interval;
                }
                // Settled or query failed; the final query below decides.
                Ok(_) | Err(_) => break,
            }
        }

        match self.backend.query_status(handle) {
            Err(source) => Err(self.query_failed(source)),
            Ok(ServiceState::Running) => Ok(()),
            Ok(last_state) => Err(ServiceError::StartTimeout {
                service: self.name.clone(),
                waited_ms: waited.as_millis() as u64,
                last_state,
            }),
        }
    }

    /// Sends the stop control signal.
    ///
    /// Returns as soon as the OS acknowledges the transition request; unlike
    /// [`Self::start`], this does not wait for the Stopped state.
    pub fn stop(&mut self) -> Result<(), ServiceError> {
        let handle = self.open()?;
        self.backend
            .stop_service(handle)
            .map_err(|source| ServiceError::StopFailed {
                service: self.name.clone(),
                source,
            })
    }

    /// Changes the startup policy, leaving all other configuration fields
    /// untouched.
    pub fn set_startup(&mut self, policy: StartupPolicy) -> Result<(), ServiceError> {
        let handle = self.open()?;
        self.backend
            .set_start_type(handle, policy.to_raw())
            .map_err(|source| ServiceError::ConfigUpdateFailed {
                service: self.name.clone(),
                source,
            })
    }

    /// Reads the current startup policy from a fresh configuration record.
    ///
    /// A raw startup type outside the documented domain raises
    /// [`ServiceError::CorruptStartType`] instead of defaulting.
    pub fn startup(&mut self) -> Result<StartupPolicy, ServiceError> {
        let record = self.query_config()?;
        StartupPolicy::from_raw(record.start_type).ok_or(ServiceError::CorruptStartType {
            service: self.name.clone(),
            raw: record.start_type,
        })
    }

    /// Reads the display name from a fresh configuration record.
    pub fn display_name(&mut self) -> Result<String, ServiceError> {
        Ok(self.query_config()?.display_name)
    }

    /// Reads the executable path from a fresh configuration record.
    pub fn path(&mut self) -> Result<String, ServiceError> {
        Ok(self.query_config()?.binary_path)
    }

    /// Opens the native handle, raising `NotFound` when the service is
    /// absent.
    fn open(&mut self) -> Result<SvcHandle, ServiceError> {
        // try_open leaves the handle set on success.
        if self.try_open()
            && let Some(handle) = self.handle
        {
            return Ok(handle);
        }
        Err(ServiceError::NotFound {
            service: self.name.clone(),
        })
    }

    /// Attempts to open the native handle; never fails.
    ///
    /// Always asks the OS for a fresh handle, so existence is re-checked on
    /// every call. The previous handle is released only after the new one is
    /// in place: closing first would surrender this object's claim on a
    /// delete-pending entry and let the OS complete the deletion mid-reopen.
    fn try_open(&mut self) -> bool {
        match self.backend.open_service(self.manager, &self.name) {
            Ok(handle) => {
                if let Some(previous) = self.handle.replace(handle) {
                    self.backend.close_service(previous);
                }
                true
            }
            Err(err) => {
                debug!("Cannot open service '{}': {err}", self.name);
                self.close_handle();
                false
            }
        }
    }

    fn close_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.close_service(handle);
        }
    }

    /// Fetches the configuration record through the resizable-buffer
    /// protocol.
    ///
    /// Starts from the initial guess size; when the manager reports the
    /// buffer too small, the buffer is freed and the query retried once at
    /// the exact reported size. Every allocated buffer is freed before this
    /// returns, on success and on failure alike.
    fn query_config(&mut self) -> Result<ServiceConfig, ServiceError> {
        let handle = self.open()?;
        let mut size = CONFIG_BUFFER_INITIAL_SIZE;
        for _ in 0..CONFIG_QUERY_MAX_ATTEMPTS {
            let mut buffer = self.backend.alloc_config_buffer(size).map_err(|_| {
                ServiceError::AllocationFailed {
                    service: self.name.clone(),
                    requested: size,
                }
            })?;
            let outcome = self.backend.query_config(handle, &mut buffer);
            self.backend.free_config_buffer(buffer);
            match outcome {
                Ok(record) => return Ok(record),
                Err(ScmError::InsufficientBuffer { needed }) => {
                    debug!(
                        "Config record of '{}' needs {needed} bytes, retrying",
                        self.name
                    );
                    size = needed;
                }
                Err(source) => return Err(self.query_failed(source)),
            }
        }
        // The record grew between the sizing report and the retry.
        Err(self.query_failed(ScmError::InsufficientBuffer { needed: size }))
    }

    fn query_failed(&self, source: ScmError) -> ServiceError {
        ServiceError::QueryFailed {
            service: self.name.clone(),
            source,
        }
    }
}

impl<B: ScmBackend> Drop for Service<B> {
    /// Releases the service handle if open, then the manager connection,
    /// on every exit path.
    fn drop(&mut self) {
        self.close_handle();
        self.backend.close_manager(self.manager);
    }
}

#[cfg(windows)]
impl Service<crate::scm::windows::WindowsScm> {
    /// Binds `name` to the host's service control manager.
    pub fn connect(name: impl Into<String>) -> Result<Self, ServiceError> {
        Self::with_backend(crate::scm::windows::WindowsScm::new(), name)
    }
}
