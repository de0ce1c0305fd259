//! Error handling for svcreg.
use thiserror::Error;

/// Defines all failures the service handle surfaces to callers.
///
/// Every variant carries the service name so failures remain attributable
/// when several handles are in flight; manager diagnostics ride along as
/// sources where the OS provides one.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The control manager connection could not be opened at construction.
    /// The handle object is unusable.
    #[error("cannot open the service control manager: {source}")]
    ManagerUnavailable {
        /// The underlying manager error.
        #[source]
        source: ScmError,
    },

    /// A service handle was constructed with an empty name.
    #[error("service name must not be empty")]
    InvalidName,

    /// The named service does not exist in the registry.
    #[error("service '{service}' does not exist")]
    NotFound {
        /// The service name that could not be opened.
        service: String,
    },

    /// The manager rejected creation of a new service entry.
    #[error("cannot register service '{service}': {source}")]
    RegistrationFailed {
        /// The service name that failed to register.
        service: String,
        /// The underlying manager error.
        #[source]
        source: ScmError,
    },

    /// The manager refused to delete the service entry.
    #[error("cannot unregister service '{service}': {source}")]
    DeletionFailed {
        /// The service name that failed to unregister.
        service: String,
        /// The underlying manager error.
        #[source]
        source: ScmError,
    },

    /// The manager rejected the start request outright.
    #[error("cannot start service '{service}': {source}")]
    StartFailed {
        /// The service name that failed to start.
        service: String,
        /// The underlying manager error.
        #[source]
        source: ScmError,
    },

    /// The service accepted the start request but never reached Running
    /// within the poll ceiling.
    #[error(
        "service '{service}' failed to start within {waited_ms}ms (last state: {last_state})"
    )]
    StartTimeout {
        /// The service name that timed out.
        service: String,
        /// Total time spent polling, in milliseconds.
        waited_ms: u64,
        /// The last state reported before giving up.
        last_state: crate::scm::ServiceState,
    },

    /// The stop control signal was rejected.
    #[error("cannot stop service '{service}': {source}")]
    StopFailed {
        /// The service name that failed to stop.
        service: String,
        /// The underlying manager error.
        #[source]
        source: ScmError,
    },

    /// The startup-type configuration update was rejected.
    #[error("cannot change startup mode of service '{service}': {source}")]
    ConfigUpdateFailed {
        /// The service name whose configuration update failed.
        service: String,
        /// The underlying manager error.
        #[source]
        source: ScmError,
    },

    /// A status or configuration query failed for a reason other than
    /// buffer sizing.
    #[error("cannot query service '{service}': {source}")]
    QueryFailed {
        /// The service name whose query failed.
        service: String,
        /// The underlying manager error.
        #[source]
        source: ScmError,
    },

    /// The configuration buffer could not be allocated.
    #[error("cannot allocate a {requested}-byte config buffer for service '{service}'")]
    AllocationFailed {
        /// The service name whose query needed the buffer.
        service: String,
        /// The allocation size that was refused.
        requested: usize,
    },

    /// The manager reported a startup type outside its documented domain.
    ///
    /// This is an internal-consistency failure: defaulting would mask
    /// registry corruption, so it is raised instead.
    #[error("service '{service}' reports startup type {raw}, outside the documented domain")]
    CorruptStartType {
        /// The service name with the corrupt record.
        service: String,
        /// The raw startup-type value read back.
        raw: u32,
    },
}

impl ServiceError {
    /// The name of the service this error refers to, when it carries one.
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::ManagerUnavailable { .. } | Self::InvalidName => None,
            Self::NotFound { service }
            | Self::RegistrationFailed { service, .. }
            | Self::DeletionFailed { service, .. }
            | Self::StartFailed { service, .. }
            | Self::StartTimeout { service, .. }
            | Self::StopFailed { service, .. }
            | Self::ConfigUpdateFailed { service, .. }
            | Self::QueryFailed { service, .. }
            | Self::AllocationFailed { service, .. }
            | Self::CorruptStartType { service, .. } => Some(service),
        }
    }
}

/// Error type for raw control manager operations.
///
/// Backends translate OS status codes into these variants; the service
/// handle layer wraps them with the service name.
#[derive(Debug, Error)]
pub enum ScmError {
    /// The supplied buffer is too small for the configuration record.
    /// Carries the exact size the manager requires.
    #[error("buffer too small, {needed} bytes required")]
    InsufficientBuffer {
        /// Required buffer size in bytes.
        needed: usize,
    },

    /// The named service is not present in the registry.
    #[error("the service does not exist")]
    NotFound,

    /// A service with this name already exists.
    #[error("a service with this name already exists")]
    AlreadyExists,

    /// The entry is flagged for deletion and will vanish once the last
    /// handle closes; no new entry can be created under the name until then.
    #[error("the service is marked for deletion")]
    MarkedForDeletion,

    /// The manager denied access to the handle or operation.
    #[error("access denied by the service control manager")]
    AccessDenied,

    /// The handle does not refer to an open manager or service.
    #[error("invalid service handle")]
    InvalidHandle,

    /// The backend could not allocate a configuration buffer.
    #[error("config buffer allocation failed")]
    AllocationFailed,

    /// Any other OS-level failure, carrying the raw status code.
    #[error("control manager error {code}: {message}")]
    Os {
        /// Raw OS status code.
        code: u32,
        /// OS-provided diagnostic text.
        message: String,
    },
}
