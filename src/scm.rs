//! The seam between the service handle and the operating system's control
//! manager.
//!
//! [`ScmBackend`] covers exactly the primitive surface the manager exposes:
//! open/close for both handle kinds, create, delete, status and config
//! queries, start, the stop control, and the startup-type config change.
//! Everything above this trait is OS-independent; the Windows backend lives
//! in [`windows`] and a deterministic in-memory backend in [`memory`].

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::ScmError;

/// In-memory control manager backend.
pub mod memory;

/// Native control manager backend.
#[cfg(windows)]
pub mod windows;

/// Opaque handle to an open control manager connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerHandle(pub(crate) isize);

/// Opaque handle to one open service.
///
/// A value of this type says nothing about whether the service still exists;
/// existence is only ever determined by attempting to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvcHandle(pub(crate) isize);

/// Current state of a service as reported by a status query.
///
/// Raw values follow the manager's documented domain (1 through 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ServiceState {
    /// Not running.
    Stopped,
    /// A start request was accepted and is in progress.
    StartPending,
    /// A stop request was accepted and is in progress.
    StopPending,
    /// Running.
    Running,
    /// Resuming from a pause.
    ContinuePending,
    /// A pause request is in progress.
    PausePending,
    /// Paused.
    Paused,
}

impl ServiceState {
    /// Maps a raw state value from a status record.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Stopped),
            2 => Some(Self::StartPending),
            3 => Some(Self::StopPending),
            4 => Some(Self::Running),
            5 => Some(Self::ContinuePending),
            6 => Some(Self::PausePending),
            7 => Some(Self::Paused),
            _ => None,
        }
    }
}

/// Decoded service configuration record.
///
/// Only the fields this client manipulates are decoded; the rest of the
/// record (dependencies, account, load-order group) stays with the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Human-readable display name.
    pub display_name: String,
    /// Path to the service executable.
    pub binary_path: String,
    /// Raw startup type as stored in the registry.
    pub start_type: u32,
}

/// Backend-allocated buffer for one configuration query.
///
/// The backing store is u64 words so the record cast in the Windows backend
/// stays aligned; capacity is always reported in bytes.
#[derive(Debug)]
pub struct ConfigBuffer {
    words: Vec<u64>,
    len: usize,
}

impl ConfigBuffer {
    /// Allocates a zeroed buffer of at least `bytes` bytes.
    pub(crate) fn with_capacity(bytes: usize) -> Self {
        Self {
            words: vec![0u64; bytes.div_ceil(8)],
            len: 0,
        }
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.words.len() * 8
    }

    /// Number of bytes the backend has written.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bytes have been written yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The filled portion of the buffer.
    pub fn filled(&self) -> &[u8] {
        // Safe: words own at least `capacity` bytes and `len` never exceeds it.
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.len) }
    }

    /// Copies `bytes` into the buffer, recording the filled length.
    ///
    /// Fails when the buffer is too small, without writing anything.
    pub(crate) fn fill(&mut self, bytes: &[u8]) -> Result<(), ScmError> {
        if bytes.len() > self.capacity() {
            return Err(ScmError::InsufficientBuffer { needed: bytes.len() });
        }
        let dst = unsafe {
            std::slice::from_raw_parts_mut(
                self.words.as_mut_ptr().cast::<u8>(),
                self.capacity(),
            )
        };
        dst[..bytes.len()].copy_from_slice(bytes);
        self.len = bytes.len();
        Ok(())
    }

    /// Raw pointer for backends that fill the buffer through the OS.
    #[cfg(windows)]
    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.words.as_mut_ptr().cast()
    }

    /// Records how many bytes the OS wrote through [`Self::as_mut_ptr`].
    #[cfg(windows)]
    pub(crate) fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.capacity());
        self.len = len.min(self.capacity());
    }
}

/// Primitive operations of the control manager.
///
/// One method per OS call the client depends on; implementations translate
/// status codes into [`ScmError`] and nothing else. All methods take `&self`
/// since the OS owns the actual state behind the handles.
pub trait ScmBackend {
    /// Opens a connection to the control manager with full access.
    fn open_manager(&self) -> Result<ManagerHandle, ScmError>;

    /// Releases a manager connection. Never fails.
    fn close_manager(&self, manager: ManagerHandle);

    /// Opens an existing service by name with full access.
    fn open_service(&self, manager: ManagerHandle, name: &str) -> Result<SvcHandle, ScmError>;

    /// Releases a service handle. Never fails; deferred deletion completes
    /// once the last handle to a marked service closes.
    fn close_service(&self, service: SvcHandle);

    /// Creates a new own-process, demand-start service entry and returns an
    /// open handle to it.
    fn create_service(
        &self,
        manager: ManagerHandle,
        name: &str,
        display_name: &str,
        binary_path: &str,
    ) -> Result<SvcHandle, ScmError>;

    /// Flags the service for deletion.
    fn delete_service(&self, service: SvcHandle) -> Result<(), ScmError>;

    /// Queries the current service state.
    fn query_status(&self, service: SvcHandle) -> Result<ServiceState, ScmError>;

    /// Issues a start request. Returns once the request is accepted; the
    /// service itself starts asynchronously.
    fn start_service(&self, service: SvcHandle) -> Result<(), ScmError>;

    /// Sends the stop control signal. Returns once the transition request is
    /// acknowledged, without waiting for Stopped.
    fn stop_service(&self, service: SvcHandle) -> Result<(), ScmError>;

    /// Changes only the startup type, leaving every other configuration
    /// field untouched.
    fn set_start_type(&self, service: SvcHandle, start_type: u32) -> Result<(), ScmError>;

    /// Allocates a configuration buffer of at least `bytes` bytes.
    fn alloc_config_buffer(&self, bytes: usize) -> Result<ConfigBuffer, ScmError>;

    /// Releases a configuration buffer.
    fn free_config_buffer(&self, buffer: ConfigBuffer);

    /// Fills `buffer` with the service's configuration record and decodes it.
    ///
    /// Fails with [`ScmError::InsufficientBuffer`] (carrying the exact
    /// required size) when the buffer is too small.
    fn query_config(
        &self,
        service: SvcHandle,
        buffer: &mut ConfigBuffer,
    ) -> Result<ServiceConfig, ScmError>;
}
