//! In-memory control manager backend.
//!
//! A deterministic double of the OS manager for tests and development on
//! hosts without a service control manager. It models the parts of the
//! contract the client depends on: handle tables, deferred deletion once the
//! last handle closes, the insufficient-buffer sizing protocol, and the
//! asynchronous start transition. Start behavior and failure injection are
//! scriptable, and buffer allocations and query traffic are counted so tests
//! can assert the protocol leaves nothing behind.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::error::ScmError;
use crate::policy::DEMAND_START;
use crate::scm::{
    ConfigBuffer, ManagerHandle, ScmBackend, ServiceConfig, ServiceState, SvcHandle,
};

/// How a scripted service behaves after a start request is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartBehavior {
    /// Reaches Running before the first status poll.
    #[default]
    Immediate,
    /// Reports start-pending for this many polls, then Running.
    AfterPolls(u32),
    /// Never leaves start-pending.
    NeverCompletes,
}

/// Traffic counters for protocol assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Config buffers handed out.
    pub buffers_allocated: usize,
    /// Config buffers returned.
    pub buffers_freed: usize,
    /// Status queries served (including injected failures).
    pub status_queries: usize,
    /// Config queries served (including undersized attempts).
    pub config_queries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartScript {
    Done,
    Polls(u32),
    Never,
}

#[derive(Debug)]
struct ServiceEntry {
    display_name: String,
    binary_path: String,
    start_type: u32,
    state: ServiceState,
    script: StartScript,
    delete_pending: bool,
}

#[derive(Debug)]
enum HandleKind {
    Manager,
    Service(String),
}

#[derive(Debug, Default)]
struct Inner {
    services: HashMap<String, ServiceEntry>,
    handles: HashMap<isize, HandleKind>,
    next_handle: isize,
    start_behavior: StartBehavior,
    deny_manager: bool,
    reject_start: bool,
    reject_stop: bool,
    reject_config_update: bool,
    fail_allocation: bool,
    fail_status_queries: bool,
    fail_config_queries: bool,
    counters: Counters,
}

/// Shared-state in-memory backend.
///
/// Cloning shares the underlying registry, so a test can keep one clone for
/// scripting and inspection after moving another into a service handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryScm {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryScm {
    /// Creates an empty in-memory manager.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("Failed to lock in-memory manager state")
    }

    /// Seeds a registered, stopped, demand-start service.
    pub fn seed_service(&self, name: &str, display_name: &str, binary_path: &str) {
        self.lock().services.insert(
            name.to_string(),
            ServiceEntry {
                display_name: display_name.to_string(),
                binary_path: binary_path.to_string(),
                start_type: DEMAND_START,
                state: ServiceState::Stopped,
                script: StartScript::Done,
                delete_pending: false,
            },
        );
    }

    /// Scripts how subsequently started services approach Running.
    pub fn set_start_behavior(&self, behavior: StartBehavior) {
        self.lock().start_behavior = behavior;
    }

    /// Forces the reported state of a registered service.
    pub fn set_state(&self, name: &str, state: ServiceState) {
        if let Some(entry) = self.lock().services.get_mut(name) {
            entry.state = state;
            entry.script = StartScript::Done;
        }
    }

    /// Makes manager connections fail with access denied.
    pub fn deny_manager(&self, deny: bool) {
        self.lock().deny_manager = deny;
    }

    /// Makes start requests fail outright.
    pub fn reject_start(&self, reject: bool) {
        self.lock().reject_start = reject;
    }

    /// Makes stop controls fail.
    pub fn reject_stop(&self, reject: bool) {
        self.lock().reject_stop = reject;
    }

    /// Makes startup-type updates fail.
    pub fn reject_config_update(&self, reject: bool) {
        self.lock().reject_config_update = reject;
    }

    /// Makes buffer allocation fail.
    pub fn fail_allocation(&self, fail: bool) {
        self.lock().fail_allocation = fail;
    }

    /// Makes status queries fail.
    pub fn fail_status_queries(&self, fail: bool) {
        self.lock().fail_status_queries = fail;
    }

    /// Makes config queries fail for a non-sizing reason.
    pub fn fail_config_queries(&self, fail: bool) {
        self.lock().fail_config_queries = fail;
    }

    /// True when the name currently has a registry entry.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().services.contains_key(name)
    }

    /// Reported state of a registered service.
    pub fn state_of(&self, name: &str) -> Option<ServiceState> {
        self.lock().services.get(name).map(|entry| entry.state)
    }

    /// Raw start type of a registered service.
    pub fn start_type_of(&self, name: &str) -> Option<u32> {
        self.lock().services.get(name).map(|entry| entry.start_type)
    }

    /// Writes a raw start type directly, bypassing validation.
    ///
    /// Lets tests plant out-of-domain values the way a corrupted registry
    /// would.
    pub fn corrupt_start_type(&self, name: &str, raw: u32) {
        if let Some(entry) = self.lock().services.get_mut(name) {
            entry.start_type = raw;
        }
    }

    /// Snapshot of the traffic counters.
    pub fn counters(&self) -> Counters {
        self.lock().counters
    }

    /// Config buffers allocated but not yet freed.
    pub fn buffers_outstanding(&self) -> usize {
        let counters = self.counters();
        counters.buffers_allocated - counters.buffers_freed
    }

    /// Number of currently open handles, manager connections included.
    pub fn open_handles(&self) -> usize {
        self.lock().handles.len()
    }

    fn issue_handle(inner: &mut Inner, kind: HandleKind) -> isize {
        inner.next_handle += 1;
        let id = inner.next_handle;
        inner.handles.insert(id, kind);
        id
    }

    fn service_name(inner: &Inner, handle: SvcHandle) -> Result<String, ScmError> {
        match inner.handles.get(&handle.0) {
            Some(HandleKind::Service(name)) => Ok(name.clone()),
            _ => Err(ScmError::InvalidHandle),
        }
    }

    fn entry_mut<'a>(
        inner: &'a mut Inner,
        name: &str,
    ) -> Result<&'a mut ServiceEntry, ScmError> {
        inner.services.get_mut(name).ok_or(ScmError::NotFound)
    }
}

impl ScmBackend for MemoryScm {
    fn open_manager(&self) -> Result<ManagerHandle, ScmError> {
        let mut inner = self.lock();
        if inner.deny_manager {
            return Err(ScmError::AccessDenied);
        }
        let id = Self::issue_handle(&mut inner, HandleKind::Manager);
        Ok(ManagerHandle(id))
    }

    fn close_manager(&self, manager: ManagerHandle) {
        self.lock().handles.remove(&manager.0);
    }

    fn open_service(&self, manager: ManagerHandle, name: &str) -> Result<SvcHandle, ScmError> {
        let mut inner = self.lock();
        if !matches!(inner.handles.get(&manager.0), Some(HandleKind::Manager)) {
            return Err(ScmError::InvalidHandle);
        }
        if !inner.services.contains_key(name) {
            return Err(ScmError::NotFound);
        }
        let id = Self::issue_handle(&mut inner, HandleKind::Service(name.to_string()));
        Ok(SvcHandle(id))
    }

    fn close_service(&self, service: SvcHandle) {
        let mut inner = self.lock();
        let Some(HandleKind::Service(name)) = inner.handles.remove(&service.0) else {
            return;
        };
        // Deferred deletion: the entry vanishes with its last handle.
        let still_open = inner.handles.values().any(
            |kind| matches!(kind, HandleKind::Service(open) if *open == name),
        );
        if !still_open
            && inner
                .services
                .get(&name)
                .is_some_and(|entry| entry.delete_pending)
        {
            inner.services.remove(&name);
        }
    }

    fn create_service(
        &self,
        manager: ManagerHandle,
        name: &str,
        display_name: &str,
        binary_path: &str,
    ) -> Result<SvcHandle, ScmError> {
        let mut inner = self.lock();
        if !matches!(inner.handles.get(&manager.0), Some(HandleKind::Manager)) {
            return Err(ScmError::InvalidHandle);
        }
        if let Some(existing) = inner.services.get(name) {
            return Err(if existing.delete_pending {
                ScmError::MarkedForDeletion
            } else {
                ScmError::AlreadyExists
            });
        }
        inner.services.insert(
            name.to_string(),
            ServiceEntry {
                display_name: display_name.to_string(),
                binary_path: binary_path.to_string(),
                start_type: DEMAND_START,
                state: ServiceState::Stopped,
                script: StartScript::Done,
                delete_pending: false,
            },
        );
        let id = Self::issue_handle(&mut inner, HandleKind::Service(name.to_string()));
        Ok(SvcHandle(id))
    }

    fn delete_service(&self, service: SvcHandle) -> Result<(), ScmError> {
        let mut inner = self.lock();
        let name = Self::service_name(&inner, service)?;
        let entry = Self::entry_mut(&mut inner, &name)?;
        if entry.delete_pending {
            return Err(ScmError::MarkedForDeletion);
        }
        entry.delete_pending = true;
        Ok(())
    }

    fn query_status(&self, service: SvcHandle) -> Result<ServiceState, ScmError> {
        let mut inner = self.lock();
        inner.counters.status_queries += 1;
        if inner.fail_status_queries {
            return Err(ScmError::Os {
                code: 31,
                message: "injected status query failure".into(),
            });
        }
        let name = Self::service_name(&inner, service)?;
        let entry = Self::entry_mut(&mut inner, &name)?;
        match entry.script {
            StartScript::Polls(0) => {
                entry.script = StartScript::Done;
                entry.state = ServiceState::Running;
            }
            StartScript::Polls(remaining) => {
                entry.script = StartScript::Polls(remaining - 1);
            }
            StartScript::Done | StartScript::Never => {}
        }
        Ok(entry.state)
    }

    fn start_service(&self, service: SvcHandle) -> Result<(), ScmError> {
        let mut inner = self.lock();
        if inner.reject_start {
            return Err(ScmError::AccessDenied);
        }
        let behavior = inner.start_behavior;
        let name = Self::service_name(&inner, service)?;
        let entry = Self::entry_mut(&mut inner, &name)?;
        if entry.state == ServiceState::Running {
            return Err(ScmError::Os {
                code: 1056,
                message: "an instance of the service is already running".into(),
            });
        }
        match behavior {
            StartBehavior::Immediate => {
                entry.state = ServiceState::Running;
                entry.script = StartScript::Done;
            }
            StartBehavior::AfterPolls(polls) => {
                entry.state = ServiceState::StartPending;
                entry.script = StartScript::Polls(polls);
            }
            StartBehavior::NeverCompletes => {
                entry.state = ServiceState::StartPending;
                entry.script = StartScript::Never;
            }
        }
        Ok(())
    }

    fn stop_service(&self, service: SvcHandle) -> Result<(), ScmError> {
        let mut inner = self.lock();
        if inner.reject_stop {
            return Err(ScmError::AccessDenied);
        }
        let name = Self::service_name(&inner, service)?;
        let entry = Self::entry_mut(&mut inner, &name)?;
        if entry.state == ServiceState::Stopped {
            return Err(ScmError::Os {
                code: 1062,
                message: "the service has not been started".into(),
            });
        }
        entry.state = ServiceState::Stopped;
        entry.script = StartScript::Done;
        Ok(())
    }

    fn set_start_type(&self, service: SvcHandle, start_type: u32) -> Result<(), ScmError> {
        let mut inner = self.lock();
        if inner.reject_config_update {
            return Err(ScmError::AccessDenied);
        }
        let name = Self::service_name(&inner, service)?;
        let entry = Self::entry_mut(&mut inner, &name)?;
        if start_type > crate::policy::DISABLED {
            return Err(ScmError::Os {
                code: 87,
                message: "invalid start type".into(),
            });
        }
        entry.start_type = start_type;
        Ok(())
    }

    fn alloc_config_buffer(&self, bytes: usize) -> Result<ConfigBuffer, ScmError> {
        let mut inner = self.lock();
        if inner.fail_allocation {
            return Err(ScmError::AllocationFailed);
        }
        inner.counters.buffers_allocated += 1;
        Ok(ConfigBuffer::with_capacity(bytes))
    }

    fn free_config_buffer(&self, buffer: ConfigBuffer) {
        self.lock().counters.buffers_freed += 1;
        drop(buffer);
    }

    fn query_config(
        &self,
        service: SvcHandle,
        buffer: &mut ConfigBuffer,
    ) -> Result<ServiceConfig, ScmError> {
        let mut inner = self.lock();
        inner.counters.config_queries += 1;
        if inner.fail_config_queries {
            return Err(ScmError::Os {
                code: 31,
                message: "injected config query failure".into(),
            });
        }
        let name = Self::service_name(&inner, service)?;
        let entry = inner.services.get(&name).ok_or(ScmError::NotFound)?;
        let record = ServiceConfig {
            display_name: entry.display_name.clone(),
            binary_path: entry.binary_path.clone(),
            start_type: entry.start_type,
        };
        let encoded = serde_json::to_vec(&record).map_err(|err| ScmError::Os {
            code: 13,
            message: format!("cannot encode config record: {err}"),
        })?;
        buffer.fill(&encoded)?;
        // Decode from the buffer rather than returning `record` so the
        // caller-supplied storage is actually on the read path.
        serde_json::from_slice(buffer.filled()).map_err(|err| ScmError::Os {
            code: 13,
            message: format!("cannot decode config record: {err}"),
        })
    }
}
