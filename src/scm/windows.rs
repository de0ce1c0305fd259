//! Native control manager backend.
//!
//! Thin translation layer between [`ScmBackend`] and the Win32 service
//! control manager. Each method maps onto exactly one OS call; status codes
//! are translated into [`ScmError`] and nothing is interpreted beyond that.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;

use windows::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_DUPLICATE_SERVICE_NAME, ERROR_INSUFFICIENT_BUFFER,
    ERROR_INVALID_HANDLE, ERROR_SERVICE_DOES_NOT_EXIST, ERROR_SERVICE_EXISTS,
    ERROR_SERVICE_MARKED_FOR_DELETE,
};
use windows::Win32::System::Services::{
    ChangeServiceConfigW, CloseServiceHandle, ControlService, CreateServiceW,
    DeleteService, ENUM_SERVICE_TYPE, OpenSCManagerW, OpenServiceW,
    QUERY_SERVICE_CONFIGW, QueryServiceConfigW, QueryServiceStatus, SC_HANDLE,
    SC_MANAGER_ALL_ACCESS, SERVICE_ALL_ACCESS, SERVICE_CONTROL_STOP, SERVICE_ERROR,
    SERVICE_ERROR_NORMAL, SERVICE_NO_CHANGE, SERVICE_START_TYPE, SERVICE_STATUS,
    SERVICE_WIN32_OWN_PROCESS, StartServiceW,
};
use windows::core::{Error as WinError, PCWSTR, PWSTR};

use crate::error::ScmError;
use crate::scm::{
    ConfigBuffer, ManagerHandle, ScmBackend, ServiceConfig, ServiceState, SvcHandle,
};

/// Backend bound to the host's service control manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsScm;

impl WindowsScm {
    /// Creates the backend. Nothing is opened until a handle is requested.
    pub fn new() -> Self {
        Self
    }
}

/// UTF-16, nul-terminated copy of `s` for the W-suffixed API surface.
fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

/// Decodes a nul-terminated wide string owned by an OS record.
fn from_wide(ptr: PWSTR) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { ptr.to_string().unwrap_or_default() }
}

fn manager_raw(manager: ManagerHandle) -> SC_HANDLE {
    SC_HANDLE(manager.0 as _)
}

fn service_raw(service: SvcHandle) -> SC_HANDLE {
    SC_HANDLE(service.0 as _)
}

/// Translates an OS error into the backend error domain.
fn scm_error(err: WinError) -> ScmError {
    let code = err.code();
    if code == ERROR_SERVICE_DOES_NOT_EXIST.to_hresult() {
        ScmError::NotFound
    } else if code == ERROR_SERVICE_EXISTS.to_hresult()
        || code == ERROR_DUPLICATE_SERVICE_NAME.to_hresult()
    {
        ScmError::AlreadyExists
    } else if code == ERROR_SERVICE_MARKED_FOR_DELETE.to_hresult() {
        ScmError::MarkedForDeletion
    } else if code == ERROR_ACCESS_DENIED.to_hresult() {
        ScmError::AccessDenied
    } else if code == ERROR_INVALID_HANDLE.to_hresult() {
        ScmError::InvalidHandle
    } else {
        ScmError::Os {
            code: code.0 as u32,
            message: err.to_string(),
        }
    }
}

/// Error for the handle-returning calls, which report through last-error.
fn last_error() -> ScmError {
    scm_error(WinError::from_win32())
}

impl ScmBackend for WindowsScm {
    fn open_manager(&self) -> Result<ManagerHandle, ScmError> {
        let handle =
            unsafe { OpenSCManagerW(PCWSTR::null(), PCWSTR::null(), SC_MANAGER_ALL_ACCESS) };
        if handle.is_invalid() {
            return Err(last_error());
        }
        Ok(ManagerHandle(handle.0 as isize))
    }

    fn close_manager(&self, manager: ManagerHandle) {
        unsafe {
            let _ = CloseServiceHandle(manager_raw(manager));
        }
    }

    fn open_service(&self, manager: ManagerHandle, name: &str) -> Result<SvcHandle, ScmError> {
        let wide_name = to_wide(name);
        let handle = unsafe {
            OpenServiceW(
                manager_raw(manager),
                PCWSTR::from_raw(wide_name.as_ptr()),
                SERVICE_ALL_ACCESS,
            )
        };
        if handle.is_invalid() {
            return Err(last_error());
        }
        Ok(SvcHandle(handle.0 as isize))
    }

    fn close_service(&self, service: SvcHandle) {
        unsafe {
            let _ = CloseServiceHandle(service_raw(service));
        }
    }

    fn create_service(
        &self,
        manager: ManagerHandle,
        name: &str,
        display_name: &str,
        binary_path: &str,
    ) -> Result<SvcHandle, ScmError> {
        let wide_name = to_wide(name);
        let wide_display = to_wide(display_name);
        let wide_path = to_wide(binary_path);
        // Own-process, demand-start, normal error severity; no load-order
        // group, dependencies, account, or password.
        let handle = unsafe {
            CreateServiceW(
                manager_raw(manager),
                PCWSTR::from_raw(wide_name.as_ptr()),
                PCWSTR::from_raw(wide_display.as_ptr()),
                SERVICE_ALL_ACCESS,
                SERVICE_WIN32_OWN_PROCESS,
                SERVICE_START_TYPE(crate::policy::DEMAND_START),
                SERVICE_ERROR_NORMAL,
                PCWSTR::from_raw(wide_path.as_ptr()),
                PCWSTR::null(),
                None,
                PCWSTR::null(),
                PCWSTR::null(),
                PCWSTR::null(),
            )
        };
        if handle.is_invalid() {
            return Err(last_error());
        }
        Ok(SvcHandle(handle.0 as isize))
    }

    fn delete_service(&self, service: SvcHandle) -> Result<(), ScmError> {
        unsafe { DeleteService(service_raw(service)) }.map_err(scm_error)
    }

    fn query_status(&self, service: SvcHandle) -> Result<ServiceState, ScmError> {
        let mut status = SERVICE_STATUS::default();
        unsafe { QueryServiceStatus(service_raw(service), &mut status) }
            .map_err(scm_error)?;
        ServiceState::from_raw(status.dwCurrentState.0).ok_or(ScmError::Os {
            code: status.dwCurrentState.0,
            message: "service state outside the documented domain".into(),
        })
    }

    fn start_service(&self, service: SvcHandle) -> Result<(), ScmError> {
        unsafe { StartServiceW(service_raw(service), &[]) }.map_err(scm_error)
    }

    fn stop_service(&self, service: SvcHandle) -> Result<(), ScmError> {
        let mut status = SERVICE_STATUS::default();
        unsafe { ControlService(service_raw(service), SERVICE_CONTROL_STOP, &mut status) }
            .map_err(scm_error)
    }

    fn set_start_type(&self, service: SvcHandle, start_type: u32) -> Result<(), ScmError> {
        // Everything except the start type is passed as "no change".
        unsafe {
            ChangeServiceConfigW(
                service_raw(service),
                ENUM_SERVICE_TYPE(SERVICE_NO_CHANGE),
                SERVICE_START_TYPE(start_type),
                SERVICE_ERROR(SERVICE_NO_CHANGE),
                PCWSTR::null(),
                PCWSTR::null(),
                None,
                PCWSTR::null(),
                PCWSTR::null(),
                PCWSTR::null(),
                PCWSTR::null(),
            )
        }
        .map_err(scm_error)
    }

    fn alloc_config_buffer(&self, bytes: usize) -> Result<ConfigBuffer, ScmError> {
        Ok(ConfigBuffer::with_capacity(bytes))
    }

    fn free_config_buffer(&self, buffer: ConfigBuffer) {
        drop(buffer);
    }

    fn query_config(
        &self,
        service: SvcHandle,
        buffer: &mut ConfigBuffer,
    ) -> Result<ServiceConfig, ScmError> {
        let capacity = buffer.capacity() as u32;
        let mut bytes_needed = 0u32;
        let queried = unsafe {
            QueryServiceConfigW(
                service_raw(service),
                Some(buffer.as_mut_ptr().cast::<QUERY_SERVICE_CONFIGW>()),
                capacity,
                &mut bytes_needed,
            )
        };
        if let Err(err) = queried {
            if err.code() == ERROR_INSUFFICIENT_BUFFER.to_hresult() {
                return Err(ScmError::InsufficientBuffer {
                    needed: bytes_needed as usize,
                });
            }
            return Err(scm_error(err));
        }
        buffer.set_len(bytes_needed as usize);

        // The record was written into our buffer; its string fields point
        // back into the same allocation, which outlives this borrow.
        let record = unsafe { &*buffer.as_mut_ptr().cast::<QUERY_SERVICE_CONFIGW>() };
        Ok(ServiceConfig {
            display_name: from_wide(record.lpDisplayName),
            binary_path: from_wide(record.lpBinaryPathName),
            start_type: record.dwStartType.0,
        })
    }
}
