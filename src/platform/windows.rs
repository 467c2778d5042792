use std::io;

use windows_sys::Win32::Foundation::CloseHandle;
use windows_sys::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, TerminateProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    PROCESS_TERMINATE,
};

const STILL_ACTIVE: u32 = 259;

pub fn is_process_alive(pid: u32) -> bool {
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle.is_null() {
            return false;
        }
        let mut exit_code: u32 = 0;
        let result = GetExitCodeProcess(handle, &mut exit_code);
        CloseHandle(handle);
        result != 0 && exit_code == STILL_ACTIVE
    }
}

/// Windows has no SIGTERM for a process we don't share a console with, so the
/// request is the termination itself. Returns `false` if it was already gone.
pub fn request_termination(pid: u32) -> io::Result<bool> {
    if !is_process_alive(pid) {
        return Ok(false);
    }
    unsafe {
        let handle = OpenProcess(PROCESS_TERMINATE, 0, pid);
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        let result = TerminateProcess(handle, 1);
        let err = io::Error::last_os_error();
        CloseHandle(handle);
        if result == 0 {
            return Err(err);
        }
    }
    Ok(true)
}

pub fn force_kill(pid: u32) -> io::Result<()> {
    request_termination(pid).map(|_| ())
}
