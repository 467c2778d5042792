use std::io;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

fn to_pid(pid: u32) -> Option<Pid> {
    // Values that don't fit a positive pid_t would address process groups.
    i32::try_from(pid).ok().filter(|p| *p > 0).map(Pid::from_raw)
}

pub fn is_process_alive(pid: u32) -> bool {
    let Some(pid) = to_pid(pid) else {
        return false;
    };
    // EPERM means the process exists but belongs to someone else.
    matches!(kill(pid, None), Ok(()) | Err(Errno::EPERM)) && !is_zombie(pid)
}

/// An exited process nobody has reaped yet still answers signal 0.
#[cfg(target_os = "linux")]
fn is_zombie(pid: Pid) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return false;
    };
    // The state follows the parenthesised command name, which may itself
    // contain spaces or parentheses.
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .is_some_and(|state| state == "Z")
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: Pid) -> bool {
    false
}

/// Send SIGTERM. Returns `false` if the process was already gone.
pub fn request_termination(pid: u32) -> io::Result<bool> {
    let Some(pid) = to_pid(pid) else {
        return Ok(false);
    };
    match kill(pid, Signal::SIGTERM) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(e) => Err(io::Error::from(e)),
    }
}

pub fn force_kill(pid: u32) -> io::Result<()> {
    let Some(pid) = to_pid(pid) else {
        return Ok(());
    };
    match kill(pid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}
