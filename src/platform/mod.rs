use std::io;
use std::time::{Duration, Instant};

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use unix as imp;
#[cfg(windows)]
use windows as imp;

/// How long `terminate` waits after the polite signal before killing.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(5);

const EXIT_POLL: Duration = Duration::from_millis(50);

/// Result of asking a process to go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process was already gone before any signal was sent.
    AlreadyExited,
    /// Exited within the grace period after SIGTERM (or its equivalent).
    Exited,
    /// Still alive after the grace period and was force-killed.
    Killed,
}

/// A process the harness knows only by PID. It is not our child, so there is
/// nothing to `wait()` on; liveness and termination go through the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: u32,
}

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Zero-signal liveness probe.
    pub fn is_alive(&self) -> bool {
        self.pid != 0 && imp::is_process_alive(self.pid)
    }

    /// Politely terminate the process, escalating to a forced kill once
    /// `grace` has elapsed. Blocks the calling thread while waiting.
    pub fn terminate(&self, grace: Duration) -> io::Result<Termination> {
        if self.pid == 0 || !imp::request_termination(self.pid)? {
            return Ok(Termination::AlreadyExited);
        }
        tracing::debug!(pid = self.pid, "termination requested");

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if !self.is_alive() {
                return Ok(Termination::Exited);
            }
            std::thread::sleep(EXIT_POLL);
        }

        tracing::warn!(pid = self.pid, ?grace, "process ignored termination, killing");
        imp::force_kill(self.pid)?;
        Ok(Termination::Killed)
    }
}
