use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Once;

use tracing::{debug, info, warn};

static EXIT_HOOK: Once = Once::new();

/// Register teardown of the process-wide registry with the C runtime's exit
/// handlers, and on SIGINT/SIGTERM (Ctrl-C on Windows). Safe to call any
/// number of times; registers once.
pub(crate) fn register_exit_teardown() {
    EXIT_HOOK.call_once(|| {
        // SAFETY: `teardown_at_exit` is a plain extern "C" fn with no
        // arguments, which is exactly what atexit expects.
        let rc = unsafe { libc::atexit(teardown_at_exit) };
        if rc == 0 {
            debug!("registered exit-time teardown");
        } else {
            warn!(rc, "atexit registration failed; server will not be torn down at exit");
        }

        if let Err(e) = spawn_signal_teardown() {
            warn!(error = %e, "failed to install signal teardown; a signal will orphan the server");
        }
    });
}

extern "C" fn teardown_at_exit() {
    // Unwinding out of an extern "C" fn aborts the process.
    let _ = catch_unwind(AssertUnwindSafe(stop_global));
}

fn stop_global() {
    if let Some(registry) = super::GLOBAL.get() {
        registry.stop();
    }
}

/// Signal handlers are installed before this returns, on a dedicated thread
/// with its own runtime so it works whether or not the caller has one.
fn spawn_signal_teardown() -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let signals = {
        let _context = runtime.enter();
        Signals::install()?
    };

    std::thread::Builder::new()
        .name("hostrig-teardown".to_string())
        .spawn(move || {
            let received = runtime.block_on(signals.recv());
            info!(signal = received.name, "tearing down server before exit");
            stop_global();
            std::process::exit(received.exit_code);
        })?;
    debug!("registered signal teardown");
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Received {
    name: &'static str,
    /// Shell convention: 128 + signal number.
    exit_code: i32,
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    /// Must run inside a tokio runtime context.
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(mut self) -> Received {
        tokio::select! {
            _ = self.interrupt.recv() => Received { name: "SIGINT", exit_code: 130 },
            _ = self.terminate.recv() => Received { name: "SIGTERM", exit_code: 143 },
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn install() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> Received {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        Received {
            name: "Ctrl-C",
            exit_code: 130,
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    match Signals::install() {
        Ok(signals) => {
            let received = signals.recv().await;
            debug!(signal = received.name, "shutdown requested");
        }
        Err(e) => {
            warn!(error = %e, "failed to listen for shutdown signals");
            std::future::pending::<()>().await;
        }
    }
}
