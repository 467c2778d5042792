//! The process-wide owner of the one ephemeral server a test run talks to.
//!
//! A [`LifecycleRegistry`] brings a host up lazily (port, runtime directory,
//! launch, readiness), hands out its URI, and tears everything down again on
//! `stop()`, on drop, or at process exit for the [`global`] registry.

pub mod address;
mod hooks;
pub mod instance;

use std::fs;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, info, warn};

use crate::config::{HarnessConfig, Materializer};
use crate::error::{HarnessError, Result};
use crate::launcher::Launcher;
use crate::platform::{ProcessHandle, Termination, TERMINATE_GRACE};
use crate::ports;
use crate::ready;

pub use address::{OverrideAddress, ServerAddress};
pub use hooks::shutdown_signal;
pub use instance::{Readiness, ServerInstance};

static GLOBAL: OnceLock<LifecycleRegistry> = OnceLock::new();

/// The process-wide registry, configured from the environment on first use.
///
/// First use also registers `stop()` to run when the process exits.
pub fn global() -> Result<&'static LifecycleRegistry> {
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }
    let config = HarnessConfig::from_env()?;
    let registry = GLOBAL.get_or_init(|| LifecycleRegistry::new(config));
    hooks::register_exit_teardown();
    Ok(registry)
}

pub struct LifecycleRegistry {
    config: HarnessConfig,
    launcher: Launcher,
    materializer: Materializer,
    instance: Mutex<ServerInstance>,
    /// Serializes start sequences; `stop()` only needs `instance`.
    start_gate: tokio::sync::Mutex<()>,
}

impl LifecycleRegistry {
    pub fn new(config: HarnessConfig) -> Self {
        let instance = match &config.override_address {
            Some(addr) => {
                info!(uri = %addr.uri(), "using externally managed server");
                ServerInstance::external(addr)
            }
            None => ServerInstance::default(),
        };
        Self {
            launcher: Launcher::new(config.host_bin.clone()),
            materializer: Materializer::from_config(&config),
            instance: Mutex::new(instance),
            start_gate: tokio::sync::Mutex::new(()),
            config,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Snapshot of the current instance.
    pub fn instance(&self) -> ServerInstance {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ServerInstance> {
        // Teardown must work even after a panic elsewhere.
        self.instance.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Base URI of the server, starting one if needed.
    ///
    /// Concurrent callers share a single start sequence.
    pub async fn server_uri(&self) -> Result<String> {
        if let Some(addr) = &self.config.override_address {
            return Ok(addr.uri());
        }
        let _gate = self.start_gate.lock().await;
        if let Some(uri) = self.ready_uri() {
            return Ok(uri);
        }
        let port = self.start_locked().await?;
        Ok(ports::base_uri_for(port))
    }

    /// Like [`server_uri`](Self::server_uri), split into host and port.
    pub async fn server_address(&self) -> Result<ServerAddress> {
        ServerAddress::from_uri(&self.server_uri().await?)
    }

    fn ready_uri(&self) -> Option<String> {
        let instance = self.lock();
        match instance.readiness {
            Readiness::Ready => instance.base_uri.clone(),
            _ => None,
        }
    }

    /// Bring up a new server and return its port.
    ///
    /// Fails with [`HarnessError::AlreadyStarted`] while an instance is
    /// active. On any other failure the instance ends up `Failed` with every
    /// resource acquired so far released.
    pub async fn start(&self) -> Result<u16> {
        if let Some(addr) = &self.config.override_address {
            return Ok(addr.address().port);
        }
        let _gate = self.start_gate.lock().await;
        self.start_locked().await
    }

    async fn start_locked(&self) -> Result<u16> {
        {
            let mut instance = self.lock();
            if instance.readiness.is_active() {
                return Err(HarnessError::AlreadyStarted {
                    readiness: instance.readiness,
                });
            }
            *instance = ServerInstance {
                readiness: instance.readiness,
                ..ServerInstance::default()
            };
            instance.advance(Readiness::Launching);
        }

        // Also covers the caller dropping this future mid-start.
        let guard = StartGuard {
            registry: self,
            armed: true,
        };
        match self.bring_up().await {
            Ok(port) => {
                guard.disarm();
                Ok(port)
            }
            Err(err) => {
                warn!(error = %err, "server start failed, tearing down");
                drop(guard);
                Err(err)
            }
        }
    }

    /// Move an unfinished start to `Failed` and release what it acquired.
    fn abandon_start(&self) {
        let mut instance = self.lock();
        if matches!(
            instance.readiness,
            Readiness::Launching | Readiness::AwaitingReady
        ) {
            instance.advance(Readiness::Failed);
        }
        self.release(&mut instance);
    }

    async fn bring_up(&self) -> Result<u16> {
        let port = ports::allocate()?;
        let paths =
            self.materializer
                .materialize(port, &self.config.services, &self.config.extra_sections)?;
        {
            let mut instance = self.lock();
            instance.port = Some(port);
            instance.root_dir = Some(paths.root_dir.clone());
            instance.config_path = Some(paths.config_path.clone());
        }

        let process = self.launcher.launch(&paths).await?;
        let base_uri = ports::base_uri_for(port);
        {
            // Owned from here on, so a readiness failure kills it too.
            let mut instance = self.lock();
            instance.pid = Some(process.pid());
            instance.base_uri = Some(base_uri.clone());
            instance.advance(Readiness::AwaitingReady);
        }

        ready::await_ready(&base_uri, self.config.ready_timeout, Some(&paths.error_log)).await?;

        self.lock().advance(Readiness::Ready);
        info!(port, pid = process.pid(), uri = %base_uri, "server ready");
        Ok(port)
    }

    /// Tear down the active server, if any. Idempotent and infallible:
    /// problems are logged, never returned.
    ///
    /// Blocks the calling thread while the server process shuts down, up to
    /// [`TERMINATE_GRACE`]. On a multi-threaded tokio runtime the wait is
    /// moved off the worker via `block_in_place`.
    pub fn stop(&self) {
        if self.config.override_address.is_some() {
            debug!("externally managed server, nothing to stop");
            return;
        }
        let mut instance = self.lock();
        if instance.readiness == Readiness::Unstarted && !instance.holds_resources() {
            return;
        }
        self.release(&mut instance);
        *instance = ServerInstance::default();
        debug!("registry reset");
    }

    fn release(&self, instance: &mut ServerInstance) {
        if !instance.owns_process {
            return;
        }

        if let Some(pid) = instance.pid.take() {
            match blocking(|| ProcessHandle::new(pid).terminate(TERMINATE_GRACE)) {
                Ok(Termination::AlreadyExited) => debug!(pid, "server process already exited"),
                Ok(outcome) => info!(pid, ?outcome, "server process stopped"),
                Err(e) => warn!(pid, error = %e, "failed to terminate server process"),
            }
        }

        instance.config_path = None;
        if let Some(root) = instance.root_dir.take() {
            if self.config.retain_on_exit {
                info!(path = %root.display(), "server configuration and log files retained");
            } else if let Err(e) = fs::remove_dir_all(&root) {
                warn!(path = %root.display(), error = %e, "failed to remove server directory");
            } else {
                debug!(path = %root.display(), "removed server directory");
            }
        }
    }
}

struct StartGuard<'a> {
    registry: &'a LifecycleRegistry,
    armed: bool,
}

impl StartGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("start did not complete, releasing its resources");
            self.registry.abandon_start();
        }
    }
}

/// Run a blocking wait without stalling a multi-threaded runtime's worker.
/// `block_in_place` panics on a current-thread runtime, so that case (and no
/// runtime at all, as in exit hooks) runs inline.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

impl Drop for LifecycleRegistry {
    fn drop(&mut self) {
        self.stop();
    }
}
