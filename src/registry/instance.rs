use std::fmt;
use std::path::PathBuf;

use crate::registry::address::OverrideAddress;

/// Where a server instance is in its start sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Unstarted,
    Launching,
    AwaitingReady,
    Ready,
    Failed,
}

impl Readiness {
    /// `true` while an instance occupies the registry.
    pub fn is_active(self) -> bool {
        !matches!(self, Readiness::Unstarted | Readiness::Failed)
    }

    /// Forward-only transitions. Resetting to `Unstarted` is teardown's job
    /// and does not go through here.
    pub fn can_advance_to(self, next: Readiness) -> bool {
        use Readiness::*;
        matches!(
            (self, next),
            (Unstarted | Failed, Launching)
                | (Launching, AwaitingReady)
                | (AwaitingReady, Ready)
                | (Launching | AwaitingReady, Failed)
        )
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Readiness::Unstarted => "unstarted",
            Readiness::Launching => "launching",
            Readiness::AwaitingReady => "awaiting-ready",
            Readiness::Ready => "ready",
            Readiness::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The single server a registry manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInstance {
    pub root_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    /// Set only once the PID file was read and the PID answered a liveness
    /// probe.
    pub pid: Option<u32>,
    pub port: Option<u16>,
    pub base_uri: Option<String>,
    pub readiness: Readiness,
    /// `false` for an externally managed server: never signal it, never
    /// delete anything on its behalf.
    pub owns_process: bool,
}

impl Default for ServerInstance {
    fn default() -> Self {
        Self {
            root_dir: None,
            config_path: None,
            pid: None,
            port: None,
            base_uri: None,
            readiness: Readiness::Unstarted,
            owns_process: true,
        }
    }
}

impl ServerInstance {
    pub fn external(address: &OverrideAddress) -> Self {
        Self {
            port: Some(address.address().port),
            base_uri: Some(address.uri()),
            readiness: Readiness::Ready,
            owns_process: false,
            ..Self::default()
        }
    }

    /// Whether teardown has anything to release.
    pub fn holds_resources(&self) -> bool {
        self.owns_process && (self.pid.is_some() || self.root_dir.is_some())
    }

    pub(crate) fn advance(&mut self, next: Readiness) {
        if !self.readiness.can_advance_to(next) {
            // Only reachable when stop() raced an in-flight start.
            tracing::warn!(from = %self.readiness, to = %next, "unexpected readiness transition");
        }
        tracing::debug!(from = %self.readiness, to = %next, "readiness transition");
        self.readiness = next;
    }
}
