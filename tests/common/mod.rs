#![allow(dead_code)]
use std::net::TcpListener;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use assert_fs::prelude::*;
use assert_fs::TempDir;
use hostrig::config::HarnessConfig;

pub const STUB: &str = env!("CARGO_BIN_EXE_hostrig-stub");

/// A scratch directory that runtime directories are created under, so tests
/// can see exactly what the harness left behind.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        dir.child("runs").create_dir_all().unwrap();
        Self { dir }
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.dir.child("runs").path().to_path_buf()
    }

    /// Runtime directories currently present.
    pub fn runs(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.runs_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    /// Harness config driving the stub host in `mode`.
    pub fn config(&self, mode: &str) -> HarnessConfig {
        let mut stub = toml::Table::new();
        stub.insert("mode".into(), mode.into());
        HarnessConfig {
            host_bin: PathBuf::from(STUB),
            runtime_parent: Some(self.runs_dir()),
            ready_timeout: Duration::from_secs(10),
            ..HarnessConfig::default()
        }
        .with_services(["markup", "static"])
        .with_section("stub", stub)
    }
}

pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Poll until `pid` is gone. Stopped daemons are reaped by init, which can
/// take a moment.
pub async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let process = hostrig::platform::ProcessHandle::new(pid);
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process.is_alive() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
