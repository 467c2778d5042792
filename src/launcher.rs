use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::MaterializedConfig;
use crate::error::{HarnessError, Result};
use crate::platform::ProcessHandle;

/// Runs the host's start command and confirms the daemon it leaves behind.
#[derive(Debug, Clone)]
pub struct Launcher {
    host_bin: PathBuf,
}

impl Launcher {
    pub fn new(host_bin: impl Into<PathBuf>) -> Self {
        Self {
            host_bin: host_bin.into(),
        }
    }

    fn command_line(&self, config_path: &Path) -> String {
        format!(
            "{} --config-file {} start",
            self.host_bin.display(),
            config_path.display()
        )
    }

    /// Run `<host> --config-file <path> start` and wait for that command to
    /// return. The host is expected to daemonize, write its PID file and exit
    /// 0 promptly.
    ///
    /// On success the returned handle refers to a PID that was read from the
    /// PID file and answered a liveness probe.
    pub async fn launch(&self, config: &MaterializedConfig) -> Result<ProcessHandle> {
        let command = self.command_line(&config.config_path);
        info!(%command, "launching host");

        let status = Command::new(&self.host_bin)
            .arg("--config-file")
            .arg(&config.config_path)
            .arg("start")
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| {
                warn!(%command, error = %source, "failed to execute host");
                HarnessError::Launch {
                    command: command.clone(),
                    code: None,
                    error_log: config.read_error_log(),
                    source: Some(source),
                }
            })?;

        if !status.success() {
            return Err(HarnessError::Launch {
                command,
                code: status.code(),
                error_log: config.read_error_log(),
                source: None,
            });
        }
        debug!(%status, "start command returned");

        let pid = read_pid_file(&config.pid_file)?;
        let process = ProcessHandle::new(pid);
        if !process.is_alive() {
            return Err(HarnessError::ProcessNotAlive { pid });
        }
        info!(pid, "host process is alive");
        Ok(process)
    }
}

/// Parse the single decimal PID on the first line of `path`.
pub fn read_pid_file(path: &Path) -> Result<u32> {
    let missing = |reason: String| HarnessError::PidFileMissing {
        path: path.to_path_buf(),
        reason,
    };
    let content = fs::read_to_string(path).map_err(|e| missing(e.to_string()))?;
    let line = content.lines().next().unwrap_or("").trim();
    match line.parse::<u32>() {
        Ok(0) => Err(missing("PID 0 is not a process".to_string())),
        Ok(pid) => Ok(pid),
        Err(e) => Err(missing(format!("`{}` is not a PID: {}", line, e))),
    }
}
