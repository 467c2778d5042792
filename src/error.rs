// The miette/thiserror derive macros generate code that triggers false
// positive unused_assignments warnings on enum variant fields.
#![allow(unused_assignments)]

use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::registry::Readiness;

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("could not allocate a free local port")]
    #[diagnostic(code(hostrig::port_allocation))]
    PortAllocation(#[source] std::io::Error),

    #[error("failed to write server runtime directory at {}", .path.display())]
    #[diagnostic(code(hostrig::config_write))]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not start `{command}` ({}):\n{error_log}", describe_exit(*.code))]
    #[diagnostic(
        code(hostrig::launch),
        help("the host's error log is shown above; set HOSTRIG_SAVE=1 to keep the runtime directory")
    )]
    Launch {
        command: String,
        code: Option<i32>,
        error_log: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("host exited cleanly but left no usable PID file at {}: {reason}", .path.display())]
    #[diagnostic(code(hostrig::pid_file_missing))]
    PidFileMissing { path: PathBuf, reason: String },

    #[error("host reported PID {pid} but no such process is running")]
    #[diagnostic(code(hostrig::process_not_alive))]
    ProcessNotAlive { pid: u32 },

    #[error(
        "server at {uri} did not answer within {}{}\ncurrent error log:\n{error_log}",
        humantime::format_duration(*.timeout),
        .last_error.as_ref().map(|e| format!(" (last error: {e})")).unwrap_or_default()
    )]
    #[diagnostic(
        code(hostrig::readiness_timeout),
        help("raise HOSTRIG_READY_TIMEOUT if the host is just slow to import its services")
    )]
    ReadinessTimeout {
        uri: String,
        timeout: Duration,
        last_error: Option<String>,
        error_log: String,
    },

    #[error("a server is already active (state: {readiness})")]
    #[diagnostic(code(hostrig::already_started))]
    AlreadyStarted { readiness: Readiness },

    #[error("invalid override address `{value}`: {reason}")]
    #[diagnostic(
        code(hostrig::invalid_override),
        help("HOSTRIG_TEST_SERVER takes a bare `host:port`, e.g. `localhost:8880`")
    )]
    InvalidOverride { value: String, reason: String },

    #[error("cannot use server URI `{uri}`: {reason}")]
    #[diagnostic(code(hostrig::invalid_server_uri))]
    InvalidServerUri { uri: String, reason: String },

    #[error("invalid value `{value}` for {name}: {reason}")]
    #[diagnostic(code(hostrig::invalid_setting))]
    InvalidSetting {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("could not build the HTTP client used for readiness checks")]
    #[diagnostic(code(hostrig::http_client))]
    HttpClient(#[source] reqwest::Error),
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "not executed or killed by a signal".to_string(),
    }
}
