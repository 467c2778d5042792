use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HarnessError, Result};
use crate::registry::OverrideAddress;

pub const OVERRIDE_ENV: &str = "HOSTRIG_TEST_SERVER";
pub const RETAIN_ENV: &str = "HOSTRIG_SAVE";
pub const HOST_BIN_ENV: &str = "HOSTRIG_HOST_BIN";
pub const READY_TIMEOUT_ENV: &str = "HOSTRIG_READY_TIMEOUT";
pub const LOG_LEVEL_ENV: &str = "HOSTRIG_LOG_LEVEL";
pub const RUNTIME_DIR_ENV: &str = "HOSTRIG_RUNTIME_DIR";

pub const DEFAULT_HOST_BIN: &str = "service-host";
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_LOG_LEVEL: &str = "DEBUG";
pub const DEFAULT_SERVER_PATH: &str = "http://localhost/";

/// Worker-pool bounds written into the host config. Small on purpose so the
/// host's own restart tests trip them quickly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    pub min_spare_servers: u32,
    pub max_servers: u32,
    pub max_requests_per_server: u32,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            min_spare_servers: 3,
            max_servers: 5,
            max_requests_per_server: 5,
        }
    }
}

/// Everything the harness needs to bring up (or bypass) one host instance.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Binary invoked as `<host_bin> --config-file <path> start`.
    pub host_bin: PathBuf,
    /// Externally managed server; when set nothing is spawned or removed.
    pub override_address: Option<OverrideAddress>,
    /// Keep the runtime directory after teardown for post-mortem inspection.
    pub retain_on_exit: bool,
    pub ready_timeout: Duration,
    pub log_level: String,
    pub server_path: String,
    /// Parent directory for runtime directories; the system temp dir if unset.
    pub runtime_parent: Option<PathBuf>,
    /// Service modules the host should load, in order.
    pub services: Vec<String>,
    pub workers: WorkerPool,
    pub extra_sections: BTreeMap<String, toml::Table>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            host_bin: PathBuf::from(DEFAULT_HOST_BIN),
            override_address: None,
            retain_on_exit: false,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            server_path: DEFAULT_SERVER_PATH.to_string(),
            runtime_parent: None,
            services: Vec::new(),
            workers: WorkerPool::default(),
            extra_sections: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count
    /// as unset, except for the retain flag where presence alone is enough.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(value) = get(OVERRIDE_ENV) {
            config.override_address = Some(OverrideAddress::parse(&value)?);
        }
        config.retain_on_exit = lookup(RETAIN_ENV).is_some();
        if let Some(bin) = get(HOST_BIN_ENV) {
            config.host_bin = PathBuf::from(bin);
        }
        if let Some(value) = get(READY_TIMEOUT_ENV) {
            config.ready_timeout =
                humantime::parse_duration(&value).map_err(|e| HarnessError::InvalidSetting {
                    name: READY_TIMEOUT_ENV,
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(level) = get(LOG_LEVEL_ENV) {
            config.log_level = level;
        }
        if let Some(dir) = get(RUNTIME_DIR_ENV) {
            config.runtime_parent = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = services.into_iter().map(Into::into).collect();
        self
    }

    /// Add (or replace) a caller-defined section in the generated config.
    pub fn with_section(mut self, name: impl Into<String>, table: toml::Table) -> Self {
        self.extra_sections.insert(name.into(), table);
        self
    }
}
