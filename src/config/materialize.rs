use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::harness::{HarnessConfig, WorkerPool};
use crate::config::model::ServerSection;
use crate::error::{HarnessError, Result};
use crate::ports::base_uri_for;

pub const CONFIG_FILE_NAME: &str = "host.toml";
pub const LOGS_DIR: &str = "logs";
pub const PID_FILE_NAME: &str = "host.pid";
pub const ERROR_LOG_NAME: &str = "error.log";

const DIR_PREFIX: &str = "hostrig-";

/// Paths of one materialized runtime directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedConfig {
    pub root_dir: PathBuf,
    pub config_path: PathBuf,
    pub pid_file: PathBuf,
    pub error_log: PathBuf,
}

impl MaterializedConfig {
    fn for_root(root_dir: PathBuf) -> Self {
        let logs = root_dir.join(LOGS_DIR);
        Self {
            config_path: root_dir.join(CONFIG_FILE_NAME),
            pid_file: logs.join(PID_FILE_NAME),
            error_log: logs.join(ERROR_LOG_NAME),
            root_dir,
        }
    }

    /// Contents of the host's error log, or a placeholder explaining why it
    /// could not be read. Never fails.
    pub fn read_error_log(&self) -> String {
        read_error_log(&self.error_log)
    }
}

pub fn read_error_log(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => format!("<error log {} unavailable: {}>", path.display(), e),
    }
}

/// Writes fresh runtime directories for host instances.
#[derive(Debug, Clone)]
pub struct Materializer {
    parent: Option<PathBuf>,
    server_path: String,
    log_level: String,
    workers: WorkerPool,
}

impl Materializer {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            parent: config.runtime_parent.clone(),
            server_path: config.server_path.clone(),
            log_level: config.log_level.clone(),
            workers: config.workers,
        }
    }

    /// Create a uniquely named directory holding `logs/` and a config file
    /// describing a host listening on `port` with `services` loaded.
    ///
    /// A half-built directory is removed before the error is returned.
    pub fn materialize(
        &self,
        port: u16,
        services: &[String],
        extra_sections: &BTreeMap<String, toml::Table>,
    ) -> Result<MaterializedConfig> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(DIR_PREFIX);
        let created = match &self.parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        let dir = created.map_err(|source| HarnessError::ConfigWrite {
            path: self.parent.clone().unwrap_or_else(std::env::temp_dir),
            source,
        })?;

        let paths = MaterializedConfig::for_root(dir.path().to_path_buf());
        let logs = paths.root_dir.join(LOGS_DIR);
        fs::create_dir(&logs).map_err(|source| HarnessError::ConfigWrite {
            path: logs.clone(),
            source,
        })?;

        let rendered = self
            .render(&paths, port, services, extra_sections)
            .map_err(|e| HarnessError::ConfigWrite {
                path: paths.config_path.clone(),
                source: std::io::Error::other(e),
            })?;
        fs::write(&paths.config_path, rendered).map_err(|source| HarnessError::ConfigWrite {
            path: paths.config_path.clone(),
            source,
        })?;

        // Ownership moves to the caller's ServerInstance from here on.
        let _ = dir.keep();
        info!(root = %paths.root_dir.display(), port, "materialized server directory");
        Ok(paths)
    }

    fn render(
        &self,
        paths: &MaterializedConfig,
        port: u16,
        services: &[String],
        extra_sections: &BTreeMap<String, toml::Table>,
    ) -> Result<String, toml::ser::Error> {
        let server = ServerSection {
            server_root: paths.root_dir.clone(),
            server_path: self.server_path.clone(),
            internal_server_path: base_uri_for(port),
            listen: format!("localhost:{}", port),
            log_level: self.log_level.clone(),
            pid_file: paths.pid_file.clone(),
            error_log: paths.error_log.clone(),
            min_spare_servers: self.workers.min_spare_servers,
            max_servers: self.workers.max_servers,
            max_requests_per_server: self.workers.max_requests_per_server,
            modules: services.to_vec(),
        };

        let mut document = toml::Table::new();
        for (name, table) in extra_sections {
            if name == "server" {
                debug!("ignoring caller-supplied [server] section");
                continue;
            }
            document.insert(name.clone(), toml::Value::Table(table.clone()));
        }
        document.insert("server".to_string(), toml::Value::try_from(&server)?);
        toml::to_string(&document)
    }
}
