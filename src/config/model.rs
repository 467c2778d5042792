use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A host config file as written by the materializer and read back by the
/// host (and by tests).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HostConfig {
    pub server: ServerSection,
    /// Caller-defined sections, keyed by table name.
    #[serde(flatten)]
    pub sections: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    pub server_root: PathBuf,
    /// Public-facing base path the host advertises.
    pub server_path: String,
    /// Loopback base path, `http://localhost:<port>/`.
    pub internal_server_path: String,
    /// Listen spec, `localhost:<port>`.
    pub listen: String,
    pub log_level: String,
    pub pid_file: PathBuf,
    pub error_log: PathBuf,
    pub min_spare_servers: u32,
    pub max_servers: u32,
    pub max_requests_per_server: u32,
    #[serde(default)]
    pub modules: Vec<String>,
}

impl ServerSection {
    /// Port parsed from the listen spec.
    pub fn port(&self) -> Option<u16> {
        self.listen.rsplit_once(':')?.1.parse().ok()
    }
}

impl HostConfig {
    /// Look up a string key in one of the caller-defined sections.
    pub fn section_str(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key)?.as_str()
    }
}
