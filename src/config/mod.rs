pub mod harness;
pub mod materialize;
pub mod model;

use std::path::Path;

pub use harness::{HarnessConfig, WorkerPool};
pub use materialize::{MaterializedConfig, Materializer};
use model::HostConfig;

pub fn load_host_config(path: &Path) -> anyhow::Result<HostConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let config: HostConfig = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
    Ok(config)
}
