pub mod probe;
pub mod render;
pub mod up;

use crate::config::HarnessConfig;
use std::path::PathBuf;

/// Environment-derived harness config with CLI overrides applied.
pub(crate) fn harness_config(host_bin: Option<PathBuf>) -> anyhow::Result<HarnessConfig> {
    let mut config = HarnessConfig::from_env()?;
    if let Some(bin) = host_bin {
        config.host_bin = bin;
    }
    Ok(config)
}
