use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::time::Duration;

use crate::registry::{shutdown_signal, LifecycleRegistry};

pub async fn run(
    host_bin: Option<PathBuf>,
    services: Vec<String>,
    retain: bool,
    timeout: Option<Duration>,
) -> Result<()> {
    let mut config = super::harness_config(host_bin)?.with_services(services);
    config.retain_on_exit |= retain;
    if let Some(timeout) = timeout {
        config.ready_timeout = timeout;
    }

    let registry = LifecycleRegistry::new(config);
    let uri = registry.server_uri().await?;
    let instance = registry.instance();

    println!("  {} server ready at {}", "\u{2713}".green(), uri.bold());
    if let Some(pid) = instance.pid {
        println!("    pid  {}", pid);
    }
    if let Some(root) = &instance.root_dir {
        println!("    root {}", root.display());
    }
    if !instance.owns_process {
        println!("    (externally managed, nothing to tear down)");
        return Ok(());
    }
    println!("  Press Ctrl-C to stop.");

    shutdown_signal().await;
    registry.stop();
    println!("  server stopped");
    Ok(())
}
