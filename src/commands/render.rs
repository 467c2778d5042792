use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::Materializer;
use crate::ports;

pub fn run(host_bin: Option<PathBuf>, port: Option<u16>, services: Vec<String>) -> Result<()> {
    let config = super::harness_config(host_bin)?.with_services(services);
    let port = match port {
        Some(port) => port,
        None => ports::allocate()?,
    };

    let paths = Materializer::from_config(&config).materialize(
        port,
        &config.services,
        &config.extra_sections,
    )?;
    let rendered = std::fs::read_to_string(&paths.config_path)
        .with_context(|| format!("reading back {}", paths.config_path.display()))?;

    println!("{}", paths.config_path.display());
    println!();
    print!("{}", rendered);
    Ok(())
}
