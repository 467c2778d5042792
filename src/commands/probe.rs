use anyhow::Result;
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

use crate::ready::await_ready;

pub async fn run(uri: &str, timeout: Duration) -> Result<()> {
    let started = Instant::now();
    await_ready(uri, timeout, None).await?;
    println!(
        "  {} {} answered after {}",
        "\u{2713}".green(),
        uri,
        humantime::format_duration(started.elapsed()),
    );
    Ok(())
}
