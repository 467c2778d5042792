//! A stand-in service host that honours the launch contract
//! (`hostrig-stub --config-file <path> start`) so the harness can be tested
//! without a real host installed.
//!
//! Behaviour is picked by `mode` in the config's `[stub]` section:
//!
//! - `serve` (default): daemonize, write the PID file, answer HTTP on `listen`
//! - `silent`: daemonize and write the PID file, but never listen
//! - `fail`: write the error log and exit 1
//! - `no-pid`: exit 0 without writing a PID file
//! - `dead-pid`: write the PID of a process that already exited

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::routing::get;
use axum::Router;
use clap::{Parser, Subcommand};
use hostrig::config::load_host_config;
use hostrig::config::model::HostConfig;

#[derive(Debug, Parser)]
#[command(name = "hostrig-stub", version, about = "Stand-in service host for harness tests")]
struct Cli {
    #[arg(long = "config-file")]
    config_file: PathBuf,

    #[command(subcommand)]
    command: StubCommand,
}

#[derive(Debug, Subcommand)]
enum StubCommand {
    /// Start the host in the background
    Start,
    /// Run the host in the foreground (what `start` spawns)
    Serve,
}

fn main() {
    let cli = Cli::parse();
    let result = load_host_config(&cli.config_file).and_then(|config| match cli.command {
        StubCommand::Start => start(&cli.config_file, &config),
        StubCommand::Serve => serve(&config),
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn mode(config: &HostConfig) -> &str {
    config.section_str("stub", "mode").unwrap_or("serve")
}

fn start(config_file: &Path, config: &HostConfig) -> Result<()> {
    let server = &config.server;
    match mode(config) {
        "fail" => {
            let message = config
                .section_str("stub", "message")
                .unwrap_or("stub host refused to start");
            fs::write(&server.error_log, format!("{}\n", message))?;
            std::process::exit(1);
        }
        "no-pid" => Ok(()),
        "dead-pid" => {
            let mut child = Command::new(std::env::current_exe()?)
                .arg("--version")
                .stdout(Stdio::null())
                .spawn()?;
            let pid = child.id();
            child.wait()?;
            write_pid(&server.pid_file, pid)
        }
        "serve" | "silent" => {
            let mut cmd = Command::new(std::env::current_exe()?);
            cmd.arg("--config-file")
                .arg(config_file)
                .arg("serve")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
            #[cfg(unix)]
            {
                use std::os::unix::process::CommandExt;
                cmd.process_group(0);
            }
            let child = cmd.spawn().context("spawning stub daemon")?;
            write_pid(&server.pid_file, child.id())
        }
        other => bail!("unknown stub mode `{}`", other),
    }
}

fn write_pid(path: &Path, pid: u32) -> Result<()> {
    fs::write(path, format!("{}\n", pid))
        .with_context(|| format!("writing PID file {}", path.display()))
}

fn serve(config: &HostConfig) -> Result<()> {
    if mode(config) == "silent" {
        loop {
            std::thread::sleep(Duration::from_secs(3600));
        }
    }

    let listen = config.server.listen.clone();
    let banner = format!("modules: {}\n", config.server.modules.join(", "));
    let error_log = config.server.error_log.clone();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result: Result<()> = runtime.block_on(async move {
        let app = Router::new().route(
            "/",
            get(move || {
                let banner = banner.clone();
                async move { banner }
            }),
        );
        let listener = tokio::net::TcpListener::bind(&listen)
            .await
            .with_context(|| format!("binding {}", listen))?;
        axum::serve(listener, app).await?;
        Ok(())
    });

    if let Err(e) = &result {
        let _ = fs::write(&error_log, format!("{:#}\n", e));
    }
    result
}
