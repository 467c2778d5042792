use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "hostrig", version, about = "Ephemeral service host harness")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Host binary invoked as `<host> --config-file <path> start`
    #[arg(long = "host-bin", env = "HOSTRIG_HOST_BIN", global = true)]
    pub host_bin: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a throwaway server and keep it up until Ctrl-C
    Up {
        /// Service module to load (repeatable, order preserved)
        #[arg(short = 's', long = "service")]
        services: Vec<String>,
        /// Keep the runtime directory after shutdown
        #[arg(long)]
        retain: bool,
        /// How long to wait for the server to answer
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
    },
    /// Write a runtime directory and print its config without launching
    Render {
        /// Port to write into the config (a free one if omitted)
        #[arg(long)]
        port: Option<u16>,
        /// Service module to load (repeatable, order preserved)
        #[arg(short = 's', long = "service")]
        services: Vec<String>,
    },
    /// Wait until a server answers on its base URI
    Probe {
        /// Base URI, e.g. http://localhost:8880/
        uri: String,
        /// Give up after this long
        #[arg(long, default_value = "20s", value_parser = humantime::parse_duration)]
        timeout: Duration,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
