use clap::{CommandFactory, Parser};
use clap_complete::aot::generate;
use hostrig::cli::{Cli, Commands};
use hostrig::commands;
use hostrig::HarnessError;

#[tokio::main]
async fn main() {
    // Logs go to stderr so `render` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Up {
            services,
            retain,
            timeout,
        } => commands::up::run(cli.global.host_bin, services, retain, timeout).await,
        Commands::Render { port, services } => {
            commands::render::run(cli.global.host_bin, port, services)
        }
        Commands::Probe { uri, timeout } => commands::probe::run(&uri, timeout).await,
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "hostrig", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        match e.downcast::<HarnessError>() {
            Ok(harness_err) => {
                let report: miette::Report = harness_err.into();
                eprintln!("{:?}", report);
            }
            Err(e) => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}
