mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands only read the file, no engine required
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global),

        cmd => {
            let config = match cli.global.config {
                Some(ref path) => fwsync_config::load_from(path)?,
                None => fwsync_config::load_config()?,
            };
            let ctx = commands::Context::build(&config)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &ctx, &cli.global, &config).await
        }
    }
}
