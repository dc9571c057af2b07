mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::Session;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        match err.api_lines() {
            Some(lines) => {
                for line in lines {
                    eprintln!("{line}");
                }
            }
            None => eprintln!("{:?}", miette::Report::new(err)),
        }
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
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "cloak-server", &mut std::io::stdout());
            Ok(())
        }

        // Read-only; never rewrites the file
        Command::Config(args) => {
            let session = Session::load(&cli.global)?;
            commands::config_cmd::handle(&args, &session, &cli.global);
            Ok(())
        }

        cmd => {
            let mut session = Session::load(&cli.global)?;

            tracing::debug!(config = %session.path.display(), "dispatching command");
            commands::dispatch(cmd, &mut session, &cli.global).await?;

            session.save()
        }
    }
}
