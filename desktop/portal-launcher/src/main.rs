use portal_launcher::app;
use portal_launcher::cli::{Cli, Commands, ConfigCommands};
use portal_launcher::update::ConfigUpdate;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_dir = cli.config_dir.as_deref();

    let result = match cli.command.unwrap_or_default() {
        Commands::Run { no_browser } => app::run(config_dir, !no_browser).await,
        Commands::Config { action } => {
            // Config commands only surface warnings, on stderr
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .with_writer(std::io::stderr)
                .try_init();

            match app::open_config(config_dir) {
                Ok(mut store) => match action {
                    ConfigCommands::Show => app::show_config(&store),
                    ConfigCommands::Set { port, default_page } => {
                        app::set_config(&mut store, &ConfigUpdate { port, default_page })
                    }
                },
                Err(e) => Err(e.into()),
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
