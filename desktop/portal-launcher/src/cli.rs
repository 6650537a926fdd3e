use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "portal-launcher")]
#[command(about = "Start, stop and configure the local NIA Engineering Portal server")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding config.json (overrides PORTAL_CONFIG_DIR)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the portal server until interrupted (default)
    Run {
        /// Do not open the portal in a browser once the server is up
        #[arg(long)]
        no_browser: bool,
    },

    /// Portal configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Self::Run { no_browser: false }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigCommands {
    /// Print the current configuration as JSON
    Show,

    /// Change the port and/or default page
    #[command(group(
        ArgGroup::new("fields")
            .required(true)
            .multiple(true)
            .args(["port", "default_page"])
    ))]
    Set {
        /// Server port (1024-65535)
        #[arg(long, allow_negative_numbers = true)]
        port: Option<i64>,

        /// Page opened in the browser; must be one of the available pages
        #[arg(long)]
        default_page: Option<String>,
    },
}
