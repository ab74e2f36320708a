use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the data directory and database schema
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Show server status information
    Info {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Flags for `serve`. Any flag given overrides the config file.
#[derive(clap::Args)]
pub struct ServeArgs {
    /// Path to a TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Data directory for the database
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory holding the question-set JSON files
    #[arg(long)]
    pub question_sets_dir: Option<PathBuf>,
}
