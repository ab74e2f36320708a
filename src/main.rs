use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use orgpulse::cli::{AdminCommands, ServeArgs, resolve_config, run_info, run_init, run_serve};

#[derive(Parser)]
#[command(name = "orgpulse")]
#[command(about = "A survey backend for organization hierarchies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("orgpulse=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { data_dir } => run_init(&data_dir)?,
            AdminCommands::Info { data_dir, json } => run_info(&data_dir, json)?,
        },
        Commands::Serve(args) => {
            let config = resolve_config(args)?;
            run_serve(config).await?;
        }
    }

    Ok(())
}
