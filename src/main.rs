use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mnemo::{config, server};

#[derive(Parser)]
#[command(name = "mnemo", version, about = "Long-term conversational memory service")]
struct Cli {
    /// Path to a config TOML (defaults to ~/.mnemo/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP memory server
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::MnemoConfig::load_from(path)?,
        None => config::MnemoConfig::load()?,
    };

    // Log to stderr so stdout stays available for scripting.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
    }

    Ok(())
}
