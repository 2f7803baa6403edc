use clap::Parser;
use std::path::PathBuf;

mod commands;
mod logging;

use commands::{Commands, ServeArgs};

#[derive(Parser)]
#[command(name = "terra-stac")]
#[command(about = "STAC API with per-collection access control", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON settings file, applied before environment variables
    #[arg(long, short, global = true, env = "TERRA_STAC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    // a missing .env file is fine
    dotenv::dotenv().ok();
    logging::init()?;

    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Serve(ServeArgs::default()));
    command.execute(cli.config.as_deref()).await
}
