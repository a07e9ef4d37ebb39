mod lookup;
mod pick;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::pick::PickArgs;

#[derive(Debug, Parser)]
#[command(name = "doorstep")]
#[command(about = "Delivery address lookup and picker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve free-form address text to a coordinate
    Geocode {
        /// Address text, e.g. "221B Broadway NYC"
        query: String,
    },
    /// Resolve a coordinate to a postal address
    Reverse {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
    /// Run the full picker flow once and print the saved address
    Pick(PickArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = doorstep_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(env = %config.env, "configuration loaded");

    match cli.command {
        Commands::Geocode { query } => lookup::run_geocode(&config, &query).await,
        Commands::Reverse { lat, lng } => lookup::run_reverse(&config, lat, lng).await,
        Commands::Pick(args) => pick::run_pick(&config, args).await,
    }
}
