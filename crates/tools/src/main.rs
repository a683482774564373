//! Homepage content tools - Main Entry Point

use clap::{Parser, Subcommand};

use homepage_tools::commands::{crop, translate};

/// Homepage content tools
#[derive(Parser)]
#[command(name = "homepage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate reading.json into English, Spanish and French
    Translate(translate::TranslateArgs),

    /// Crop an image to a circle
    CircleCrop(crop::CropArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Translate(args) => translate::execute(args).await?,
        Commands::CircleCrop(args) => crop::execute(args)?,
    }

    Ok(())
}
