//! tabprep - Main Entry Point

use clap::Parser;
use tabprep::cli::{cmd_fit, cmd_plan, cmd_transform, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabprep=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan { config } => {
            cmd_plan(&config)?;
        }
        Commands::Fit { config, data, output, transformed } => {
            cmd_fit(&config, &data, &output, transformed.as_deref())?;
        }
        Commands::Transform { model, data, output } => {
            cmd_transform(&model, &data, &output)?;
        }
    }

    Ok(())
}
