use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use quarry_cli::{cli::Cli, commands, logging};
use quarry_config::ConfigLoader;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfigLoader::load_default().context("Failed to load default config")?,
    };
    logging::init(&cli, &config.logging);
    debug!(?config, "Loaded configuration");

    let output = commands::execute(cli.command, &config)?;
    println!("{output}");
    Ok(())
}
