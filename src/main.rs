//! CLI entry point for OPERA RTC-S1 browse generation

use clap::Parser;
use s1browse::cli::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let outputs = cli.run()?;
    for tile in &outputs.tiles {
        log::info!("Tile: {}", tile.display());
    }
    Ok(())
}
