//! VendorRisk CLI: vendor risk assessment from the terminal.
//!
//! Runs the analysis pipeline directly, or serves it over HTTP for the web
//! front end.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
