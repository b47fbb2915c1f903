//! leadscore CLI entry point.
//!
//! Stages raw CRM leads into SQLite, trains the scoring model, serves batch
//! predictions, and monitors prediction drift.

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
