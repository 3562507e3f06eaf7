mod cli;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use hfetch_lib::logging::initialize_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging(cli.verbose);
    cli.run().await
}
