use anyhow::Result;
use clap::Parser;
use savings365::cli::Cli;
use savings365::logging::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    cli.run().await
}
