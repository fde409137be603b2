use anyhow::Result;
use clap::Parser;

use codepulse::{cli::{handle_command, Cli}, utils::init_logger};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    let code = handle_command(cli).await?;
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
