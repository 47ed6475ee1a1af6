mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    batchreg::observability::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            batchreg::api::run(args.address).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Dispatch(args) => commands::dispatch(args).await,
        Commands::ShowConfig => commands::show_config(),
    }
}
