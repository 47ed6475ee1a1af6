use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "batchreg")]
#[command(about = "Register CSV rows of attendees with a remote event API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP upload service
    Server(ServerArgs),
    /// Register every row of a local CSV file
    Dispatch(DispatchArgs),
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind to, overrides server.bind_addr
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct DispatchArgs {
    /// CSV file with `name,email` lines
    #[arg(long, short)]
    pub file: PathBuf,

    #[arg(long)]
    pub event_id: String,

    #[arg(long, env = "BATCHREG_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "BATCHREG_API_SECRET", hide_env_values = true)]
    pub api_secret: String,

    /// Records dispatched at once, overrides batch.concurrency
    #[arg(long)]
    pub concurrency: Option<usize>,
}
