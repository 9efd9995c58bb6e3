use anyhow::Result;
use clap::Parser;
use tracing::info;

use multichat::cli::{Cli, Command};
use multichat::config::{ClientConfig, ServerConfig};
use multichat::{client, logging, server::Server};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Server(args) => {
            let server = Server::bind(ServerConfig::from(args)).await?;
            info!("listening on {}", server.local_addr()?);
            server.run_until_ctrl_c().await?;
        }
        Command::Client(args) => client::connect(ClientConfig::from(args)).await?,
    }

    Ok(())
}
