mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use ftpsync::{OperationResult, RemoteFileSync, config, server};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;
    info!(endpoint = ?config.endpoint, "configuration loaded");

    let sync = RemoteFileSync::ftp(config.endpoint.clone())?;

    let result = match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or(config.server.bind);
            return server::run_server(Arc::new(sync), &bind).await;
        }
        Commands::Upload {
            local_path,
            remote_path,
        } => sync.upload(&local_path, &remote_path).await,
        Commands::Replace {
            local_path,
            remote_path,
        } => sync.replace(&local_path, &remote_path).await,
        Commands::Delete { remote_path } => sync.delete(&remote_path).await,
    };

    let outcome = OperationResult::from(&result);
    if outcome.success {
        println!("{}", outcome.message);
        Ok(())
    } else {
        eprintln!("Error: {}", outcome.message);
        std::process::exit(1);
    }
}
