use clap::{Parser, Subcommand};
use ftpsync::config::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (TOML); FTPSYNC_* environment variables override it
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Upload a file into a remote directory
    Upload {
        /// Local file to send
        local_path: String,
        /// Remote directory
        remote_path: String,
    },
    /// Make a remote directory contain only this file
    Replace {
        /// Local file to send
        local_path: String,
        /// Remote directory to reconcile
        remote_path: String,
    },
    /// Delete one remote file
    Delete {
        /// Remote file path
        remote_path: String,
    },
}
