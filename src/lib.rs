pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod remote;
pub mod server;
pub mod sync;

pub use client::FtpClient;
pub use config::{AppConfig, RemoteEndpoint, RemoteUri};
pub use error::{SyncError, TransferError};
pub use protocol::Reply;
pub use remote::RemoteTransferClient;
pub use sync::{OperationResult, RemoteFileSync, TransferRequest};
