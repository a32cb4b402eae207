use std::io;
use thiserror::Error;

/// Protocol-level failure while talking to the FTP server.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("unexpected reply {code}: {text}")]
    UnexpectedReply { code: u16, text: String },
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    #[error("connection closed by server")]
    ConnectionClosed,
    #[error("line break in {verb} argument: {arg:?}")]
    LineBreakInArgument { verb: String, arg: String },
}

/// Errors surfaced by upload, replace and delete.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    RemoteTransferFailure(String),
    #[error("{context}")]
    Transport {
        context: &'static str,
        #[source]
        source: TransferError,
    },
    #[error("failed to read local file")]
    LocalIo(#[source] io::Error),
}

impl SyncError {
    pub fn transport(context: &'static str, source: impl Into<TransferError>) -> Self {
        SyncError::Transport {
            context,
            source: source.into(),
        }
    }

    /// HTTP status the API layer reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            SyncError::InvalidArgument(_) => 400,
            SyncError::NotFound(_) => 404,
            SyncError::RemoteTransferFailure(_)
            | SyncError::Transport { .. }
            | SyncError::LocalIo(_) => 500,
        }
    }
}
