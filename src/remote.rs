use crate::config::RemoteUri;
use crate::error::SyncError;
use crate::protocol::Reply;
use async_trait::async_trait;

/// Issues exactly one remote-transfer command per call.
///
/// Implementations authenticate on every call and share no connection
/// between calls. Transport failures come back as
/// [`SyncError::Transport`]; a command the server answered is returned as
/// its final [`Reply`] and classified by the caller.
#[async_trait]
pub trait RemoteTransferClient: Send + Sync + 'static {
    /// Stores `data` as the full content of `target`, creating or overwriting it.
    async fn upload(&self, target: &RemoteUri, data: &[u8]) -> Result<Reply, SyncError>;

    /// Removes one named entry.
    async fn delete(&self, target: &RemoteUri) -> Result<Reply, SyncError>;

    /// Raw name list of one directory, one entry per line.
    async fn list_directory(&self, directory: &RemoteUri) -> Result<Vec<String>, SyncError>;
}
