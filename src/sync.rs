//! Upload, replace and delete composed from single remote commands.
//!
//! None of these operations is atomic. Replace in particular deletes
//! foreign entries one by one before uploading; a failure part way leaves
//! the directory half reconciled. Re-running Replace converges because
//! remote deletes of missing entries are tolerated and uploads overwrite.

use crate::client::FtpClient;
use crate::config::{RemoteEndpoint, RemoteUri};
use crate::error::SyncError;
use crate::protocol::has_line_break;
use crate::remote::RemoteTransferClient;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

/// Outcome reported to callers: a success message or a failure reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl OperationResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failure with the full cause chain, outermost first.
    pub fn failure(err: &SyncError) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            success: false,
            message,
        }
    }
}

impl From<&Result<String, SyncError>> for OperationResult {
    fn from(result: &Result<String, SyncError>) -> Self {
        match result {
            Ok(message) => OperationResult::success(message.as_str()),
            Err(e) => OperationResult::failure(e),
        }
    }
}

/// A validated local file headed for a remote directory.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub local_path: PathBuf,
    pub remote_path: String,
    /// Always the basename of `local_path`.
    pub file_name: String,
}

impl TransferRequest {
    /// Checks both paths are present and the local file exists.
    pub async fn prepare(local_path: &str, remote_path: &str) -> Result<Self, SyncError> {
        if local_path.is_empty() || remote_path.is_empty() {
            return Err(SyncError::InvalidArgument(
                "Local path and remote path are required.".to_string(),
            ));
        }
        check_remote_path(remote_path)?;

        let local = PathBuf::from(local_path);
        let is_file = fs::metadata(&local)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(SyncError::NotFound("Local file not found.".to_string()));
        }

        let file_name = local
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                SyncError::InvalidArgument(format!("Local path has no file name: {}", local_path))
            })?;
        if has_line_break(&file_name) {
            return Err(SyncError::InvalidArgument(
                "Local file name must not contain line breaks.".to_string(),
            ));
        }

        Ok(Self {
            local_path: local,
            remote_path: remote_path.to_string(),
            file_name,
        })
    }

    /// Remote directory with surrounding slashes removed.
    pub fn remote_directory(&self) -> &str {
        self.remote_path.trim_matches('/')
    }

    async fn read(&self) -> Result<Vec<u8>, SyncError> {
        fs::read(&self.local_path).await.map_err(SyncError::LocalIo)
    }
}

/// The three remote file operations over one injected endpoint.
pub struct RemoteFileSync<C> {
    client: C,
    root: RemoteUri,
}

impl RemoteFileSync<FtpClient> {
    /// Production wiring: FTP client and paths on the same endpoint.
    pub fn ftp(endpoint: RemoteEndpoint) -> anyhow::Result<Self> {
        let root = endpoint.resolve("")?;
        Ok(Self::new(FtpClient::new(endpoint), root))
    }
}

impl<C: RemoteTransferClient> RemoteFileSync<C> {
    pub fn new(client: C, root: RemoteUri) -> Self {
        Self { client, root }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn at(&self, path: &str) -> RemoteUri {
        RemoteUri {
            host: self.root.host.clone(),
            port: self.root.port,
            path: path.trim_start_matches('/').to_string(),
        }
    }

    /// Uploads `local_path` into the remote directory `remote_path`.
    pub async fn upload(&self, local_path: &str, remote_path: &str) -> Result<String, SyncError> {
        let request = TransferRequest::prepare(local_path, remote_path).await?;
        let data = request.read().await?;
        let target = self.at(request.remote_directory()).join(&request.file_name);

        info!(local = %request.local_path.display(), %target, bytes = data.len(), "upload");
        let reply = self.client.upload(&target, &data).await?;
        if reply.is_transfer_complete() {
            Ok("File uploaded successfully.".to_string())
        } else {
            warn!(%target, %reply, "upload rejected");
            Err(SyncError::RemoteTransferFailure(format!(
                "Error uploading file: {}",
                reply
            )))
        }
    }

    /// Makes `remote_path` contain only the local file.
    ///
    /// Every listed entry whose name differs from the local basename
    /// (ignoring case) is deleted first, then the file is uploaded over
    /// whatever same-named copy remains. The first failure stops the run
    /// without undoing earlier deletes.
    pub async fn replace(&self, local_path: &str, remote_path: &str) -> Result<String, SyncError> {
        let request = TransferRequest::prepare(local_path, remote_path).await?;
        let data = request.read().await?;
        let directory = self.at(request.remote_directory());

        info!(local = %request.local_path.display(), %directory, "replace");
        let listing = self.client.list_directory(&directory).await?;

        for line in &listing {
            let entry = entry_name(line);
            if is_placeholder(entry) || same_name(entry, &request.file_name) {
                continue;
            }

            let target = directory.join(entry);
            let reply = self.client.delete(&target).await?;
            if reply.is_file_action_ok() || reply.is_file_unavailable() {
                info!(%target, code = reply.code, "removed foreign entry");
                continue;
            }

            warn!(%target, %reply, "replace aborted on delete");
            return Err(SyncError::RemoteTransferFailure(format!(
                "Error deleting file {}: {}",
                entry, reply
            )));
        }

        let target = directory.join(&request.file_name);
        let reply = self.client.upload(&target, &data).await?;
        if reply.is_transfer_complete() {
            Ok("File replaced successfully.".to_string())
        } else {
            warn!(%target, %reply, "replace upload rejected");
            Err(SyncError::RemoteTransferFailure(format!(
                "Error uploading file: {}",
                reply
            )))
        }
    }

    /// Deletes one remote file. An already-absent file is a failure here.
    pub async fn delete(&self, remote_path: &str) -> Result<String, SyncError> {
        if remote_path.is_empty() {
            return Err(SyncError::InvalidArgument(
                "Remote path is required.".to_string(),
            ));
        }
        check_remote_path(remote_path)?;

        let target = self.at(remote_path);
        info!(%target, "delete");
        let reply = self.client.delete(&target).await?;
        if reply.is_file_action_ok() {
            Ok("File deleted successfully.".to_string())
        } else {
            warn!(%target, %reply, "delete rejected");
            Err(SyncError::RemoteTransferFailure(format!(
                "Error deleting file: {}",
                reply
            )))
        }
    }
}

fn check_remote_path(remote_path: &str) -> Result<(), SyncError> {
    if has_line_break(remote_path) {
        return Err(SyncError::InvalidArgument(
            "Remote path must not contain line breaks.".to_string(),
        ));
    }
    Ok(())
}

// Some servers prefix NLST entries with the listed directory
fn entry_name(line: &str) -> &str {
    line.rsplit('/').next().unwrap_or(line)
}

fn is_placeholder(entry: &str) -> bool {
    entry.is_empty() || entry == "." || entry == ".."
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
