use crate::config::{RemoteEndpoint, RemoteUri};
use crate::error::{SyncError, TransferError};
use crate::protocol::{self, Reply, code};
use crate::remote::RemoteTransferClient;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

const LIST_CONTEXT: &str = "Error listing files in directory";
const UPLOAD_CONTEXT: &str = "Error uploading file";
const DELETE_CONTEXT: &str = "Error deleting file";

/// FTP implementation of [`RemoteTransferClient`].
///
/// Every call opens its own control connection, logs in, runs one
/// command in passive binary mode and quits.
pub struct FtpClient {
    endpoint: RemoteEndpoint,
}

impl FtpClient {
    pub fn new(endpoint: RemoteEndpoint) -> Self {
        Self { endpoint }
    }

    async fn try_upload(&self, target: &RemoteUri, data: &[u8]) -> Result<Reply, TransferError> {
        let mut session = Session::open(target, &self.endpoint).await?;
        let reply = session.store(&target.path, data).await?;
        session.quit().await;
        Ok(reply)
    }

    async fn try_delete(&self, target: &RemoteUri) -> Result<Reply, TransferError> {
        let mut session = Session::open(target, &self.endpoint).await?;
        let reply = session.send("DELE", Some(&target.path)).await?;
        session.quit().await;
        Ok(reply)
    }

    async fn try_list(&self, directory: &RemoteUri) -> Result<Vec<String>, TransferError> {
        let mut session = Session::open(directory, &self.endpoint).await?;
        let arg = (!directory.path.is_empty()).then_some(directory.path.as_str());
        let names = session.name_list(arg).await?;
        session.quit().await;
        Ok(names)
    }
}

#[async_trait]
impl RemoteTransferClient for FtpClient {
    async fn upload(&self, target: &RemoteUri, data: &[u8]) -> Result<Reply, SyncError> {
        debug!(%target, bytes = data.len(), "STOR");
        self.try_upload(target, data)
            .await
            .map_err(|e| SyncError::transport(UPLOAD_CONTEXT, e))
    }

    async fn delete(&self, target: &RemoteUri) -> Result<Reply, SyncError> {
        debug!(%target, "DELE");
        self.try_delete(target)
            .await
            .map_err(|e| SyncError::transport(DELETE_CONTEXT, e))
    }

    async fn list_directory(&self, directory: &RemoteUri) -> Result<Vec<String>, SyncError> {
        debug!(%directory, "NLST");
        self.try_list(directory)
            .await
            .map_err(|e| SyncError::transport(LIST_CONTEXT, e))
    }
}

/// One logged-in control connection.
struct Session {
    control: BufReader<TcpStream>,
    peer: IpAddr,
}

impl Session {
    async fn open(target: &RemoteUri, endpoint: &RemoteEndpoint) -> Result<Self, TransferError> {
        let addr = format!("{}:{}", target.host, target.port);
        let socket = TcpStream::connect(&addr).await?;
        socket.set_nodelay(true)?;
        let peer = socket.peer_addr()?.ip();

        let mut session = Session {
            control: BufReader::new(socket),
            peer,
        };

        let greeting = session.read_reply().await?;
        if greeting.code != code::SERVICE_READY {
            return Err(greeting.into_unexpected());
        }
        session.login(&endpoint.username, &endpoint.password).await?;
        session.expect("TYPE", Some("I"), code::COMMAND_OK).await?;
        Ok(session)
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<(), TransferError> {
        let reply = self.send("USER", Some(username)).await?;
        if reply.code == code::LOGGED_IN {
            return Ok(());
        }
        if !reply.is_intermediate() {
            return Err(reply.into_unexpected());
        }

        let reply = self.send("PASS", Some(password)).await?;
        if reply.is_completion() {
            Ok(())
        } else {
            Err(reply.into_unexpected())
        }
    }

    async fn send(&mut self, verb: &str, arg: Option<&str>) -> Result<Reply, TransferError> {
        let line = protocol::command(verb, arg)?;
        self.control.get_mut().write_all(line.as_bytes()).await?;
        self.read_reply().await
    }

    async fn expect(
        &mut self,
        verb: &str,
        arg: Option<&str>,
        expected: u16,
    ) -> Result<Reply, TransferError> {
        let reply = self.send(verb, arg).await?;
        if reply.code != expected {
            return Err(reply.into_unexpected());
        }
        Ok(reply)
    }

    async fn read_reply(&mut self) -> Result<Reply, TransferError> {
        protocol::read_reply(&mut self.control).await
    }

    async fn open_data(&mut self) -> Result<TcpStream, TransferError> {
        let reply = self.expect("PASV", None, code::ENTERING_PASSIVE).await?;
        let advertised = protocol::parse_pasv(&reply.text)?;

        // 0.0.0.0 means "same host as the control connection"
        let ip = if advertised.ip().is_unspecified() {
            self.peer
        } else {
            IpAddr::V4(*advertised.ip())
        };
        let stream = TcpStream::connect(SocketAddr::new(ip, advertised.port())).await?;
        Ok(stream)
    }

    /// Runs STOR and returns the final reply. A rejected STOR returns the
    /// rejection itself.
    async fn store(&mut self, path: &str, data: &[u8]) -> Result<Reply, TransferError> {
        let mut data_stream = self.open_data().await?;
        let reply = self.send("STOR", Some(path)).await?;
        if !reply.is_preliminary() {
            return Ok(reply);
        }

        data_stream.write_all(data).await?;
        data_stream.flush().await?;
        data_stream.shutdown().await?;
        drop(data_stream);

        self.read_reply().await
    }

    async fn name_list(&mut self, path: Option<&str>) -> Result<Vec<String>, TransferError> {
        let mut data_stream = self.open_data().await?;
        let reply = self.send("NLST", path).await?;
        if !reply.is_preliminary() {
            return Err(reply.into_unexpected());
        }

        let mut buf = Vec::new();
        data_stream.read_to_end(&mut buf).await?;
        drop(data_stream);

        let done = self.read_reply().await?;
        if !done.is_completion() {
            return Err(done.into_unexpected());
        }
        Ok(protocol::parse_name_list(&buf))
    }

    async fn quit(mut self) {
        // The command already has its answer; a failed QUIT changes nothing
        if let Err(e) = self.send("QUIT", None).await {
            debug!("QUIT failed: {}", e);
        }
    }
}
