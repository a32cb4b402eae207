use ftpsync::RemoteEndpoint;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};

pub const USERNAME: &str = "user";
pub const PASSWORD: &str = "pass";

/// What the fake server holds and has seen.
#[derive(Default)]
pub struct ServerState {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeSet<String>,
    pub commands: Vec<String>,
    /// Reply sent for every STOR instead of accepting data.
    pub stor_rejection: Option<(u16, String)>,
    /// One-shot replies for DELE of a given path.
    pub dele_overrides: HashMap<String, (u16, String)>,
    /// Prefix NLST entries with the listed directory.
    pub nlst_with_paths: bool,
    pub connections: usize,
}

/// Minimal passive-mode FTP server on 127.0.0.1.
pub struct FakeFtpServer {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<ServerState>>,
}

impl FakeFtpServer {
    pub async fn start(files: &[(&str, &str)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake ftp server");
        let addr = listener.local_addr().expect("local addr");

        let mut state = ServerState::default();
        for (path, data) in files {
            state.files.insert(path.to_string(), data.as_bytes().to_vec());
            if let Some((dir, _)) = path.rsplit_once('/') {
                state.dirs.insert(dir.to_string());
            }
        }
        let state = Arc::new(Mutex::new(state));

        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let shared = shared.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(socket, shared).await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn endpoint(&self) -> RemoteEndpoint {
        RemoteEndpoint::new(
            &format!("ftp://127.0.0.1:{}", self.addr.port()),
            USERNAME,
            PASSWORD,
        )
    }

    pub fn add_dir(&self, dir: &str) {
        self.state.lock().unwrap().dirs.insert(dir.to_string());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.state.lock().unwrap().files.keys().cloned().collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }
}

async fn reply(writer: &mut OwnedWriteHalf, code: u16, text: &str) -> io::Result<()> {
    writer
        .write_all(format!("{} {}\r\n", code, text).as_bytes())
        .await
}

async fn handle_connection(socket: TcpStream, state: Arc<Mutex<ServerState>>) -> io::Result<()> {
    state.lock().unwrap().connections += 1;

    let (read_half, mut writer) = socket.into_split();
    let mut lines = BufReader::new(read_half).lines();
    writer
        .write_all(b"220-fake ftp\r\n220 Service ready\r\n")
        .await?;

    let mut user: Option<String> = None;
    let mut logged_in = false;
    let mut passive: Option<TcpListener> = None;

    while let Some(line) = lines.next_line().await? {
        let (verb, arg) = match line.split_once(' ') {
            Some((verb, arg)) => (verb.to_uppercase(), arg.to_string()),
            None => (line.to_uppercase(), String::new()),
        };
        state.lock().unwrap().commands.push(verb.clone());

        if !logged_in && !matches!(verb.as_str(), "USER" | "PASS" | "QUIT") {
            reply(&mut writer, 530, "Please login with USER and PASS.").await?;
            continue;
        }

        match verb.as_str() {
            "USER" => {
                user = Some(arg);
                reply(&mut writer, 331, "Please specify the password.").await?;
            }
            "PASS" => {
                if user.as_deref() == Some(USERNAME) && arg == PASSWORD {
                    logged_in = true;
                    reply(&mut writer, 230, "Login successful.").await?;
                } else {
                    reply(&mut writer, 530, "Login incorrect.").await?;
                }
            }
            "TYPE" => reply(&mut writer, 200, "Switching to Binary mode.").await?,
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                let text = format!(
                    "Entering Passive Mode (127,0,0,1,{},{}).",
                    port >> 8,
                    port & 0xff
                );
                passive = Some(listener);
                reply(&mut writer, 227, &text).await?;
            }
            "STOR" => {
                let listener = passive.take();
                let rejection = state.lock().unwrap().stor_rejection.clone();
                if let Some((code, text)) = rejection {
                    reply(&mut writer, code, &text).await?;
                    continue;
                }
                let Some(listener) = listener else {
                    reply(&mut writer, 425, "Use PORT or PASV first.").await?;
                    continue;
                };
                reply(&mut writer, 150, "Ok to send data.").await?;
                let (mut data, _) = listener.accept().await?;
                let mut buf = Vec::new();
                data.read_to_end(&mut buf).await?;
                state.lock().unwrap().files.insert(arg, buf);
                reply(&mut writer, 226, "Transfer complete.").await?;
            }
            "NLST" => {
                let Some(listener) = passive.take() else {
                    reply(&mut writer, 425, "Use PORT or PASV first.").await?;
                    continue;
                };
                let listing = {
                    let state = state.lock().unwrap();
                    if arg.is_empty() || state.dirs.contains(&arg) {
                        Some(list_directory(&state, &arg))
                    } else {
                        None
                    }
                };
                let Some(listing) = listing else {
                    reply(&mut writer, 550, "Failed to open directory.").await?;
                    continue;
                };
                reply(&mut writer, 150, "Here comes the directory listing.").await?;
                let (mut data, _) = listener.accept().await?;
                data.write_all(listing.as_bytes()).await?;
                data.shutdown().await?;
                drop(data);
                reply(&mut writer, 226, "Directory send OK.").await?;
            }
            "DELE" => {
                let (code, text) = {
                    let mut state = state.lock().unwrap();
                    if let Some(overridden) = state.dele_overrides.remove(&arg) {
                        overridden
                    } else if state.files.remove(&arg).is_some() {
                        (250, "Delete operation successful.".to_string())
                    } else {
                        (550, "Delete operation failed.".to_string())
                    }
                };
                reply(&mut writer, code, &text).await?;
            }
            "QUIT" => {
                reply(&mut writer, 221, "Goodbye.").await?;
                break;
            }
            _ => reply(&mut writer, 502, "Command not implemented.").await?,
        }
    }
    Ok(())
}

fn list_directory(state: &ServerState, dir: &str) -> String {
    let mut out = String::new();
    for path in state.files.keys() {
        let (parent, name) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
        if parent != dir {
            continue;
        }
        if state.nlst_with_paths && !dir.is_empty() {
            out.push_str(&format!("{}/{}\r\n", dir, name));
        } else {
            out.push_str(&format!("{}\r\n", name));
        }
    }
    out
}
