//! Configuration schema, defaults, and layered loading.
//!
//! Precedence: defaults < config file < environment
use anyhow::{Context, Result, ensure};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "ftpsync.toml";
const ENV_PREFIX: &str = "FTPSYNC_";
const DEFAULT_FTP_PORT: u16 = 21;

/// Credentials and address of the single FTP server every call talks to.
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub address: String,
    pub username: String,
    pub password: String,
}

// Keep the password out of logs
impl fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for RemoteEndpoint {
    fn default() -> Self {
        Self {
            address: "ftp://localhost".to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    }
}

impl RemoteEndpoint {
    pub fn new(address: &str, username: &str, password: &str) -> Self {
        Self {
            address: address.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Host and port of the control connection.
    pub fn authority(&self) -> Result<(String, u16)> {
        let url = Url::parse(&self.address)
            .with_context(|| format!("Invalid endpoint address: {}", self.address))?;
        ensure!(
            url.scheme() == "ftp",
            "Invalid endpoint address: scheme must be ftp, got {}",
            url.scheme()
        );
        let host = url
            .host_str()
            .with_context(|| format!("Invalid endpoint address: no host in {}", self.address))?;
        // Targets resolve against the login directory
        ensure!(
            matches!(url.path(), "" | "/"),
            "Invalid endpoint address: path not supported, got {}",
            url.path()
        );
        let port = url.port().unwrap_or(DEFAULT_FTP_PORT);
        Ok((host.to_string(), port))
    }

    /// Resolves a server-relative path against this endpoint.
    pub fn resolve(&self, path: &str) -> Result<RemoteUri> {
        let (host, port) = self.authority()?;
        Ok(RemoteUri {
            host,
            port,
            path: path.trim_start_matches('/').to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.authority()?;
        ensure!(
            !self.username.is_empty(),
            "Invalid config: endpoint.username must not be empty"
        );
        Ok(())
    }
}

/// One fully resolved remote target, relative to the login directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUri {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl RemoteUri {
    /// Same endpoint, child entry of this path.
    pub fn join(&self, name: &str) -> RemoteUri {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.path, name)
        };
        RemoteUri {
            host: self.host.clone(),
            port: self.port,
            path,
        }
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ftp://{}:{}/{}", self.host, self.port, self.path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Fully resolved application configuration after all layers merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: RemoteEndpoint,
    pub server: ServerSettings,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.endpoint.validate()?;
        ensure!(
            !self.server.bind.is_empty(),
            "Invalid config: server.bind must not be empty"
        );
        Ok(())
    }
}

/// Loads config from defaults/file/env.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let config: AppConfig = figment(path)
        .extract()
        .context("Failed to load configuration")?;

    config.validate()?;

    Ok(config)
}

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}
