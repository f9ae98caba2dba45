//! Server and site configuration.
//!
//! Loaded from the YAML file named by `HUYGENS_CONFIG` when set, otherwise
//! from defaults. `LISTEN` always wins for the listen address.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connection::PollTimeouts;

const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// First poll for request bytes, in milliseconds.
    pub initial_poll_ms: u64,
    /// Second, longer poll while the peer stays silent.
    pub fallback_poll_ms: u64,
    /// Pause after a failed accept.
    pub accept_backoff_ms: u64,
    /// How long shutdown waits for active connections.
    pub drain_timeout_ms: u64,
    /// Buffered request-completed events per subscriber.
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN.to_string(),
            initial_poll_ms: 100,
            fallback_poll_ms: 30_000,
            accept_backoff_ms: 100,
            drain_timeout_ms: 10_000,
            event_capacity: 256,
        }
    }
}

impl ServerConfig {
    pub fn poll_timeouts(&self) -> PollTimeouts {
        // a zero read timeout is rejected by the socket
        PollTimeouts {
            initial: Duration::from_millis(self.initial_poll_ms.max(1)),
            fallback: Duration::from_millis(self.fallback_poll_ms.max(1)),
        }
    }

    pub fn accept_backoff(&self) -> Duration {
        Duration::from_millis(self.accept_backoff_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Where the application is mounted, e.g. `/` or `/app`.
    pub virtual_path: String,
    pub physical_path: PathBuf,
    pub client_script_path: String,
    /// Defaults to `aspnet_client` under `physical_path`.
    pub physical_client_script_path: Option<PathBuf>,
    pub directory_listing: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            virtual_path: "/".to_string(),
            physical_path: PathBuf::from("."),
            client_script_path: "/aspnet_client".to_string(),
            physical_client_script_path: None,
            directory_listing: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var_os("HUYGENS_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }
}
