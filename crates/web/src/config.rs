//! Server configuration
//!
//! Read from the environment only; there is no config file.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use notably_common::{Error, Result};

/// Default TCP port when `PORT` is unset
pub const DEFAULT_PORT: u16 = 4000;

/// Static root shipped with the crate
pub static DEFAULT_STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Web server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    /// Bind address
    pub host: IpAddr,

    /// TCP port
    pub port: u16,

    /// Directory served as the site root
    pub static_dir: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

impl WebConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// - `PORT` (or lowercase `port`): listen port, default 4000
    /// - `NOTABLY_WEB_HOST`: bind address, default 127.0.0.1
    /// - `NOTABLY_STATIC_DIR`: static root, default the crate's `static/`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| {
            lookup(key).and_then(|v| {
                let v = v.trim().to_string();
                if v.is_empty() { None } else { Some(v) }
            })
        };

        let mut cfg = Self::default();

        if let Some(port) = non_empty("PORT").or_else(|| non_empty("port")) {
            cfg.port = port
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("PORT must be a TCP port, got {:?}", port)))?;
        }

        if let Some(host) = non_empty("NOTABLY_WEB_HOST") {
            cfg.host = host.parse().map_err(|_| {
                Error::InvalidConfig(format!("NOTABLY_WEB_HOST must be an IP address, got {:?}", host))
            })?;
        }

        if let Some(dir) = non_empty("NOTABLY_STATIC_DIR") {
            cfg.static_dir = PathBuf::from(dir);
        }

        Ok(cfg)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
