use crate::error::ProxyError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

pub const DEFAULT_LISTEN_PORT: u16 = 3128;

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], DEFAULT_LISTEN_PORT))
}

fn default_max_header_size() -> usize {
    16384
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local address the bridge listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Upstream proxy URL, `scheme://[user[:pass]@]host[:port]`.
    /// When unset, the HTTPS_PROXY / HTTP_PROXY environment takes over.
    #[serde(default)]
    pub upstream_url: Option<String>,

    /// Upper bound on a request or response head, in bytes.
    #[serde(default = "default_max_header_size")]
    pub max_header_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            upstream_url: None,
            max_header_size: default_max_header_size(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ProxyError> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| ProxyError::Config(format!("invalid configuration file {}: {}", path, e)))
    }

    /// The upstream URL to use: explicit configuration wins, then
    /// HTTPS_PROXY, then HTTP_PROXY. Nothing configured is a fatal
    /// startup error.
    pub fn upstream_url(&self) -> Result<String, ProxyError> {
        select_upstream_url(
            self.upstream_url.clone(),
            std::env::var("HTTPS_PROXY").ok(),
            std::env::var("HTTP_PROXY").ok(),
        )
    }
}

fn select_upstream_url(
    configured: Option<String>,
    https_proxy: Option<String>,
    http_proxy: Option<String>,
) -> Result<String, ProxyError> {
    configured
        .into_iter()
        .chain(https_proxy)
        .chain(http_proxy)
        .find(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            ProxyError::Config(
                "no upstream proxy URL configured; pass --upstream or set HTTPS_PROXY/HTTP_PROXY"
                    .to_string(),
            )
        })
}
