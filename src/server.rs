use crate::config::Config;
use crate::connection::ConnectionHandler;
use crate::error::ProxyError;
use crate::upstream::UpstreamTarget;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// The local listener plus the resolved upstream it bridges to.
pub struct ProxyServer {
    listener: TcpListener,
    upstream: Arc<UpstreamTarget>,
    max_header_size: usize,
}

impl ProxyServer {
    /// Resolves the upstream target and binds the local listener.
    /// Configuration problems surface here, before any client is accepted.
    pub async fn bind(config: &Config) -> Result<Self, ProxyError> {
        let upstream = UpstreamTarget::resolve(&config.upstream_url()?)?;

        info!("upstream proxy: {}", upstream.authority());
        info!(
            "upstream credentials: {}",
            if upstream.has_credentials() { "configured" } else { "none" }
        );

        let listener = TcpListener::bind(config.listen_addr).await?;

        Ok(Self {
            listener,
            upstream: Arc::new(upstream),
            max_header_size: config.max_header_size,
        })
    }

    /// The actually bound address; useful when the config asked for port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ProxyError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts clients forever, one task per connection. A failing
    /// connection is logged and forgotten; the loop itself never stops
    /// for a per-connection error.
    pub async fn run(self) -> Result<(), ProxyError> {
        info!("auth bridge listening on {}", self.listener.local_addr()?);

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("accept error: {}", e);
                    continue;
                }
            };

            debug!("accepted connection from {}", peer);
            let handler = ConnectionHandler::new(Arc::clone(&self.upstream), self.max_header_size);

            tokio::spawn(async move {
                if let Err(e) = handler.handle(stream).await {
                    warn!("connection from {}: {}", peer, e);
                }
            });
        }
    }
}
