use crate::auth::basic_auth_header;
use crate::error::ProxyError;
use crate::relay;
use crate::rewrite::{find_head_end, ProxyRequest};
use crate::upstream::UpstreamTarget;
use bytes::BytesMut;
use log::{debug, info};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const READ_CHUNK_SIZE: usize = 4096;

/// Drives one accepted client connection through its whole lifecycle:
/// read the request head, rewrite the credential header, negotiate with
/// the upstream proxy, and either stream the response back (plain
/// forwarding) or hand both sockets to the bidirectional relay (CONNECT).
pub struct ConnectionHandler {
    upstream: Arc<UpstreamTarget>,
    max_header_size: usize,
}

impl ConnectionHandler {
    pub fn new(upstream: Arc<UpstreamTarget>, max_header_size: usize) -> Self {
        Self {
            upstream,
            max_header_size,
        }
    }

    pub async fn handle(&self, mut client: TcpStream) -> Result<(), ProxyError> {
        let request = self.read_request_head(&mut client).await?;

        let authority = self.upstream.authority();
        let mut upstream = TcpStream::connect(&authority).await.map_err(|e| {
            ProxyError::UpstreamDial(format!("cannot reach upstream proxy {}: {}", authority, e))
        })?;

        let auth = basic_auth_header(
            self.upstream.username.as_deref(),
            self.upstream.password.as_deref(),
        );
        let rewritten = request.rewrite(auth.as_deref());

        upstream.write_all(&rewritten).await?;
        upstream.flush().await?;

        if request.is_connect {
            debug!("forwarding CONNECT: {}", request.request_line);
            self.establish_tunnel(client, upstream).await
        } else {
            debug!("forwarding request: {}", request.request_line);
            self.forward_response(client, upstream).await
        }
    }

    /// Accumulates client bytes until the head terminator shows up.
    /// A client that closes first, or overruns the header budget, gets
    /// nothing forwarded.
    async fn read_request_head(&self, client: &mut TcpStream) -> Result<ProxyRequest, ProxyError> {
        let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);

        while find_head_end(&buf).is_none() {
            if buf.len() > self.max_header_size {
                return Err(ProxyError::ClientProtocol(format!(
                    "request head exceeds {} bytes",
                    self.max_header_size
                )));
            }
            let n = client.read_buf(&mut buf).await?;
            if n == 0 {
                return Err(ProxyError::ClientProtocol(
                    "client closed before end of request head".to_string(),
                ));
            }
        }

        ProxyRequest::parse(&buf)
    }

    /// CONNECT path: relay the upstream's response head to the client
    /// verbatim, then run the tunnel only if the upstream said 200.
    async fn establish_tunnel(
        &self,
        mut client: TcpStream,
        mut upstream: TcpStream,
    ) -> Result<(), ProxyError> {
        let response = self.read_response_head(&mut upstream).await?;

        client.write_all(&response).await?;
        client.flush().await?;

        match status_code(&response) {
            Some(200) => {
                relay::relay(client, upstream).await;
                debug!("tunnel closed");
                Ok(())
            }
            status => {
                info!(
                    "upstream refused CONNECT (status {})",
                    status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
                );
                shutdown_quietly(&mut client, "client").await;
                shutdown_quietly(&mut upstream, "upstream").await;
                Ok(())
            }
        }
    }

    /// Plain path: the request is already on the wire; stream the whole
    /// upstream response through until the upstream closes.
    async fn forward_response(
        &self,
        mut client: TcpStream,
        mut upstream: TcpStream,
    ) -> Result<(), ProxyError> {
        let bytes = tokio::io::copy(&mut upstream, &mut client)
            .await
            .map_err(|e| ProxyError::Relay(format!("streaming response failed: {}", e)))?;
        debug!("response streamed: {} bytes", bytes);

        shutdown_quietly(&mut client, "client").await;
        shutdown_quietly(&mut upstream, "upstream").await;
        Ok(())
    }

    /// Reads the upstream's response up to (at least) its head terminator.
    /// Any bytes past the terminator already in the buffer belong to the
    /// response body or tunnel and are forwarded with the head.
    async fn read_response_head(&self, upstream: &mut TcpStream) -> Result<Vec<u8>, ProxyError> {
        let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);

        while find_head_end(&buf).is_none() {
            if buf.len() > self.max_header_size {
                return Err(ProxyError::UpstreamProtocol(format!(
                    "response head exceeds {} bytes",
                    self.max_header_size
                )));
            }
            let n = upstream.read_buf(&mut buf).await?;
            if n == 0 {
                return Err(ProxyError::UpstreamProtocol(
                    "upstream closed before end of response head".to_string(),
                ));
            }
        }

        Ok(buf.to_vec())
    }
}

/// Extracts the numeric status code field from a response head.
///
/// Only the second whitespace-separated field of the status line counts;
/// a "200" appearing elsewhere in the line does not establish a tunnel.
fn status_code(response_head: &[u8]) -> Option<u16> {
    let line_end = response_head
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(response_head.len());
    let status_line = String::from_utf8_lossy(&response_head[..line_end]);
    status_line.split_whitespace().nth(1)?.parse().ok()
}

async fn shutdown_quietly(stream: &mut TcpStream, label: &str) {
    if let Err(e) = stream.shutdown().await {
        debug!("closing {} socket: {}", label, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_established() {
        assert_eq!(
            status_code(b"HTTP/1.1 200 Connection Established\r\n\r\n"),
            Some(200)
        );
    }

    #[test]
    fn test_status_code_rejected() {
        assert_eq!(
            status_code(b"HTTP/1.1 407 Proxy Authentication Required\r\nProxy-Authenticate: Basic\r\n\r\n"),
            Some(407)
        );
    }

    #[test]
    fn test_status_code_ignores_200_elsewhere_in_line() {
        assert_eq!(status_code(b"HTTP/1.1 502 Bad Gateway 200\r\n\r\n"), Some(502));
    }

    #[test]
    fn test_status_code_malformed_line() {
        assert_eq!(status_code(b"garbage\r\n\r\n"), None);
        assert_eq!(status_code(b"HTTP/1.1 abc OK\r\n\r\n"), None);
        assert_eq!(status_code(b""), None);
    }
}
