use log::debug;
use tokio::io;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Pumps bytes in both directions between an established tunnel's two ends.
///
/// Whichever direction finishes first (EOF or error) takes the whole tunnel
/// down: both write halves are shut down, which unblocks the opposite
/// direction. Shutdown failures are logged and ignored; the peer may
/// already be gone.
pub async fn relay(client: TcpStream, upstream: TcpStream) {
    let (mut client_read, mut client_write) = client.into_split();
    let (mut upstream_read, mut upstream_write) = upstream.into_split();

    tokio::select! {
        result = io::copy(&mut client_read, &mut upstream_write) => {
            match result {
                Ok(bytes) => debug!("client -> upstream: {} bytes relayed", bytes),
                Err(e) => debug!("client -> upstream relay ended: {}", e),
            }
        }
        result = io::copy(&mut upstream_read, &mut client_write) => {
            match result {
                Ok(bytes) => debug!("upstream -> client: {} bytes relayed", bytes),
                Err(e) => debug!("upstream -> client relay ended: {}", e),
            }
        }
    }

    if let Err(e) = client_write.shutdown().await {
        debug!("client shutdown after relay: {}", e);
    }
    if let Err(e) = upstream_write.shutdown().await {
        debug!("upstream shutdown after relay: {}", e);
    }
}
