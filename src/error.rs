use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client protocol error: {0}")]
    ClientProtocol(String),

    #[error("Upstream dial error: {0}")]
    UpstreamDial(String),

    #[error("Upstream protocol error: {0}")]
    UpstreamProtocol(String),

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}
