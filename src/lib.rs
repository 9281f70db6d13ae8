pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod relay;
pub mod rewrite;
pub mod server;
pub mod upstream;

pub use config::Config;
pub use error::ProxyError;
pub use server::ProxyServer;
pub use upstream::UpstreamTarget;
