use auth_bridge::{Config, ProxyServer};
use clap::Parser;
use log::info;
use std::net::SocketAddr;
use std::path::Path;
use tokio::signal;

#[derive(Parser)]
#[clap(
    version,
    about = "Local proxy bridge that injects Basic credentials for an authenticated upstream proxy"
)]
struct Args {
    #[clap(short, long, value_name = "ADDR", help = "Listen address (e.g., 127.0.0.1:3128)")]
    listen: Option<String>,

    #[clap(short, long, value_name = "PORT", help = "Listen port on 127.0.0.1 (ignored when --listen is set)")]
    port: Option<u16>,

    #[clap(
        short,
        long,
        value_name = "URL",
        help = "Upstream proxy URL (default: HTTPS_PROXY or HTTP_PROXY from the environment)"
    )]
    upstream: Option<String>,

    #[clap(short, long, value_name = "FILE", help = "Configuration file path")]
    config: Option<String>,

    #[clap(long, value_name = "BYTES", help = "Maximum HTTP header size in bytes")]
    max_header_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let server = ProxyServer::bind(&config).await?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            eprintln!("Server error: {}", e);
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
        result = server_handle => {
            if let Err(e) = result {
                eprintln!("Server task error: {}", e);
            }
        }
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if let Some(config_file) = &args.config {
        if !Path::new(config_file).exists() {
            return Err(format!("Configuration file not found: {}", config_file).into());
        }
        Config::from_file(config_file)?
    } else {
        Config::default()
    };

    if let Some(listen) = &args.listen {
        config.listen_addr = listen.parse::<SocketAddr>()?;
    } else if let Some(port) = args.port {
        config.listen_addr = SocketAddr::from(([127, 0, 0, 1], port));
    }

    if let Some(upstream) = &args.upstream {
        config.upstream_url = Some(upstream.clone());
    }

    if let Some(max_header_size) = args.max_header_size {
        config.max_header_size = max_header_size;
    }

    Ok(config)
}
