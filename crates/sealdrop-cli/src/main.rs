//! Sealdrop gateway server binary

use clap::Parser;
use sealdrop_cli::{run_server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sealdrop-server")]
#[command(about = "Gateway server for Sealdrop end-to-end encrypted file sharing")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "SEALDROP_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "PORT")]
    port: u16,

    /// API version string advertised to clients
    #[arg(long, default_value = "v1", env = "API_VERSION")]
    api_version: String,

    /// Enable debug logging
    #[arg(short, long, env = "SEALDROP_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sealdrop_cli={log_level},tower_http=debug").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting Sealdrop gateway on {}:{} (api {})",
        args.host,
        args.port,
        args.api_version
    );

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        api_version: args.api_version,
        ..Default::default()
    };

    run_server(config).await
}
