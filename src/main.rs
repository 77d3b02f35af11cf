use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use pgfront::config::{DEFAULT_HOST, DEFAULT_PORT, ServerConfig};
use pgfront::server::Server;

/// Minimal PostgreSQL wire protocol front end.
///
/// Completes the startup handshake for any client and acknowledges every
/// message with `SET`. No authentication, no query execution.
#[derive(Debug, Parser)]
#[command(name = "pgfront", version, about)]
struct Args {
    /// Host to listen on
    #[arg(long, env = "PGFRONT_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PGFRONT_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = ServerConfig::new(args.host, args.port);

    // A bind failure ends the process; nothing is ever served.
    let server = Server::bind(&config).await?;
    server.serve().await;

    Ok(())
}
