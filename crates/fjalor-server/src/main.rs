//! Fjalor Server
//!
//! Serves the entries API that cloud-mode clients sync with.
//!
//! Usage:
//!   fjalor-server --bind 0.0.0.0:3000 --database fjalor.db

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fjalor_server::{build_router, AppState, Database, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "fjalor-server")]
#[command(about = "HTTP API for Fjalor cloud mode")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "FJALOR_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "fjalor.db")]
    database: PathBuf,

    /// Passphrase required for writes (unset allows all writes)
    #[arg(long, env = "API_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Allowed CORS origin
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = "*")]
    allowed_origin: String,

    /// Largest accepted request body in bytes
    #[arg(long, env = "FJALOR_MAX_BODY_BYTES", default_value_t = fjalor_server::MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FJALOR_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new(format!(
        "fjalor_server={},fjalor_core={}",
        args.log_level, args.log_level
    ));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();

    let db = Database::open(&args.database)
        .with_context(|| format!("Failed to open database {:?}", args.database))?;
    info!(
        "Opened {:?} ({} entries)",
        args.database,
        db.count().unwrap_or_default()
    );

    let config = ServerConfig {
        passphrase: args.passphrase,
        allowed_origin: args.allowed_origin,
        max_body_bytes: args.max_body_bytes,
    };
    if config.passphrase.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        info!("No passphrase configured; writes are open");
    }

    let app = build_router(AppState::new(db, config));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("Listening on http://{}", args.bind);

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
