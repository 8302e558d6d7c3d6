//! Slotboard Server
//!
//! `slotboard-server [serve]` runs the WebSocket server.
//! `slotboard-server inspect [PATH]` prints the stored grid without modifying it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use slotboard::{
    network::{AuthConfig, ServerConfig},
    store::{inspect_path, resolve_db_path, write_report, SqliteStore},
    AccessGuard, GridHub, GridServer, GridService, VERSION,
};

const DEFAULT_DB_PATH: &str = "data.sqlite";
const DEFAULT_DB_FALLBACK_PATH: &str = "../data.sqlite";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None | Some("serve") => serve().await,
        Some("inspect") => inspect(args.next().map(PathBuf::from)),
        Some(other) => bail!("unknown command {other:?} (expected `serve` or `inspect`)"),
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var_os(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

async fn serve() -> anyhow::Result<()> {
    info!("Slotboard Server v{}", VERSION);

    let db_path = resolve_db_path(
        &env_path("DB_PATH", DEFAULT_DB_PATH),
        &env_path("DB_FALLBACK_PATH", DEFAULT_DB_FALLBACK_PATH),
    )
    .context("resolving database path")?;
    info!("Using database {}", db_path.display());

    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;
    let service = GridService::load(Arc::new(store)).context("loading grid state")?;

    let auth = AuthConfig::from_env();
    if auth.uses_defaults() {
        warn!("Admin credentials or signing key are the built-in defaults; set ADMIN_USER, ADMIN_PASS and AUTH_SECRET");
    }
    let hub = Arc::new(GridHub::new(service, AccessGuard::new(auth)));

    let server = Arc::new(GridServer::new(ServerConfig::from_env(), hub));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            signal_server.shutdown();
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}

fn inspect(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(|| {
        inspect_path(
            &env_path("DB_PATH", DEFAULT_DB_PATH),
            &env_path("DB_FALLBACK_PATH", DEFAULT_DB_FALLBACK_PATH),
        )
    });

    let stdout = std::io::stdout();
    write_report(&path, &mut stdout.lock())
        .with_context(|| format!("inspecting {}", path.display()))
}
