//! Price Sync - ZIP/CSV price list service
//!
//! Serves `POST /api/v0/prices` (import) and `GET /api/v0/prices` (export)
//! on top of a SQLite database.

use clap::Parser;
use price_sync::config::DEFAULT_MAX_UPLOAD_MB;
use price_sync::{IdStrategy, ServiceConfig};
use std::path::PathBuf;

/// Price list import/export server backed by SQLite
#[derive(Parser, Debug)]
#[command(name = "price_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, env = "PRICE_SYNC_DATABASE", default_value_t = default_db_path())]
    database: String,

    /// Address to bind the HTTP server to
    #[arg(long, env = "PRICE_SYNC_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PRICE_SYNC_PORT", default_value_t = 8080)]
    port: u16,

    /// How rows get their primary key
    #[arg(long, env = "PRICE_SYNC_ID_STRATEGY", value_enum, default_value_t = IdStrategy::Generated)]
    id_strategy: IdStrategy,

    /// Maximum upload size in MiB
    #[arg(long, env = "PRICE_SYNC_MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    max_upload_mb: usize,
}

/// Returns the default database path: ~/.local/share/price_sync/prices.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("price_sync")
        .join("prices.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting price_sync...");
    log::info!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let config =
        ServiceConfig::new(db_path, args.id_strategy).with_max_upload_mb(args.max_upload_mb);

    if let Err(e) = price_sync::web::serve(config, &args.host, args.port).await {
        log::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
