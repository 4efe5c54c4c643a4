//! Cotion page server
//!
//! Serves the page tree over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin cotion-server
//!
//! # Custom port and database
//! PORT=8080 COTION_DATABASE_PATH=/var/lib/cotion/pages.db cargo run --bin cotion-server
//! ```
//!
//! # Environment Variables
//!
//! - `COTION_DATABASE_PATH`: Database file (default: ./data/cotion.db)
//! - `PORT`: Server port (default: 3000)
//! - `CORS_ORIGIN`: Allowed browser origin (default: http://localhost:5173)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "cotion_core=trace")

use std::sync::Arc;

use anyhow::Context;
use cotion_core::{AppConfig, DatabaseService, PageService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    tracing::info!("Cotion page server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {}", config.database_path.display());

    let db = Arc::new(
        DatabaseService::new(config.database_path.clone())
            .await
            .context("Failed to open database")?,
    );
    let pages = PageService::new(db.clone());

    let result = cotion_core::http::serve(&config, pages).await;

    if let Err(e) = db.db_close().await {
        tracing::warn!("Failed to checkpoint database on shutdown: {}", e);
    }
    result
}
