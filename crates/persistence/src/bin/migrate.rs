#![deny(warnings)]

use persistence::{default_sqlite_url, init_db};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    // Ensure directory exists
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"));
    if let Some(path) = path.filter(|p| !p.starts_with(":memory:")) {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let pool = init_db(&url).await?;
    pool.close().await;
    tracing::info!(%url, "database migrated");
    Ok(())
}
