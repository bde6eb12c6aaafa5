//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

/// Ensure the data and upload directories exist.
pub async fn ensure_env(data_dir: &str, uploads_dir: &str) -> anyhow::Result<()> {
    for dir in [data_dir, uploads_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {dir}: {e}"))?;
    }
    Ok(())
}
