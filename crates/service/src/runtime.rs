//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so binaries can prepare directories
//! through `service::runtime::ensure_env` without depending on `common`.

/// Ensure the data and upload directories exist.
pub async fn ensure_env(data_dir: &str, uploads_dir: &str) -> anyhow::Result<()> {
    common::env::ensure_env(data_dir, uploads_dir).await
}
