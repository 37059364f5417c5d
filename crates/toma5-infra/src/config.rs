//! Configuration loader for toma5.
//!
//! Reads `config.toml` from the data directory (`~/.toma5/` by default) and
//! deserializes it into [`AppConfig`]. Falls back to defaults when the file is
//! missing or malformed.

use std::path::{Path, PathBuf};

use toma5_types::config::AppConfig;

/// Resolve the data directory: `TOMA5_DATA_DIR`, else `~/.toma5`.
pub fn data_dir() -> PathBuf {
    match std::env::var("TOMA5_DATA_DIR") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".toma5")
        }
    }
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`AppConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
/// - An unusable `sweep_at` or `utc_offset_minutes` is reset to the default
///   with a warning.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    let mut config = match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            return AppConfig::default();
        }
    };

    if let Err(err) = config.schedule.sweep_time() {
        tracing::warn!("Ignoring schedule.sweep_at: {err}");
        config.schedule.sweep_at = AppConfig::default().schedule.sweep_at;
    }
    if let Err(err) = config.schedule.utc_offset() {
        tracing::warn!("Ignoring schedule.utc_offset_minutes: {err}");
        config.schedule.utc_offset_minutes = AppConfig::default().schedule.utc_offset_minutes;
    }
    config
}

/// Directory evidence images are written to.
pub fn blob_dir(config: &AppConfig, data_dir: &Path) -> PathBuf {
    config
        .storage
        .blob_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("blobs"))
}
