//! Application configuration for toma5.
//!
//! `AppConfig` represents `{data_dir}/config.toml`. Every field is defaulted so
//! an empty or partial file is valid.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// The fixed plant timezone every calendar day is computed in.
    pub fn timezone(&self) -> FixedOffset {
        self.schedule.timezone()
    }
}

/// Daily sweep timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Offset from UTC in minutes. No DST is applied.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Local wall-clock time of the daily sweep, `HH:MM`.
    #[serde(default = "default_sweep_at")]
    pub sweep_at: String,

    /// Run one sweep at boot to apply a sweep missed while the process was down.
    #[serde(default = "default_true")]
    pub catch_up_on_start: bool,
}

fn default_utc_offset_minutes() -> i32 {
    -300
}

fn default_timezone() -> FixedOffset {
    FixedOffset::east_opt(default_utc_offset_minutes() * 60).unwrap_or(Utc.fix())
}

fn default_sweep_at() -> String {
    "00:00".to_string()
}

fn default_true() -> bool {
    true
}

impl ScheduleConfig {
    /// The configured offset, rejected unless strictly within ±24h.
    pub fn utc_offset(&self) -> Result<FixedOffset, String> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                format!(
                    "utc_offset_minutes {} is outside -1439..=1439",
                    self.utc_offset_minutes
                )
            })
    }

    /// The plant timezone. An unusable offset yields the default plant
    /// offset; config loading resets and reports it before anything reads it.
    pub fn timezone(&self) -> FixedOffset {
        self.utc_offset().unwrap_or_else(|_| default_timezone())
    }

    /// Parse `sweep_at` into `(hour, minute)`.
    pub fn sweep_time(&self) -> Result<(u32, u32), String> {
        parse_hh_mm(&self.sweep_at)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
            sweep_at: default_sweep_at(),
            catch_up_on_start: true,
        }
    }
}

/// Parse a `HH:MM` wall-clock time.
pub fn parse_hh_mm(value: &str) -> Result<(u32, u32), String> {
    let (hour, minute) = value
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("invalid time '{value}': expected HH:MM"))?;
    let hour: u32 = hour
        .parse()
        .map_err(|_| format!("invalid hour in '{value}'"))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| format!("invalid minute in '{value}'"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("time '{value}' out of range"));
    }
    Ok((hour, minute))
}

/// Notification retention and live-channel sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Read notifications older than this many days are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Queue depth per live connection.
    #[serde(default = "default_live_buffer")]
    pub live_buffer: usize,
}

fn default_retention_days() -> u32 {
    30
}

fn default_live_buffer() -> usize {
    64
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            live_buffer: default_live_buffer(),
        }
    }
}

/// Evidence image storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory blobs are written to. Defaults to `{data_dir}/blobs`.
    #[serde(default)]
    pub blob_dir: Option<PathBuf>,

    /// URL prefix under which stored blobs are served.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_public_base_url() -> String {
    "/media".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_dir: None,
            public_base_url: default_public_base_url(),
        }
    }
}

/// HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
