//! Process-wide settings
//!
//! Settings are assembled once at startup and are read-only afterwards.
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `config.yaml` (optional; keeps the `telegram.token` / `yandex.token` layout)
//! 3. `MEDIADROP_`-prefixed environment variables, `__` separating sections
//!    (e.g. `MEDIADROP_CLEANUP__RETENTION_SECS=172800`)
//! 4. Bare `BOT_TOKEN` / `TELOXIDE_TOKEN` / `YANDEX_TOKEN` variables

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Yandex Disk resources endpoint
pub const DEFAULT_STORAGE_API_BASE: &str = "https://cloud-api.yandex.net/v1/disk/resources";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "MEDIADROP_";

/// Files above this size (50 MiB) go to remote storage instead of the chat
pub const DEFAULT_INLINE_THRESHOLD_BYTES: u64 = 50 * 1024 * 1024;

/// Log file used when `LOG_FILE_PATH` is not set
pub const DEFAULT_LOG_FILE_PATH: &str = "app.log";

/// Log file path, read from `LOG_FILE_PATH`.
///
/// Read straight from the environment: the logger starts before settings load.
pub fn log_file_path() -> String {
    std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE_PATH.to_string())
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for HTTP requests (in seconds)
    /// Large enough for multi-gigabyte PUTs to remote storage
    pub const REQUEST_TIMEOUT_SECS: u64 = 900; // 15 minutes

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub yandex: YandexSettings,
    pub download: DownloadSettings,
    pub delivery: DeliverySettings,
    pub cleanup: CleanupSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub token: String,
    /// Custom Bot API server, e.g. a local `telegram-bot-api` instance
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YandexSettings {
    /// OAuth token sent as `Authorization: OAuth <token>`
    pub token: String,
    pub api_base: String,
    /// Remote directory every upload lands in
    pub remote_dir: String,
}

impl Default for YandexSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: DEFAULT_STORAGE_API_BASE.to_string(),
            remote_dir: "test".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Working directory shared by jobs and the cleanup sweep. Supports `~`.
    pub dir: String,
    pub ytdl_bin: String,
    /// Hard deadline for one yt-dlp run
    pub deadline_secs: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            dir: "downloads".to_string(),
            ytdl_bin: "yt-dlp".to_string(),
            deadline_secs: 600, // 10 minutes
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    pub inline_threshold_bytes: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            inline_threshold_bytes: DEFAULT_INLINE_THRESHOLD_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSettings {
    /// Minimum file age before the sweep may delete it
    pub retention_secs: u64,
    pub interval_secs: u64,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            retention_secs: 24 * 60 * 60,
            interval_secs: 60 * 60,
        }
    }
}

impl Settings {
    /// Builds the provider chain without extracting it.
    pub fn figment(config_path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Yaml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&["TELOXIDE_TOKEN", "BOT_TOKEN"])
                    .map(|_| "telegram.token".into()),
            )
            .merge(Env::raw().only(&["YANDEX_TOKEN"]).map(|_| "yandex.token".into()))
    }

    /// Loads settings from defaults, the YAML file (if present) and the environment.
    pub fn load(config_path: &Path) -> AppResult<Self> {
        Self::figment(config_path)
            .extract()
            .map_err(|e| AppError::Config(Box::new(e)))
    }

    /// Checks values that would make the pipeline misbehave.
    ///
    /// A retention window that does not exceed the job deadline is only
    /// reported: the sweep may then delete the output of a job that is
    /// still running.
    pub fn validate(&self) -> AppResult<()> {
        if self.download.deadline_secs == 0 {
            return Err(AppError::Validation("download.deadline_secs must be positive".into()));
        }
        if self.cleanup.interval_secs == 0 {
            return Err(AppError::Validation("cleanup.interval_secs must be positive".into()));
        }
        if self.delivery.inline_threshold_bytes == 0 {
            return Err(AppError::Validation(
                "delivery.inline_threshold_bytes must be positive".into(),
            ));
        }
        if self.download.ytdl_bin.trim().is_empty() {
            return Err(AppError::Validation("download.ytdl_bin must not be empty".into()));
        }
        if self.retention_races_deadline() {
            log::warn!(
                "cleanup.retention_secs ({}) does not exceed download.deadline_secs ({}); \
                 the cleanup sweep may delete files of jobs that are still running",
                self.cleanup.retention_secs,
                self.download.deadline_secs
            );
        }
        Ok(())
    }

    pub fn retention_races_deadline(&self) -> bool {
        self.cleanup.retention_secs <= self.download.deadline_secs
    }

    /// Working directory with `~` expanded
    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.download.dir).into_owned())
    }

    pub fn job_deadline(&self) -> Duration {
        Duration::from_secs(self.download.deadline_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.cleanup.retention_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup.interval_secs)
    }
}
