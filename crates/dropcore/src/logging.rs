//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup summary of the settings the pipeline will run with

use simplelog::*;
use std::fs::File;

use crate::config::Settings;
use crate::error::{AppError, AppResult};

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(AppError)` - Failed to create the file or a logger is already installed
pub fn init_logger(log_file_path: &str) -> AppResult<()> {
    let log_file = File::create(log_file_path)?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Debug, Config::default(), log_file),
    ])
    .map_err(|e| AppError::Validation(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

/// Logs the effective settings at application startup.
///
/// Secrets are never printed, only whether they are set.
pub fn log_startup_configuration(settings: &Settings) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("mediadrop configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    log::info!("yt-dlp binary: {}", settings.download.ytdl_bin);
    log::info!("Working directory: {}", settings.download_dir().display());
    log::info!("Job deadline: {}s", settings.download.deadline_secs);
    log::info!(
        "Inline threshold: {} bytes ({:.1} MiB)",
        settings.delivery.inline_threshold_bytes,
        settings.delivery.inline_threshold_bytes as f64 / (1024.0 * 1024.0)
    );
    log::info!(
        "Cleanup: every {}s, retention {}s",
        settings.cleanup.interval_secs,
        settings.cleanup.retention_secs
    );
    log::info!(
        "Remote storage: {} (dir '{}')",
        settings.yandex.api_base,
        settings.yandex.remote_dir
    );

    if settings.telegram.token.is_empty() {
        log::error!("Telegram token: not set (telegram.token / BOT_TOKEN)");
    } else {
        log::info!("Telegram token: set");
    }
    if let Some(api_url) = &settings.telegram.api_url {
        log::info!("Bot API server: {}", api_url);
    }

    if settings.yandex.token.is_empty() {
        log::warn!("Storage token: not set (yandex.token / YANDEX_TOKEN)");
        log::warn!("   Files above the inline threshold will fail to upload");
    } else {
        log::info!("Storage token: set");
    }
}
