//! Retention sweep over the working directory
//!
//! Runs on a fixed interval, independent of request traffic. There is no
//! locking against running jobs; the retention window must exceed the job
//! deadline.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("failed to read directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {}: {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct CleanupScheduler {
    dir: PathBuf,
    interval: Duration,
    retention: Duration,
}

impl CleanupScheduler {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration, retention: Duration) -> Self {
        Self {
            dir: dir.into(),
            interval,
            retention,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.download_dir(), settings.cleanup_interval(), settings.retention())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub async fn sweep(&self) -> Result<SweepReport, CleanupError> {
        self.sweep_at(SystemTime::now()).await
    }

    /// Deletes every regular file older than the retention window as of `now`.
    ///
    /// Only an unreadable directory fails the sweep. Per-file failures are
    /// logged and counted.
    pub async fn sweep_at(&self, now: SystemTime) -> Result<SweepReport, CleanupError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|source| CleanupError::ReadDir {
                path: self.dir.clone(),
                source,
            })?;

        let mut report = SweepReport::default();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    log::warn!(
                        "{}",
                        CleanupError::ReadDir {
                            path: self.dir.clone(),
                            source
                        }
                    );
                    report.failed += 1;
                    break;
                }
            };
            report.scanned += 1;

            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(source) => {
                    log::warn!("{}", CleanupError::Stat { path, source });
                    report.failed += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(source) => {
                    log::warn!("{}", CleanupError::Stat { path, source });
                    report.failed += 1;
                    continue;
                }
            };
            // mtime in the future counts as age zero
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.retention {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    log::info!("Deleted stale file {} (age {}s)", path.display(), age.as_secs());
                    report.deleted += 1;
                }
                Err(source) => {
                    log::warn!("{}", CleanupError::Delete { path, source });
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Starts the periodic sweep. The first sweep runs one interval from now.
    ///
    /// Runs until `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            log::info!(
                "Cleanup scheduler started for {} (every {}s, retention {}s)",
                self.dir.display(),
                self.interval.as_secs(),
                self.retention.as_secs()
            );

            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match self.sweep().await {
                    Ok(report) if report.deleted > 0 || report.failed > 0 => {
                        log::info!(
                            "Cleanup sweep: scanned {}, deleted {}, failed {}",
                            report.scanned,
                            report.deleted,
                            report.failed
                        );
                    }
                    Ok(_) => log::debug!("Cleanup sweep: nothing to delete"),
                    Err(e) => log::error!("Cleanup sweep failed: {}", e),
                }
            }

            log::info!("Cleanup scheduler stopped");
        })
    }
}
