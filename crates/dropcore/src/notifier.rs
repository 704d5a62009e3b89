//! Transport seam used to talk back to the requester.
//!
//! The pipeline never knows about Telegram; the bot crate provides an
//! implementation bound to one chat.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// How a delivered file should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

#[cfg(feature = "telegram")]
impl From<teloxide::RequestError> for NotifyError {
    fn from(err: teloxide::RequestError) -> Self {
        NotifyError(err.to_string())
    }
}

/// Status text and media relay for a single requester.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;

    async fn send_media(&self, path: &Path, kind: MediaKind) -> Result<(), NotifyError>;
}

/// Sends a status message, logging instead of failing.
///
/// Notifications are best-effort: a dead transport must never abort the job.
pub async fn notify_best_effort(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.send(text).await {
        log::warn!("Failed to send notification '{}': {}", text, e);
    }
}
