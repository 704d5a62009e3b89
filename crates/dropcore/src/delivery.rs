//! Size-based delivery routing
//!
//! Small files go straight back over the notification transport; anything
//! above the threshold is published to remote storage and only the link is
//! sent. The router owns the local file from here on and deletes it once a
//! delivery path has succeeded.

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{AppResult, DOWNLOAD_FAILED_TEXT, SEND_FAILED_TEXT, UPLOAD_FAILED_TEXT};
use crate::notifier::{notify_best_effort, MediaKind, Notifier};
use crate::retrieval::StoredFile;
use crate::upload::{DiskUploader, RemoteStore};

/// Sent before a remote upload starts
pub const TOO_LARGE_TEXT: &str = "File is too large, uploading to remote storage...";

/// Which way a file of a given size is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    Inline,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    DownloadFailed,
    UploadFailed,
    SendFailed,
}

impl FailureReason {
    pub fn user_message(self) -> &'static str {
        match self {
            FailureReason::DownloadFailed => DOWNLOAD_FAILED_TEXT,
            FailureReason::UploadFailed => UPLOAD_FAILED_TEXT,
            FailureReason::SendFailed => SEND_FAILED_TEXT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    InlineDelivered,
    RemoteLink(String),
    Failed(FailureReason),
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, DeliveryOutcome::Failed(_))
    }
}

/// Text announcing a finished remote upload
pub fn uploaded_text(link: &str) -> String {
    format!("File uploaded to remote storage: {}", link)
}

pub struct DeliveryRouter {
    threshold: u64,
    store: Arc<dyn RemoteStore>,
}

impl DeliveryRouter {
    pub fn new(threshold: u64, store: Arc<dyn RemoteStore>) -> Self {
        Self { threshold, store }
    }

    /// Router backed by the Yandex Disk uploader.
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        let uploader = DiskUploader::from_settings(settings)?;
        Ok(Self::new(settings.delivery.inline_threshold_bytes, Arc::new(uploader)))
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// A file exactly at the threshold still goes inline.
    pub fn decide(&self, size_bytes: u64) -> DeliveryPath {
        if size_bytes <= self.threshold {
            DeliveryPath::Inline
        } else {
            DeliveryPath::Remote
        }
    }

    /// Delivers `file` and deletes it on success.
    ///
    /// On failure the file is left for the cleanup sweep.
    pub async fn route(&self, file: StoredFile, kind: MediaKind, notifier: &dyn Notifier) -> DeliveryOutcome {
        let outcome = match self.decide(file.size_bytes()) {
            DeliveryPath::Inline => self.deliver_inline(&file, kind, notifier).await,
            DeliveryPath::Remote => self.deliver_remote(&file, notifier).await,
        };

        if outcome.is_success() {
            let path = file.path().to_path_buf();
            if let Err(e) = file.remove().await {
                log::warn!("Failed to delete delivered file {}: {}", path.display(), e);
            } else {
                log::debug!("Deleted delivered file {}", path.display());
            }
        }
        outcome
    }

    async fn deliver_inline(&self, file: &StoredFile, kind: MediaKind, notifier: &dyn Notifier) -> DeliveryOutcome {
        log::info!(
            "Sending {} inline as {} ({} bytes)",
            file.path().display(),
            kind,
            file.size_bytes()
        );
        match notifier.send_media(file.path(), kind).await {
            Ok(()) => DeliveryOutcome::InlineDelivered,
            Err(e) => {
                log::error!("Inline send of {} failed: {}", file.path().display(), e);
                DeliveryOutcome::Failed(FailureReason::SendFailed)
            }
        }
    }

    async fn deliver_remote(&self, file: &StoredFile, notifier: &dyn Notifier) -> DeliveryOutcome {
        log::info!(
            "{} is {} bytes (threshold {}), uploading to remote storage",
            file.path().display(),
            file.size_bytes(),
            self.threshold
        );
        notify_best_effort(notifier, TOO_LARGE_TEXT).await;

        match self.store.upload(file.path(), &file.file_name()).await {
            Ok(link) => {
                notify_best_effort(notifier, &uploaded_text(&link)).await;
                DeliveryOutcome::RemoteLink(link)
            }
            Err(e) => {
                log::error!(
                    "Upload of {} failed at {} step: {}",
                    file.path().display(),
                    e.step(),
                    e
                );
                DeliveryOutcome::Failed(FailureReason::UploadFailed)
            }
        }
    }
}
