//! Dispatcher-facing entry point
//!
//! `submit` returns immediately; each request runs in its own task:
//! retrieval job, then delivery routing, with status text relayed to the
//! requester along the way.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::delivery::{DeliveryOutcome, DeliveryRouter, FailureReason};
use crate::error::AppResult;
use crate::notifier::{notify_best_effort, Notifier};
use crate::retrieval::{RetrievalJob, RetrievalRequest, ToolConfig};

/// Acknowledgement sent as soon as a request is accepted
pub const STARTED_TEXT: &str = "Media processing started...";

/// Sent when the retrieval tool is launched
pub const DOWNLOADING_TEXT: &str = "Downloading media...";

pub struct Pipeline {
    tool: ToolConfig,
    router: DeliveryRouter,
}

impl Pipeline {
    pub fn new(tool: ToolConfig, router: DeliveryRouter) -> Self {
        Self { tool, router }
    }

    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        Ok(Self::new(
            ToolConfig::from_settings(settings),
            DeliveryRouter::from_settings(settings)?,
        ))
    }

    pub fn tool(&self) -> &ToolConfig {
        &self.tool
    }

    /// Spawns one task for `request` and returns without waiting for it.
    pub fn submit(self: &Arc<Self>, request: RetrievalRequest, notifier: Arc<dyn Notifier>) -> JoinHandle<DeliveryOutcome> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.process(request, notifier).await })
    }

    /// Runs one request to completion on the current task.
    ///
    /// A job that hits its deadline stops relaying progress at once, but the
    /// requester still gets the final download error text.
    pub async fn process(&self, request: RetrievalRequest, notifier: Arc<dyn Notifier>) -> DeliveryOutcome {
        notify_best_effort(notifier.as_ref(), STARTED_TEXT).await;

        let kind = request.mode.media_kind();
        let mut job = RetrievalJob::new(request, self.tool.deadline);

        notify_best_effort(notifier.as_ref(), DOWNLOADING_TEXT).await;
        let file = match job.run(&self.tool, Arc::clone(&notifier)).await {
            Ok(file) => file,
            Err(e) => {
                log::error!(
                    "Job {} failed [{}]: {}",
                    job.work_token(),
                    e.subcategory(),
                    e
                );
                return fail(notifier.as_ref(), FailureReason::DownloadFailed).await;
            }
        };

        let outcome = self.router.route(file, kind, notifier.as_ref()).await;
        match &outcome {
            DeliveryOutcome::Failed(reason) => {
                log::warn!("Job {} delivery failed: {:?}", job.work_token(), reason);
                notify_best_effort(notifier.as_ref(), reason.user_message()).await;
            }
            DeliveryOutcome::InlineDelivered => {
                log::info!("Job {} delivered inline", job.work_token());
            }
            DeliveryOutcome::RemoteLink(link) => {
                log::info!("Job {} delivered via remote link {}", job.work_token(), link);
            }
        }
        outcome
    }
}

async fn fail(notifier: &dyn Notifier, reason: FailureReason) -> DeliveryOutcome {
    notify_best_effort(notifier, reason.user_message()).await;
    DeliveryOutcome::Failed(reason)
}
