//! mediadrop core - media retrieval and delivery pipeline
//!
//! This library holds everything the bot needs that is not Telegram-specific:
//! running yt-dlp jobs, routing the produced files either inline or through
//! a remote upload, and sweeping stale files out of the working directory.
//!
//! # Module Structure
//!
//! - `config`: Settings loading (defaults, `config.yaml`, environment)
//! - `error`: Application-wide error type
//! - `logging`: Logger initialization and startup diagnostics
//! - `notifier`: The transport seam used to talk back to the requester
//! - `progress`: yt-dlp progress line parsing
//! - `retrieval`: Requests, retrieval jobs, and resolved files
//! - `upload`: Yandex Disk three-step upload protocol
//! - `delivery`: Inline vs. remote delivery routing
//! - `cleanup`: Background retention sweep over the working directory
//! - `pipeline`: Dispatcher-facing entry point tying it all together

pub mod cleanup;
pub mod config;
pub mod delivery;
pub mod error;
pub mod logging;
pub mod notifier;
pub mod pipeline;
pub mod progress;
pub mod retrieval;
pub mod upload;

// Re-export commonly used types for convenience
pub use cleanup::{CleanupScheduler, SweepReport};
pub use config::Settings;
pub use delivery::{DeliveryOutcome, DeliveryRouter, FailureReason};
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
pub use notifier::{MediaKind, Notifier, NotifyError};
pub use pipeline::Pipeline;
pub use retrieval::{ClipRange, RetrievalJob, RetrievalMode, RetrievalRequest, StoredFile};
pub use upload::{DiskUploader, RemoteStore};
