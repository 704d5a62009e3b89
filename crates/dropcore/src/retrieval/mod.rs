//! Retrieval jobs: one yt-dlp run per request
//!
//! - `request`: what the dispatcher asks for (URL, mode, clip range)
//! - `job`: work token, argument building, the bounded subprocess run
//! - `stored`: locating the produced file in the working directory
//! - `error`: failure taxonomy of a run

pub mod error;
pub mod job;
pub mod request;
pub mod stored;

pub use error::RetrievalError;
pub use job::{build_args, new_work_token, JobStatus, RetrievalJob, ToolConfig};
pub use request::{ClipRange, ClipRangeError, RetrievalMode, RetrievalRequest};
pub use stored::StoredFile;
