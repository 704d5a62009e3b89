use thiserror::Error;

/// User-visible text for any failed retrieval
pub const DOWNLOAD_FAILED_TEXT: &str = "Error downloading media";

/// User-visible text for any failed remote upload
pub const UPLOAD_FAILED_TEXT: &str = "Error uploading large file to remote storage";

/// User-visible text when the inline send is rejected
pub const SEND_FAILED_TEXT: &str = "Failed to send media";

/// Centralized error types for the application
///
/// Covers startup and setup failures (settings, logger, HTTP client) that
/// end up in the binary's `main`. Per-job failures stay in their module enums
/// and reach the requester only as a [`crate::delivery::FailureReason`].
///
/// # Example
///
/// ```no_run
/// use dropcore::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Settings could not be assembled
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
