use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Structured error type for one yt-dlp run.
///
/// Variants carry full diagnostics for the operational log. None of this is
/// shown to the requester; see [`crate::delivery::FailureReason::user_message`].
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The subprocess could not be started (binary missing, not executable)
    #[error("failed to start '{}': {source}", .binary.display())]
    LaunchFailed {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Deadline exceeded; the subprocess was killed
    #[error("yt-dlp timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    /// The tool reported failure; `output` is the tail of its stderr
    #[error("yt-dlp exited with {}: {output}", .code.map_or_else(|| "a signal".to_string(), |c| format!("code {}", c)))]
    NonZeroExit { code: Option<i32>, output: String },

    /// Clean exit but nothing in the working directory carries the work token
    #[error("no file with prefix '{token}' in {}", .dir.display())]
    NotFound { token: String, dir: PathBuf },
}

impl RetrievalError {
    /// Returns subcategory for logs and metrics
    pub fn subcategory(&self) -> &'static str {
        match self {
            RetrievalError::LaunchFailed { .. } => "launch_failed",
            RetrievalError::Timeout { .. } => "timeout",
            RetrievalError::NonZeroExit { .. } => "non_zero_exit",
            RetrievalError::NotFound { .. } => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RetrievalError::Timeout {
            after: Duration::from_secs(600),
        };
        assert_eq!(err.to_string(), "yt-dlp timed out after 600s");

        let err = RetrievalError::NonZeroExit {
            code: Some(2),
            output: "ERROR: Unsupported URL".into(),
        };
        assert_eq!(err.to_string(), "yt-dlp exited with code 2: ERROR: Unsupported URL");

        let err = RetrievalError::NonZeroExit {
            code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("a signal"));
    }

    #[test]
    fn test_subcategory() {
        let err = RetrievalError::NotFound {
            token: "abc".into(),
            dir: PathBuf::from("downloads"),
        };
        assert_eq!(err.subcategory(), "not_found");
        assert_eq!(err.to_string(), "no file with prefix 'abc' in downloads");
    }
}
