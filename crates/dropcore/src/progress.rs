//! yt-dlp progress parsing
//!
//! The tool is run with `--newline`, so every progress update arrives as its
//! own stdout line:
//!
//! ```text
//! [download]  45.2% of 10.00MiB at 500.00KiB/s ETA 00:10
//! ```
//!
//! A bare percentage line (`--progress-template "%(progress._percent_str)s"`)
//! is recognized too. Anything else is ignored.

use std::fmt;

/// Coarse progress checkpoints reported to the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProgressBucket {
    Quarter,
    Half,
    ThreeQuarters,
}

impl ProgressBucket {
    pub fn percent(self) -> u8 {
        match self {
            ProgressBucket::Quarter => 25,
            ProgressBucket::Half => 50,
            ProgressBucket::ThreeQuarters => 75,
        }
    }

    /// Highest checkpoint reached by `percent`, if any
    pub fn for_percent(percent: f32) -> Option<Self> {
        if percent >= 75.0 {
            Some(ProgressBucket::ThreeQuarters)
        } else if percent >= 50.0 {
            Some(ProgressBucket::Half)
        } else if percent >= 25.0 {
            Some(ProgressBucket::Quarter)
        } else {
            None
        }
    }

    /// Status text sent to the requester
    pub fn message(self) -> String {
        format!("{}% downloaded...", self.percent())
    }
}

impl fmt::Display for ProgressBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Extracts the percentage from a progress line.
pub fn parse_percent(line: &str) -> Option<f32> {
    let trimmed = line.trim();

    let candidate = if let Some(rest) = trimmed.strip_prefix("[download]") {
        // "[download] Destination: ..." has no percent token
        rest.split_whitespace().next()?
    } else {
        trimmed
    };

    let value = candidate.strip_suffix('%')?.parse::<f32>().ok()?;
    if !value.is_finite() {
        return None;
    }
    // Garbage above 100 must not jump straight to the last checkpoint
    Some(value.clamp(0.0, 100.0))
}

/// Tracks which checkpoints one job has already reported.
///
/// A checkpoint fires at most once per job. yt-dlp downloads video and
/// audio streams separately for merged formats, so the percentage restarts
/// from zero mid-job; those repeats stay silent.
#[derive(Debug, Default)]
pub struct ProgressMonitor {
    reported: Option<ProgressBucket>,
}

impl ProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line; returns a checkpoint when a new one is crossed.
    ///
    /// If several checkpoints are crossed at once only the highest is
    /// returned; the skipped ones are considered reported.
    pub fn observe(&mut self, line: &str) -> Option<ProgressBucket> {
        let bucket = ProgressBucket::for_percent(parse_percent(line)?)?;
        if self.reported.is_some_and(|reported| bucket <= reported) {
            return None;
        }
        log::debug!("Progress checkpoint reached: {}", bucket);
        self.reported = Some(bucket);
        Some(bucket)
    }

    pub fn last_reported(&self) -> Option<ProgressBucket> {
        self.reported
    }
}
