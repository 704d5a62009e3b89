use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::notifier::MediaKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid clip range '{0}': expected start-end, e.g. 00:10-00:20")]
pub struct ClipRangeError(pub String);

/// A validated `start-end` pair passed to `--download-sections`.
///
/// Each side is a timestamp made of digits, `:` and `.`
/// (`90`, `00:10`, `1:02:03.5`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRange {
    start: String,
    end: String,
}

impl ClipRange {
    pub fn new(start: &str, end: &str) -> Result<Self, ClipRangeError> {
        let start = start.trim();
        let end = end.trim();
        if !is_timestamp(start) || !is_timestamp(end) {
            return Err(ClipRangeError(format!("{}-{}", start, end)));
        }
        Ok(Self {
            start: start.to_string(),
            end: end.to_string(),
        })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Section selector understood by yt-dlp: `*start-end`
    pub fn section_selector(&self) -> String {
        format!("*{}-{}", self.start, self.end)
    }
}

fn is_timestamp(s: &str) -> bool {
    !s.is_empty()
        && s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || c == ':' || c == '.')
}

impl FromStr for ClipRange {
    type Err = ClipRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s.split_once('-').ok_or_else(|| ClipRangeError(s.to_string()))?;
        ClipRange::new(start, end).map_err(|_| ClipRangeError(s.to_string()))
    }
}

impl fmt::Display for ClipRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// What to fetch from the source URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Best video and audio merged into mp4
    Full,
    /// Best audio stream extracted to mp3
    AudioOnly,
    /// Only the given time range, merged into mp4
    Clip(ClipRange),
}

impl RetrievalMode {
    pub fn media_kind(&self) -> MediaKind {
        match self {
            RetrievalMode::AudioOnly => MediaKind::Audio,
            RetrievalMode::Full | RetrievalMode::Clip(_) => MediaKind::Video,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Full => "full",
            RetrievalMode::AudioOnly => "audio",
            RetrievalMode::Clip(_) => "clip",
        }
    }
}

/// One media request as built by the dispatcher. Immutable.
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub source_url: Url,
    pub mode: RetrievalMode,
    /// Chat the result goes back to
    pub requester_id: i64,
}

impl RetrievalRequest {
    pub fn new(source_url: Url, mode: RetrievalMode, requester_id: i64) -> Self {
        Self {
            source_url,
            mode,
            requester_id,
        }
    }

    /// Parses the URL and builds a request; only http(s) sources are accepted.
    pub fn parse(source_url: &str, mode: RetrievalMode, requester_id: i64) -> Result<Self, url::ParseError> {
        let url = Url::parse(source_url.trim())?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(url::ParseError::RelativeUrlWithoutBase);
        }
        Ok(Self::new(url, mode, requester_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clip_range_parse() {
        let range: ClipRange = "00:10-00:20".parse().unwrap();
        assert_eq!(range.start(), "00:10");
        assert_eq!(range.end(), "00:20");
        assert_eq!(range.section_selector(), "*00:10-00:20");
        assert_eq!(range.to_string(), "00:10-00:20");
    }

    #[test]
    fn test_clip_range_accepts_hours_and_fractions() {
        let range: ClipRange = "1:02:03.5-1:05:00".parse().unwrap();
        assert_eq!(range.section_selector(), "*1:02:03.5-1:05:00");
        assert!("90-120".parse::<ClipRange>().is_ok());
    }

    #[test]
    fn test_clip_range_rejects_malformed() {
        for bad in ["", "00:10", "-00:20", "00:10-", "ab-cd", "00:10-00:20; rm -rf /", "00:10--00:20"] {
            assert!(bad.parse::<ClipRange>().is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_media_kind_by_mode() {
        assert_eq!(RetrievalMode::AudioOnly.media_kind(), MediaKind::Audio);
        assert_eq!(RetrievalMode::Full.media_kind(), MediaKind::Video);
        let clip = RetrievalMode::Clip("0-5".parse().unwrap());
        assert_eq!(clip.media_kind(), MediaKind::Video);
        assert_eq!(clip.as_str(), "clip");
    }

    #[test]
    fn test_request_parse() {
        let request = RetrievalRequest::parse("https://example/video", RetrievalMode::Full, 42).unwrap();
        assert_eq!(request.source_url.as_str(), "https://example/video");
        assert_eq!(request.requester_id, 42);

        assert!(RetrievalRequest::parse("not a url", RetrievalMode::Full, 1).is_err());
        assert!(RetrievalRequest::parse("file:///etc/passwd", RetrievalMode::Full, 1).is_err());
    }
}
