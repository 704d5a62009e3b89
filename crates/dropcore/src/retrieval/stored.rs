use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::error::RetrievalError;

/// Leftovers of an interrupted yt-dlp run, never a finished artifact
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// A file produced by a retrieval job.
///
/// Not `Clone`: [`StoredFile::remove`] consumes the value, so one
/// resolved file is deleted at most once.
#[derive(Debug)]
pub struct StoredFile {
    path: PathBuf,
    size_bytes: u64,
    modified: SystemTime,
}

impl StoredFile {
    /// Reads size and modification time of an existing file.
    pub async fn from_path(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        Ok(Self {
            size_bytes: metadata.len(),
            modified: metadata.modified()?,
            path,
        })
    }

    /// Scans `dir` for the file whose name starts with `token`.
    ///
    /// Partial downloads are skipped. If more than one candidate is left the
    /// newest one wins and the anomaly is logged.
    pub async fn find(dir: &Path, token: &str) -> Result<Self, RetrievalError> {
        let not_found = || RetrievalError::NotFound {
            token: token.to_string(),
            dir: dir.to_path_buf(),
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            log::error!("Failed to read working directory {}: {}", dir.display(), e);
            not_found()
        })?;

        let mut candidates: Vec<StoredFile> = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Failed to read entry in {}: {}", dir.display(), e);
                    break;
                }
            };

            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(token) || PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    log::warn!("Failed to stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            candidates.push(StoredFile {
                path: entry.path(),
                size_bytes: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        if candidates.len() > 1 {
            log::warn!(
                "{} files match work token {}; using the newest",
                candidates.len(),
                token
            );
        }
        candidates
            .into_iter()
            .max_by_key(|file| file.modified)
            .ok_or_else(not_found)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// File name used as the remote object name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Deletes the local file, consuming the handle.
    pub async fn remove(self) -> std::io::Result<()> {
        tokio::fs::remove_file(&self.path).await
    }
}
