//! Common test utilities
//!
//! Shared by the integration tests: a notifier that records everything it is
//! asked to send, and fake yt-dlp executables written as shell scripts.

#![allow(dead_code)]

use async_trait::async_trait;
use dropcore::notifier::{MediaKind, Notifier, NotifyError};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const MIB: u64 = 1024 * 1024;

/// Records texts and media instead of sending them anywhere
#[derive(Default)]
pub struct RecordingNotifier {
    pub texts: Mutex<Vec<String>>,
    pub media: Mutex<Vec<(PathBuf, MediaKind, u64)>>,
    pub fail_media: bool,
    /// Reject every text message, as a chat that blocked the bot would
    pub fail_text: bool,
}

impl RecordingNotifier {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    /// (path, kind, size at the time of sending)
    pub fn media(&self) -> Vec<(PathBuf, MediaKind, u64)> {
        self.media.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if self.fail_text {
            return Err(NotifyError("Forbidden: bot was blocked by the user".into()));
        }
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_media(&self, path: &Path, kind: MediaKind) -> Result<(), NotifyError> {
        if self.fail_media {
            return Err(NotifyError("Request Entity Too Large".into()));
        }
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        self.media.lock().unwrap().push((path.to_path_buf(), kind, size));
        Ok(())
    }
}

/// A fake yt-dlp living in its own directory.
///
/// Every invocation writes its arguments, one per line, to `args.txt` next
/// to the script.
pub struct FakeTool {
    pub dir: tempfile::TempDir,
    pub binary: PathBuf,
}

impl FakeTool {
    pub fn args_file(&self) -> PathBuf {
        self.dir.path().join("args.txt")
    }

    /// Arguments of the last invocation
    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.args_file())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }
}

/// Writes an executable script whose body runs after argument recording.
///
/// `$out` holds the `-o` template for the body to use.
pub fn fake_tool(body: &str) -> FakeTool {
    let dir = tempfile::tempdir().unwrap();
    let binary = dir.path().join("yt-dlp");
    let args_file = dir.path().join("args.txt");

    let script = format!(
        r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done
printf '%s\n' "$@" > "{args}"
{body}
"#,
        args = args_file.display(),
        body = body
    );
    std::fs::write(&binary, script).unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

    FakeTool { dir, binary }
}

/// Reports progress, then writes `<token>.<ext>` of `size` bytes.
pub fn producing_tool(ext: &str, size: u64) -> FakeTool {
    fake_tool(&format!(
        r#"echo "[youtube] abc: Downloading webpage"
echo "[download]  10.0% of 10.00MiB at 1.00MiB/s ETA 00:09"
echo "[download]  30.0% of 10.00MiB at 1.00MiB/s ETA 00:07"
echo "[download]  60.0% of 10.00MiB at 1.00MiB/s ETA 00:04"
echo "[download]  90.0% of 10.00MiB at 1.00MiB/s ETA 00:01"
echo "[download] 100.0% of 10.00MiB"
file=$(printf '%s' "$out" | sed 's/%(ext)s/{ext}/')
head -c {size} /dev/zero > "$file"
"#,
        ext = ext,
        size = size
    ))
}

/// Files left in `dir`
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
