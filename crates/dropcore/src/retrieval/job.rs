use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::RetrievalError;
use super::request::{RetrievalMode, RetrievalRequest};
use super::stored::StoredFile;
use crate::config::Settings;
use crate::notifier::{notify_best_effort, Notifier};
use crate::progress::ProgressMonitor;

/// Stderr lines kept for the failure log
const STDERR_TAIL_LINES: usize = 50;

/// How long output readers may linger after the process is gone.
/// A grandchild (ffmpeg) can hold the pipe open after yt-dlp exits.
const READER_GRACE: Duration = Duration::from_secs(5);

/// Where and how the retrieval tool runs
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub binary: PathBuf,
    pub work_dir: PathBuf,
    pub deadline: Duration,
}

impl ToolConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            binary: PathBuf::from(&settings.download.ytdl_bin),
            work_dir: settings.download_dir(),
            deadline: settings.job_deadline(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

/// Fresh 128-bit random work token (UUIDv4, hyphenated).
pub fn new_work_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Builds the yt-dlp argument list for `mode`.
///
/// The URL is always the last, single positional argument.
pub fn build_args(mode: &RetrievalMode, url: &Url, output_template: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    match mode {
        RetrievalMode::AudioOnly => {
            args.extend(
                [
                    "-f",
                    "bestaudio",
                    "--extract-audio",
                    "--audio-format",
                    "mp3",
                    "--audio-quality",
                    "0",
                ]
                .map(String::from),
            );
        }
        RetrievalMode::Clip(range) => {
            args.extend(["--merge-output-format", "mp4", "--download-sections"].map(String::from));
            args.push(range.section_selector());
        }
        RetrievalMode::Full => {
            args.extend(["--merge-output-format", "mp4"].map(String::from));
        }
    }

    // one progress update per stdout line
    args.push("--newline".to_string());
    args.push("-o".to_string());
    args.push(output_template.to_string());
    args.push(url.to_string());
    args
}

/// One request's run of the retrieval tool.
///
/// Owned by the task executing it; lives for one request.
#[derive(Debug)]
pub struct RetrievalJob {
    request: RetrievalRequest,
    work_token: String,
    deadline: Duration,
    status: JobStatus,
    result_path: Option<PathBuf>,
}

impl RetrievalJob {
    pub fn new(request: RetrievalRequest, deadline: Duration) -> Self {
        Self {
            request,
            work_token: new_work_token(),
            deadline,
            status: JobStatus::Pending,
            result_path: None,
        }
    }

    pub fn request(&self) -> &RetrievalRequest {
        &self.request
    }

    pub fn work_token(&self) -> &str {
        &self.work_token
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result_path(&self) -> Option<&Path> {
        self.result_path.as_deref()
    }

    /// Output template handed to `-o`: `<work_dir>/<token>.%(ext)s`
    pub fn output_template(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(format!("{}.%(ext)s", self.work_token))
    }

    /// Runs the tool to completion or until the deadline.
    ///
    /// Progress checkpoints go to `notifier` while the process runs. On
    /// success the produced file is resolved by work token.
    pub async fn run(&mut self, tool: &ToolConfig, notifier: Arc<dyn Notifier>) -> Result<StoredFile, RetrievalError> {
        self.status = JobStatus::Running;
        let result = self.execute(tool, notifier).await;

        self.status = match &result {
            Ok(file) => {
                self.result_path = Some(file.path().to_path_buf());
                JobStatus::Succeeded
            }
            Err(RetrievalError::Timeout { .. }) => JobStatus::TimedOut,
            Err(_) => JobStatus::Failed,
        };
        result
    }

    async fn execute(&self, tool: &ToolConfig, notifier: Arc<dyn Notifier>) -> Result<StoredFile, RetrievalError> {
        let template = self.output_template(&tool.work_dir);
        let args = build_args(&self.request.mode, &self.request.source_url, &template.to_string_lossy());

        log::info!(
            "Job {} started: {} ({}) for requester {}",
            self.work_token,
            self.request.source_url,
            self.request.mode.as_str(),
            self.request.requester_id
        );
        log::debug!("yt-dlp command: {} {}", tool.binary.display(), args.join(" "));

        let mut child = Command::new(&tool.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RetrievalError::LaunchFailed {
                binary: tool.binary.clone(),
                source,
            })?;

        // Cancelled on deadline expiry: stops progress relaying for this job
        let cancel = CancellationToken::new();

        let stdout_reader = child.stdout.take().map(|stdout| {
            tokio::spawn(relay_progress(
                stdout,
                notifier,
                cancel.clone(),
                self.work_token.clone(),
            ))
        });
        let stderr_reader = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(collect_tail(stderr, cancel.clone(), self.work_token.clone())));

        let waited = tokio::time::timeout(self.deadline, child.wait()).await;

        let exit_status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                cancel.cancel();
                let _ = child.start_kill();
                join_reader(stdout_reader, &cancel).await;
                join_reader(stderr_reader, &cancel).await;
                log::error!("Job {}: failed to wait for yt-dlp: {}", self.work_token, e);
                return Err(RetrievalError::NonZeroExit {
                    code: None,
                    output: e.to_string(),
                });
            }
            Err(_) => {
                cancel.cancel();
                log::error!(
                    "Job {}: yt-dlp timed out after {}s, killing",
                    self.work_token,
                    self.deadline.as_secs()
                );
                if let Err(e) = child.kill().await {
                    log::warn!("Job {}: failed to kill yt-dlp: {}", self.work_token, e);
                }
                join_reader(stdout_reader, &cancel).await;
                join_reader(stderr_reader, &cancel).await;
                return Err(RetrievalError::Timeout { after: self.deadline });
            }
        };

        join_reader(stdout_reader, &cancel).await;
        let stderr_tail = join_reader(stderr_reader, &cancel).await.unwrap_or_default();

        if !exit_status.success() {
            return Err(RetrievalError::NonZeroExit {
                code: exit_status.code(),
                output: stderr_tail,
            });
        }

        let file = StoredFile::find(&tool.work_dir, &self.work_token).await?;
        log::info!(
            "Job {} finished: {} ({} bytes)",
            self.work_token,
            file.path().display(),
            file.size_bytes()
        );
        Ok(file)
    }
}

/// Waits for a reader task, giving up after [`READER_GRACE`].
async fn join_reader<T>(reader: Option<JoinHandle<T>>, cancel: &CancellationToken) -> Option<T> {
    let mut handle = reader?;
    match tokio::time::timeout(READER_GRACE, &mut handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            log::warn!("Output reader task failed: {}", e);
            None
        }
        Err(_) => {
            cancel.cancel();
            handle.abort();
            None
        }
    }
}

/// Feeds stdout lines to a [`ProgressMonitor`] and relays new checkpoints.
async fn relay_progress<R>(stdout: R, notifier: Arc<dyn Notifier>, cancel: CancellationToken, token: String)
where
    R: AsyncRead + Unpin,
{
    let mut monitor = ProgressMonitor::new();
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = read_lossy_line(&mut reader, &mut buf) => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::warn!("Job {}: stdout read error: {}", token, e);
                break;
            }
        };

        log::debug!("yt-dlp [{}] stdout: {}", token, line);
        if let Some(bucket) = monitor.observe(&line) {
            if cancel.is_cancelled() {
                break;
            }
            notify_best_effort(notifier.as_ref(), &bucket.message()).await;
        }
    }
}

/// Drains stderr, keeping the last [`STDERR_TAIL_LINES`] lines.
async fn collect_tail<R>(stderr: R, cancel: CancellationToken, token: String) -> String
where
    R: AsyncRead + Unpin,
{
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = read_lossy_line(&mut reader, &mut buf) => line,
        };
        match line {
            Ok(Some(line)) => {
                log::debug!("yt-dlp [{}] stderr: {}", token, line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Ok(None) => break,
            Err(e) => {
                log::warn!("Job {}: stderr read error: {}", token, e);
                break;
            }
        }
    }

    Vec::from(tail).join("\n")
}

/// Reads one line with invalid UTF-8 replaced; only I/O errors fail.
///
/// Returns `Ok(None)` at EOF.
async fn read_lossy_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}
