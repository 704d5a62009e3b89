//! Remote storage upload (Yandex Disk REST API).
//!
//! A file is published in three strictly sequential steps:
//!
//! 1. `GET {base}/upload?path=..&overwrite=true` returns the upload href
//! 2. `PUT <href>` with the file streamed as the body
//! 3. `GET {base}/download?path=..` returns the share link
//!
//! A failed step stops the sequence. Nothing is retried.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Body, Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio_util::io::ReaderStream;

use crate::config::{self, Settings};
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    UploadTarget,
    Put,
    ShareLink,
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStep::UploadTarget => write!(f, "upload target"),
            UploadStep::Put => write!(f, "put content"),
            UploadStep::ShareLink => write!(f, "share link"),
        }
    }
}

/// Why a single HTTP exchange failed
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("requesting upload target failed: {0}")]
    UploadTarget(#[source] RequestFailure),

    #[error("uploading content failed: {0}")]
    Put(#[source] RequestFailure),

    #[error("requesting share link failed: {0}")]
    ShareLink(#[source] RequestFailure),

    #[error("{step} response has no string href: {source}")]
    ResponseFormat {
        step: UploadStep,
        #[source]
        source: serde_json::Error,
    },
}

impl UploadError {
    /// Step the sequence stopped at
    pub fn step(&self) -> UploadStep {
        match self {
            UploadError::UploadTarget(_) => UploadStep::UploadTarget,
            UploadError::Put(_) => UploadStep::Put,
            UploadError::ShareLink(_) => UploadStep::ShareLink,
            UploadError::ResponseFormat { step, .. } => *step,
        }
    }
}

/// Publishes a local file and returns a link to it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn upload(&self, local_file: &Path, file_name: &str) -> Result<String, UploadError>;
}

/// State of one upload, from target request to share link
#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    pub remote_path: String,
    pub upload_target_url: Option<String>,
    pub share_link: Option<String>,
}

impl UploadSession {
    pub fn new(remote_dir: &str, file_name: &str) -> Self {
        Self {
            remote_path: format!("{}/{}", remote_dir, file_name),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct HrefResponse {
    href: String,
}

/// Yandex Disk client.
///
/// The OAuth token is read once at construction and shared by every call.
#[derive(Clone)]
pub struct DiskUploader {
    client: Client,
    api_base: String,
    token: String,
    remote_dir: String,
}

impl fmt::Debug for DiskUploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskUploader")
            .field("api_base", &self.api_base)
            .field("remote_dir", &self.remote_dir)
            .finish_non_exhaustive()
    }
}

impl DiskUploader {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        remote_dir: impl Into<String>,
    ) -> AppResult<Self> {
        let client = Client::builder().timeout(config::network::timeout()).build()?;
        Ok(Self::with_client(client, api_base, token, remote_dir))
    }

    pub fn with_client(
        client: Client,
        api_base: impl Into<String>,
        token: impl Into<String>,
        remote_dir: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            remote_dir: remote_dir.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        Self::new(
            settings.yandex.api_base.clone(),
            settings.yandex.token.clone(),
            settings.yandex.remote_dir.clone(),
        )
    }

    pub fn remote_dir(&self) -> &str {
        &self.remote_dir
    }

    fn auth_header(&self) -> String {
        format!("OAuth {}", self.token)
    }

    /// `remote_dir/file_name`, escaped as one query component
    fn remote_path(remote_dir: &str, file_name: &str) -> String {
        urlencoding::encode(&format!("{}/{}", remote_dir, file_name)).into_owned()
    }

    /// Step 1: asks for a URL the content can be PUT to.
    pub async fn request_upload_target(&self, remote_dir: &str, file_name: &str) -> Result<String, UploadError> {
        let url = format!(
            "{}/upload?path={}&overwrite=true",
            self.api_base,
            Self::remote_path(remote_dir, file_name)
        );
        log::debug!("Requesting upload target for {}/{}", remote_dir, file_name);
        self.get_href(&url, UploadStep::UploadTarget).await
    }

    /// Step 2: streams the local file to `upload_url`.
    pub async fn put_content(&self, upload_url: &str, local_file: &Path) -> Result<(), UploadError> {
        let file = tokio::fs::File::open(local_file)
            .await
            .map_err(|e| UploadError::Put(e.into()))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| UploadError::Put(e.into()))?
            .len();

        log::info!("Uploading {} ({} bytes)", local_file.display(), size);

        let response = self
            .client
            .put(upload_url)
            .header(AUTHORIZATION, self.auth_header())
            .header(ACCEPT, "application/json")
            .header(CONTENT_LENGTH, size)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|e| UploadError::Put(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            log::error!("PUT {} returned {}", local_file.display(), status);
            return Err(UploadError::Put(RequestFailure::Status(status)));
        }
        Ok(())
    }

    /// Step 3: asks for a public download link to the stored object.
    pub async fn request_share_link(&self, remote_dir: &str, file_name: &str) -> Result<String, UploadError> {
        let url = format!(
            "{}/download?path={}",
            self.api_base,
            Self::remote_path(remote_dir, file_name)
        );
        log::debug!("Requesting share link for {}/{}", remote_dir, file_name);
        self.get_href(&url, UploadStep::ShareLink).await
    }

    async fn get_href(&self, url: &str, step: UploadStep) -> Result<String, UploadError> {
        let wrap = |failure: RequestFailure| match step {
            UploadStep::ShareLink => UploadError::ShareLink(failure),
            _ => UploadError::UploadTarget(failure),
        };

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, self.auth_header())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| wrap(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            log::error!("{} request returned {}", step, status);
            return Err(wrap(RequestFailure::Status(status)));
        }

        let body = response.bytes().await.map_err(|e| wrap(e.into()))?;
        let parsed: HrefResponse =
            serde_json::from_slice(&body).map_err(|source| UploadError::ResponseFormat { step, source })?;
        Ok(parsed.href)
    }
}

#[async_trait]
impl RemoteStore for DiskUploader {
    async fn upload(&self, local_file: &Path, file_name: &str) -> Result<String, UploadError> {
        let mut session = UploadSession::new(&self.remote_dir, file_name);

        let target = self.request_upload_target(&self.remote_dir, file_name).await?;
        self.put_content(&target, local_file).await?;
        session.upload_target_url = Some(target);

        let link = self.request_share_link(&self.remote_dir, file_name).await?;
        session.share_link = Some(link.clone());

        log::info!("Uploaded {} to {}", local_file.display(), session.remote_path);
        log::debug!("Upload session: {:?}", session);
        Ok(link)
    }
}
