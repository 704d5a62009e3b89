//! Delivery through the real Yandex Disk client against a mock API

#![cfg(unix)]

mod common;

use common::{RecordingNotifier, MIB};
use dropcore::delivery::{DeliveryOutcome, DeliveryRouter, FailureReason, TOO_LARGE_TEXT};
use dropcore::notifier::MediaKind;
use dropcore::retrieval::StoredFile;
use dropcore::upload::DiskUploader;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_PATH: &str = "/v1/disk/resources";

fn router(server: &MockServer) -> DeliveryRouter {
    let uploader = DiskUploader::new(format!("{}{}", server.uri(), API_PATH), "disk-token", "test").unwrap();
    DeliveryRouter::new(MIB, Arc::new(uploader))
}

async fn large_file(dir: &tempfile::TempDir) -> (StoredFile, PathBuf) {
    let path = dir.path().join("3f2a.mp4");
    std::fs::write(&path, vec![7u8; (2 * MIB) as usize]).unwrap();
    (StoredFile::from_path(&path).await.unwrap(), path)
}

async fn mount_target(server: &MockServer, status: u16, expect: u64) {
    let put_url = format!("{}/upload-target/3f2a.mp4", server.uri());
    Mock::given(method("GET"))
        .and(path(format!("{}/upload", API_PATH)))
        .and(query_param("path", "test/3f2a.mp4"))
        .and(query_param("overwrite", "true"))
        .and(header("Authorization", "OAuth disk-token"))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({ "href": put_url })))
        .expect(expect)
        .mount(server)
        .await;
}

async fn mount_put(server: &MockServer, status: u16, expect: u64) {
    Mock::given(method("PUT"))
        .and(path("/upload-target/3f2a.mp4"))
        .respond_with(ResponseTemplate::new(status))
        .expect(expect)
        .mount(server)
        .await;
}

async fn mount_share(server: &MockServer, status: u16, expect: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{}/download", API_PATH)))
        .and(query_param("path", "test/3f2a.mp4"))
        .and(header("Accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(serde_json::json!({ "href": "https://downloader.disk.example/3f2a" })),
        )
        .expect(expect)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_remote_delivery_publishes_link_and_deletes_file() {
    let server = MockServer::start().await;
    mount_target(&server, 200, 1).await;
    mount_put(&server, 201, 1).await;
    mount_share(&server, 200, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let (file, path) = large_file(&dir).await;
    let notifier = RecordingNotifier::default();

    let outcome = router(&server).route(file, MediaKind::Video, &notifier).await;

    assert_eq!(
        outcome,
        DeliveryOutcome::RemoteLink("https://downloader.disk.example/3f2a".into())
    );
    assert_eq!(
        notifier.texts(),
        vec![
            TOO_LARGE_TEXT.to_string(),
            "File uploaded to remote storage: https://downloader.disk.example/3f2a".to_string()
        ]
    );
    assert!(!path.exists());
}

#[tokio::test]
async fn test_upload_target_failure_retains_file() {
    let server = MockServer::start().await;
    mount_target(&server, 500, 1).await;
    mount_put(&server, 201, 0).await;
    mount_share(&server, 200, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let (file, path) = large_file(&dir).await;
    let notifier = RecordingNotifier::default();

    let outcome = router(&server).route(file, MediaKind::Video, &notifier).await;

    assert_eq!(outcome, DeliveryOutcome::Failed(FailureReason::UploadFailed));
    assert!(path.exists());
}

#[tokio::test]
async fn test_put_failure_skips_share_link_and_retains_file() {
    let server = MockServer::start().await;
    mount_target(&server, 200, 1).await;
    mount_put(&server, 507, 1).await;
    mount_share(&server, 200, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let (file, path) = large_file(&dir).await;
    let notifier = RecordingNotifier::default();

    let outcome = router(&server).route(file, MediaKind::Video, &notifier).await;

    assert_eq!(outcome, DeliveryOutcome::Failed(FailureReason::UploadFailed));
    assert!(path.exists());
}

#[tokio::test]
async fn test_share_link_failure_retains_file() {
    let server = MockServer::start().await;
    mount_target(&server, 200, 1).await;
    mount_put(&server, 201, 1).await;
    mount_share(&server, 404, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let (file, path) = large_file(&dir).await;
    let notifier = RecordingNotifier::default();

    let outcome = router(&server).route(file, MediaKind::Video, &notifier).await;

    assert_eq!(outcome, DeliveryOutcome::Failed(FailureReason::UploadFailed));
    assert_eq!(FailureReason::UploadFailed.user_message(), "Error uploading large file to remote storage");
    assert!(path.exists());
}

#[tokio::test]
async fn test_small_file_never_touches_storage() {
    let server = MockServer::start().await;
    mount_target(&server, 200, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("3f2a.mp3");
    std::fs::write(&path, b"tiny").unwrap();
    let file = StoredFile::from_path(&path).await.unwrap();
    let notifier = RecordingNotifier::default();

    let outcome = router(&server).route(file, MediaKind::Audio, &notifier).await;

    assert_eq!(outcome, DeliveryOutcome::InlineDelivered);
    assert_eq!(notifier.media()[0].1, MediaKind::Audio);
    assert!(!path.exists());
}
