//! Upload pipeline integration tests against faked tools and storage.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use tubely_models::{AspectClass, UserId, VideoAsset};
use tubely_pipeline::testing::{FakeRunner, Harness};
use tubely_pipeline::{
    AssetLocks, AssetRepository, ErrorKind, UploadConfig, UploadPipeline, UploadRequest,
    UploadState,
};
use tubely_storage::{decode_locator, PresignedUrlIssuer, RemoteObject};

const BUCKET: &str = "tubely-test";
const BODY: &[u8] = b"not really an mp4, the fakes don't mind";

fn pipeline(harness: &Harness, staging: &Path) -> UploadPipeline {
    pipeline_with_locks(harness, staging, AssetLocks::new())
}

fn pipeline_with_locks(harness: &Harness, staging: &Path, locks: AssetLocks) -> UploadPipeline {
    let config = UploadConfig {
        staging_dir: staging.to_path_buf(),
        max_upload_bytes: 1024,
        ..UploadConfig::default()
    };
    UploadPipeline::new(
        config,
        BUCKET,
        harness.runner.clone(),
        harness.store.clone(),
        harness.repository.clone(),
        locks,
    )
}

async fn seed(harness: &Harness, owner: UserId) -> VideoAsset {
    harness
        .repository
        .create(VideoAsset::new(owner, "Boots on the ground", "first take"))
        .await
        .unwrap()
}

fn request(asset: &VideoAsset, caller: UserId, body: &'static [u8]) -> UploadRequest<&'static [u8]> {
    UploadRequest {
        asset_id: asset.id,
        caller,
        media_type: "video/mp4".to_string(),
        declared_len: Some(body.len() as u64),
        body,
    }
}

fn staging_entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

#[tokio::test]
async fn test_upload_is_finalized_and_signed_on_read() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape());
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let report = pipeline.run(request(&asset, owner, BODY)).await.unwrap();

    assert_eq!(
        report.transitions,
        vec![
            UploadState::Received,
            UploadState::Authorized,
            UploadState::Staged,
            UploadState::Probed,
            UploadState::Transcoded,
            UploadState::Uploaded,
            UploadState::Finalized,
        ]
    );
    assert_eq!(report.aspect, AspectClass::Landscape);
    assert_eq!(report.locator.bucket, BUCKET);
    assert!(report.locator.key.starts_with("landscape/"));
    assert!(report.locator.key.ends_with(".mp4"));

    // Record holds the locator, nothing else was lost.
    let stored = harness.repository.get(&asset.id).await.unwrap();
    assert_eq!(stored, report.asset);
    assert_eq!(stored.title, asset.title);
    assert_eq!(stored.media_type.as_deref(), Some("video/mp4"));
    assert_eq!(stored.aspect, Some(AspectClass::Landscape));
    assert!(stored.updated_at >= asset.updated_at);
    assert_eq!(
        decode_locator(stored.video_url.as_deref().unwrap()),
        RemoteObject::Stored(report.locator.clone())
    );

    // The remuxed bytes went up with the declared content type.
    let object = harness
        .store
        .object(BUCKET, &report.locator.key)
        .await
        .unwrap();
    assert_eq!(object.data, BODY);
    assert_eq!(object.content_type, "video/mp4");

    assert!(staging_entries(staging.path()).is_empty());
    assert_eq!(harness.runner.calls(), vec!["ffprobe", "ffmpeg"]);

    let issuer = PresignedUrlIssuer::new(harness.store.clone(), Duration::from_secs(900));
    let signed = issuer.sign_asset(stored).await.unwrap();
    let url = signed.asset.video_url.unwrap();
    assert!(url.contains(&format!("/{}/{}", BUCKET, report.locator.key)));

    let remaining = (signed.video_url_expires_at.unwrap() - Utc::now()).num_seconds();
    assert!((890..=900).contains(&remaining));
}

#[tokio::test]
async fn test_portrait_upload_uses_portrait_prefix() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::new(1080, 1920));
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let report = pipeline.run(request(&asset, owner, BODY)).await.unwrap();
    assert_eq!(report.aspect, AspectClass::Portrait);
    assert!(report.locator.key.starts_with("portrait/"));
}

#[tokio::test]
async fn test_media_type_parameters_are_ignored() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::new(640, 480));
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let mut req = request(&asset, owner, BODY);
    req.media_type = "Video/MP4; codecs=\"avc1.42E01E\"".to_string();

    let report = pipeline.run(req).await.unwrap();
    assert!(report.locator.key.starts_with("other/"));
    assert_eq!(report.asset.media_type.as_deref(), Some("video/mp4"));
}

#[tokio::test]
async fn test_non_owner_never_stages() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape());
    let pipeline = pipeline(&harness, staging.path());
    let asset = seed(&harness, UserId::new()).await;

    let err = pipeline
        .run(request(&asset, UserId::new(), BODY))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(staging_entries(staging.path()).is_empty());
    assert!(harness.runner.calls().is_empty());
    assert_eq!(harness.store.put_count(), 0);
    assert_eq!(harness.repository.get(&asset.id).await.unwrap(), asset);
}

#[tokio::test]
async fn test_unknown_asset() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape());
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let never_created = VideoAsset::new(owner, "ghost", "");

    let err = pipeline
        .run(request(&never_created, owner, BODY))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_wrong_media_type_is_rejected_before_staging() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape());
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let mut req = request(&asset, owner, BODY);
    req.media_type = "video/quicktime".to_string();

    let err = pipeline.run(req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(staging_entries(staging.path()).is_empty());
    assert!(harness.runner.calls().is_empty());
}

#[tokio::test]
async fn test_declared_length_over_limit() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape());
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let mut req = request(&asset, owner, BODY);
    req.declared_len = Some(4096);

    let err = pipeline.run(req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(harness.runner.calls().is_empty());
}

#[tokio::test]
async fn test_body_over_limit_while_streaming() {
    static BIG: [u8; 2048] = [7; 2048];

    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape());
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let mut req = request(&asset, owner, &BIG);
    req.declared_len = None;

    let err = pipeline.run(req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(staging_entries(staging.path()).is_empty());
    assert!(harness.runner.calls().is_empty());
}

#[tokio::test]
async fn test_probe_failure_cleans_up() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape().failing_probe("moov atom not found"));
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let err = pipeline.run(request(&asset, owner, BODY)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalTool);
    assert_eq!(err.diagnostics(), Some("moov atom not found"));
    assert!(staging_entries(staging.path()).is_empty());
    assert_eq!(harness.runner.calls(), vec!["ffprobe"]);
    assert_eq!(harness.repository.get(&asset.id).await.unwrap(), asset);
}

#[tokio::test]
async fn test_audio_only_upload_is_a_validation_error() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape().without_video_stream());
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let err = pipeline.run(request(&asset, owner, BODY)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(staging_entries(staging.path()).is_empty());
}

#[tokio::test]
async fn test_transcode_failure_removes_partial_output() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape().failing_transcode("Conversion failed!"));
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let err = pipeline.run(request(&asset, owner, BODY)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalTool);
    assert_eq!(err.diagnostics(), Some("Conversion failed!"));
    assert!(staging_entries(staging.path()).is_empty());
    assert_eq!(harness.store.put_count(), 0);
    assert_eq!(harness.repository.get(&asset.id).await.unwrap(), asset);
}

#[tokio::test]
async fn test_upload_failure_leaves_record_untouched() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape());
    harness.store.fail_puts(true);
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let err = pipeline.run(request(&asset, owner, BODY)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(staging_entries(staging.path()).is_empty());
    assert_eq!(harness.repository.get(&asset.id).await.unwrap(), asset);
}

#[tokio::test]
async fn test_metadata_failure_deletes_uploaded_object() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape());
    harness.repository.fail_updates(true);
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let err = pipeline.run(request(&asset, owner, BODY)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(harness.store.put_count(), 1);
    assert_eq!(harness.store.delete_count(), 1);
    assert_eq!(harness.store.object_count().await, 0);
    assert!(staging_entries(staging.path()).is_empty());
    assert_eq!(harness.repository.get(&asset.id).await.unwrap(), asset);
}

#[tokio::test]
async fn test_concurrent_uploads_for_one_asset() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape());
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let first = tokio::spawn({
        let pipeline = pipeline.clone();
        let req = request(&asset, owner, BODY);
        async move { pipeline.run(req).await }
    });
    let second = tokio::spawn({
        let pipeline = pipeline.clone();
        let req = request(&asset, owner, BODY);
        async move { pipeline.run(req).await }
    });

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_ne!(first.locator, second.locator);

    // Whichever finished last owns the record; its locator is intact.
    let last = if first.asset.updated_at >= second.asset.updated_at {
        &first
    } else {
        &second
    };
    let stored = harness.repository.get(&asset.id).await.unwrap();
    assert_eq!(stored.video_url, Some(last.locator.encode()));
    assert_eq!(harness.store.object_count().await, 2);
    assert!(staging_entries(staging.path()).is_empty());
}

#[tokio::test]
async fn test_uploads_for_one_asset_are_serialized() {
    let staging = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let harness = Harness::new(FakeRunner::landscape().with_probe_gate(gate.clone()));
    let pipeline = pipeline(&harness, staging.path());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let first = tokio::spawn({
        let pipeline = pipeline.clone();
        let req = request(&asset, owner, BODY);
        async move { pipeline.run(req).await }
    });

    // First run is parked inside ffprobe holding the asset lock
    tokio::time::timeout(Duration::from_secs(1), async {
        while harness.runner.calls().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let second = tokio::spawn({
        let pipeline = pipeline.clone();
        let req = request(&asset, owner, BODY);
        async move { pipeline.run(req).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!second.is_finished());
    assert_eq!(harness.runner.calls(), vec!["ffprobe"]);
    assert_eq!(staging_entries(staging.path()).len(), 1);

    gate.add_permits(1);
    let first = first.await.unwrap().unwrap();

    gate.add_permits(1);
    let second = second.await.unwrap().unwrap();

    assert_eq!(
        harness.runner.calls(),
        vec!["ffprobe", "ffmpeg", "ffprobe", "ffmpeg"]
    );
    let stored = harness.repository.get(&asset.id).await.unwrap();
    assert_eq!(stored.video_url, Some(second.locator.encode()));
    assert_ne!(first.locator, second.locator);
    assert!(staging_entries(staging.path()).is_empty());
}

#[tokio::test]
async fn test_request_checks_do_not_wait_on_asset_lock() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new(FakeRunner::landscape());
    let locks = AssetLocks::new();
    let pipeline = pipeline_with_locks(&harness, staging.path(), locks.clone());
    let owner = UserId::new();
    let asset = seed(&harness, owner).await;

    let held = locks.acquire(asset.id).await;

    let mut wrong_type = request(&asset, owner, BODY);
    wrong_type.media_type = "video/webm".to_string();
    let err = tokio::time::timeout(Duration::from_secs(1), pipeline.run(wrong_type))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut too_long = request(&asset, owner, BODY);
    too_long.declared_len = Some(4096);
    let err = tokio::time::timeout(Duration::from_secs(1), pipeline.run(too_long))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    drop(held);
    assert!(harness.runner.calls().is_empty());
}
