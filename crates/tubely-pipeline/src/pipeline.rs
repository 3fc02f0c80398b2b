//! Upload pipeline.
//!
//! One run takes a request body for an existing asset through
//! stage -> probe -> fast-start remux -> upload -> record update. Temp
//! files are owned by the run and removed on every exit path, and the
//! asset record is only written once the object is stored.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use tubely_media::{faststart_output_path, AspectClassifier, FastStartTranscoder, ProcessRunner};
use tubely_models::{AspectClass, AssetId, UserId, VideoAsset};
use tubely_storage::{build_key, media_type_extension, ObjectStore, StorageLocator};

use crate::config::{media_type_essence, UploadConfig};
use crate::error::{UploadError, UploadResult};
use crate::locks::AssetLocks;
use crate::repository::AssetRepository;
use crate::staging::stage_body;
use crate::state::{StateTrail, UploadState};

pub const UPLOADS_TOTAL: &str = "tubely_uploads_total";
pub const UPLOAD_DURATION_SECONDS: &str = "tubely_upload_duration_seconds";

/// One upload attempt.
pub struct UploadRequest<R> {
    pub asset_id: AssetId,
    /// Authenticated identity making the request
    pub caller: UserId,
    /// Media type declared by the client
    pub media_type: String,
    /// Body length if the client announced one
    pub declared_len: Option<u64>,
    pub body: R,
}

/// Outcome of a finalized upload.
#[derive(Debug, Clone)]
pub struct UploadReport {
    /// The record as persisted, `video_url` in locator form
    pub asset: VideoAsset,
    pub locator: StorageLocator,
    pub aspect: AspectClass,
    /// States passed through, `Received` to `Finalized`
    pub transitions: Vec<UploadState>,
}

/// Runs uploads against injected tools, storage and metadata store.
#[derive(Clone)]
pub struct UploadPipeline {
    config: UploadConfig,
    bucket: String,
    classifier: AspectClassifier,
    transcoder: FastStartTranscoder,
    store: Arc<dyn ObjectStore>,
    repository: Arc<dyn AssetRepository>,
    locks: AssetLocks,
}

impl UploadPipeline {
    pub fn new(
        config: UploadConfig,
        bucket: impl Into<String>,
        runner: Arc<dyn ProcessRunner>,
        store: Arc<dyn ObjectStore>,
        repository: Arc<dyn AssetRepository>,
        locks: AssetLocks,
    ) -> Self {
        let classifier = AspectClassifier::new(runner.clone()).with_binary(&config.ffprobe_path);
        let transcoder = FastStartTranscoder::new(runner).with_binary(&config.ffmpeg_path);

        Self {
            config,
            bucket: bucket.into(),
            classifier,
            transcoder,
            store,
            repository,
            locks,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Run one upload to completion.
    pub async fn run<R>(&self, request: UploadRequest<R>) -> UploadResult<UploadReport>
    where
        R: AsyncRead + Unpin + Send,
    {
        let started = Instant::now();
        let mut trail = StateTrail::new(request.asset_id);

        let result = self.execute(request, &mut trail).await;

        let outcome = match &result {
            Ok(_) => "finalized",
            Err(e) => {
                trail.fail(e);
                e.kind().as_str()
            }
        };
        counter!(UPLOADS_TOTAL, "outcome" => outcome).increment(1);
        histogram!(UPLOAD_DURATION_SECONDS, "outcome" => outcome)
            .record(started.elapsed().as_secs_f64());

        result.map(|mut report| {
            report.transitions = trail.into_states();
            report
        })
    }

    async fn execute<R>(
        &self,
        request: UploadRequest<R>,
        trail: &mut StateTrail,
    ) -> UploadResult<UploadReport>
    where
        R: AsyncRead + Unpin + Send,
    {
        let UploadRequest {
            asset_id,
            caller,
            media_type,
            declared_len,
            body,
        } = request;

        // Received -> Authorized
        self.authorize(&asset_id, &caller).await?;
        trail.advance(UploadState::Authorized);

        // Authorized -> Staged. Request-only checks run before waiting on the lock.
        let media_type = media_type_essence(&media_type);
        if media_type != self.config.supported_media_type {
            return Err(UploadError::validation(format!(
                "unsupported media type {:?}, expected {}",
                media_type, self.config.supported_media_type
            )));
        }
        if let Some(len) = declared_len.filter(|len| *len > self.config.max_upload_bytes) {
            return Err(UploadError::validation(format!(
                "upload of {} bytes exceeds the {} byte limit",
                len, self.config.max_upload_bytes
            )));
        }

        let _lock = self.locks.acquire(asset_id).await;

        let staged = stage_body(
            body,
            &self.config.staging_dir,
            &media_type_extension(&media_type),
            self.config.max_upload_bytes,
        )
        .await?;
        trail.advance(UploadState::Staged);

        // Staged -> Probed
        let aspect = self.classifier.classify(staged.path()).await?;
        debug!(asset_id = %asset_id, aspect = %aspect, "Classified upload");
        trail.advance(UploadState::Probed);

        // Probed -> Transcoded. The guard also covers partial ffmpeg output.
        let processed = scopeguard::guard(faststart_output_path(staged.path()), |path: PathBuf| {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        });
        self.transcoder.process(staged.path()).await?;
        trail.advance(UploadState::Transcoded);

        // Transcoded -> Uploaded
        let locator = StorageLocator::new(&self.bucket, build_key(aspect, &media_type));
        self.store
            .put_file(&locator.bucket, &locator.key, &processed, &media_type)
            .await?;
        trail.advance(UploadState::Uploaded);

        // Uploaded -> Finalized. Re-read under the lock so concurrent
        // metadata edits are not lost.
        let asset = self.finalize(&asset_id, &locator, &media_type, aspect).await?;
        trail.advance(UploadState::Finalized);

        info!(
            asset_id = %asset_id,
            bucket = %locator.bucket,
            key = %locator.key,
            aspect = %aspect,
            bytes = staged.len(),
            "Upload finalized"
        );

        Ok(UploadReport {
            asset,
            locator,
            aspect,
            transitions: Vec::new(),
        })
    }

    async fn authorize(&self, asset_id: &AssetId, caller: &UserId) -> UploadResult<()> {
        let asset = self.repository.get(asset_id).await?;
        if !asset.is_owned_by(caller) {
            return Err(UploadError::auth("not the owner of this video"));
        }
        Ok(())
    }

    async fn finalize(
        &self,
        asset_id: &AssetId,
        locator: &StorageLocator,
        media_type: &str,
        aspect: AspectClass,
    ) -> UploadResult<VideoAsset> {
        let updated = match self.repository.get(asset_id).await {
            Ok(current) => current.with_video(locator.encode(), media_type, aspect),
            Err(e) => {
                self.discard(locator).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.repository.update(&updated).await {
            self.discard(locator).await;
            return Err(e.into());
        }

        Ok(updated)
    }

    /// Best-effort removal of an object no record points at.
    async fn discard(&self, locator: &StorageLocator) {
        if let Err(e) = self.store.delete(&locator.bucket, &locator.key).await {
            warn!(key = %locator.key, "Failed to delete orphaned upload: {}", e);
        }
    }
}
