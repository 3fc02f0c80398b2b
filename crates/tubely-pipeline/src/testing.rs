//! Fakes for exercising the pipeline without ffmpeg, S3 or a database.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use tubely_media::{MediaError, MediaResult, ProcessOutput, ProcessRunner};
use tubely_models::{AssetId, VideoAsset};
use tubely_storage::{
    InMemoryObjectStore, ObjectStore, PresignedUrl, StorageError, StorageResult, StoredObject,
};

use crate::error::{StoreError, StoreResult};
use crate::repository::{AssetRepository, InMemoryAssetRepository};

enum ProbeBehavior {
    Dimensions(u32, u32),
    NoVideo,
    Fail(String),
}

/// Stands in for ffprobe and ffmpeg.
///
/// Probe calls (`-show_streams`) answer with canned stream JSON; any other
/// call copies the `-i` input to the last argument, like a stream copy.
pub struct FakeRunner {
    probe: ProbeBehavior,
    transcode_failure: Option<String>,
    probe_gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            probe: ProbeBehavior::Dimensions(width, height),
            transcode_failure: None,
            probe_gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn landscape() -> Self {
        Self::new(1920, 1080)
    }

    /// Probe output lists only an audio stream.
    pub fn without_video_stream(mut self) -> Self {
        self.probe = ProbeBehavior::NoVideo;
        self
    }

    pub fn failing_probe(mut self, stderr: impl Into<String>) -> Self {
        self.probe = ProbeBehavior::Fail(stderr.into());
        self
    }

    /// ffmpeg writes partial output, then exits 1.
    pub fn failing_transcode(mut self, stderr: impl Into<String>) -> Self {
        self.transcode_failure = Some(stderr.into());
        self
    }

    /// Each probe call is recorded, then waits for one permit from `gate`.
    pub fn with_probe_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.probe_gate = Some(gate);
        self
    }

    /// Programs invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn probe_output(&self) -> ProcessOutput {
        let (exit_code, stdout, stderr) = match &self.probe {
            ProbeBehavior::Dimensions(w, h) => (
                0,
                format!(
                    r#"{{"streams":[{{"codec_type":"video","width":{w},"height":{h}}},{{"codec_type":"audio"}}]}}"#
                ),
                String::new(),
            ),
            ProbeBehavior::NoVideo => (
                0,
                r#"{"streams":[{"codec_type":"audio"}]}"#.to_string(),
                String::new(),
            ),
            ProbeBehavior::Fail(stderr) => (1, String::new(), stderr.clone()),
        };

        ProcessOutput {
            exit_code: Some(exit_code),
            stdout: stdout.into_bytes(),
            stderr: stderr.into_bytes(),
        }
    }

    fn transcode(&self, args: &[String]) -> MediaResult<ProcessOutput> {
        let input = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| args.get(i + 1))
            .ok_or_else(|| MediaError::ffmpeg_failed("no input argument", None, None))?;
        let output = args
            .last()
            .ok_or_else(|| MediaError::ffmpeg_failed("no output argument", None, None))?;

        if let Some(stderr) = &self.transcode_failure {
            std::fs::write(output, b"partial")?;
            return Ok(ProcessOutput {
                exit_code: Some(1),
                stdout: Vec::new(),
                stderr: stderr.clone().into_bytes(),
            });
        }

        std::fs::copy(input, output)?;
        Ok(ProcessOutput {
            exit_code: Some(0),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String]) -> MediaResult<ProcessOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(program.to_string());

        if args.iter().any(|a| a == "-show_streams") {
            if let Some(gate) = &self.probe_gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            Ok(self.probe_output())
        } else {
            self.transcode(args)
        }
    }
}

/// In-memory object store with switchable failures.
#[derive(Default)]
pub struct FakeObjectStore {
    inner: InMemoryObjectStore,
    fail_puts: AtomicBool,
    fail_presign: AtomicBool,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryObjectStore::new("https://s3.test"),
            ..Self::default()
        }
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_presign(&self, fail: bool) {
        self.fail_presign.store(fail, Ordering::SeqCst);
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.inner.get(bucket, key).await
    }

    pub async fn object_count(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::upload_failed("503 Service Unavailable"));
        }
        self.inner.put_file(bucket, key, path, content_type).await
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> StorageResult<PresignedUrl> {
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(StorageError::presign_failed("credentials expired"));
        }
        self.inner.presign_get(bucket, key, ttl).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(bucket, key).await
    }
}

/// In-memory repository whose updates can be made to fail.
#[derive(Default)]
pub struct FlakyRepository {
    inner: InMemoryAssetRepository,
    fail_updates: AtomicBool,
}

impl FlakyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssetRepository for FlakyRepository {
    async fn create(&self, asset: VideoAsset) -> StoreResult<VideoAsset> {
        self.inner.create(asset).await
    }

    async fn get(&self, id: &AssetId) -> StoreResult<VideoAsset> {
        self.inner.get(id).await
    }

    async fn update(&self, asset: &VideoAsset) -> StoreResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::backend("connection reset"));
        }
        self.inner.update(asset).await
    }
}

/// Shared handles for a fully faked pipeline.
pub struct Harness {
    pub runner: Arc<FakeRunner>,
    pub store: Arc<FakeObjectStore>,
    pub repository: Arc<FlakyRepository>,
}

impl Harness {
    pub fn new(runner: FakeRunner) -> Self {
        Self {
            runner: Arc::new(runner),
            store: Arc::new(FakeObjectStore::new()),
            repository: Arc::new(FlakyRepository::new()),
        }
    }
}
