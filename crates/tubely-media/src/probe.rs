//! FFprobe stream inspection and aspect classification.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use tubely_models::AspectClass;

use crate::command::ProcessRunner;
use crate::error::{MediaError, MediaResult};

/// Width and height of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDimensions {
    pub width: u32,
    pub height: u32,
}

impl StreamDimensions {
    pub fn aspect_class(&self) -> AspectClass {
        AspectClass::from_dimensions(self.width, self.height)
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    disposition: FfprobeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

impl FfprobeStream {
    fn video_dimensions(&self) -> Option<StreamDimensions> {
        // Cover art shows up as a video stream too.
        if self.codec_type.as_deref() != Some("video") || self.disposition.attached_pic != 0 {
            return None;
        }
        Some(StreamDimensions {
            width: self.width?,
            height: self.height?,
        })
    }
}

/// Extract the first video stream's dimensions from `ffprobe -show_streams` JSON.
pub fn parse_stream_dimensions(json: &[u8]) -> MediaResult<StreamDimensions> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    probe
        .streams
        .iter()
        .find_map(FfprobeStream::video_dimensions)
        .ok_or(MediaError::NoVideoStream)
}

/// Classifies uploaded videos by probing them with ffprobe.
#[derive(Clone)]
pub struct AspectClassifier {
    runner: Arc<dyn ProcessRunner>,
    ffprobe: String,
}

impl AspectClassifier {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            ffprobe: "ffprobe".to_string(),
        }
    }

    /// Use a specific ffprobe binary.
    pub fn with_binary(mut self, ffprobe: impl Into<String>) -> Self {
        self.ffprobe = ffprobe.into();
        self
    }

    fn probe_args(path: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_streams".to_string(),
            path.to_string_lossy().to_string(),
        ]
    }

    /// Probe the first video stream of a file.
    pub async fn probe(&self, path: impl AsRef<Path>) -> MediaResult<StreamDimensions> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let output = self.runner.run(&self.ffprobe, &Self::probe_args(path)).await?;

        if !output.success() {
            return Err(MediaError::ffprobe_failed(
                format!("FFprobe exited with status {:?}", output.exit_code),
                Some(output.stderr_text()),
            ));
        }

        let dimensions = parse_stream_dimensions(&output.stdout)?;
        debug!(
            width = dimensions.width,
            height = dimensions.height,
            "Probed {}",
            path.display()
        );

        Ok(dimensions)
    }

    /// Probe a file and classify its aspect ratio.
    pub async fn classify(&self, path: impl AsRef<Path>) -> MediaResult<AspectClass> {
        Ok(self.probe(path).await?.aspect_class())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ProcessOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedRunner {
        output: ProcessOutput,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl CannedRunner {
        fn new(exit_code: i32, stdout: &str, stderr: &str) -> Arc<Self> {
            Arc::new(Self {
                output: ProcessOutput {
                    exit_code: Some(exit_code),
                    stdout: stdout.as_bytes().to_vec(),
                    stderr: stderr.as_bytes().to_vec(),
                },
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProcessRunner for CannedRunner {
        async fn run(&self, program: &str, args: &[String]) -> MediaResult<ProcessOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));
            Ok(self.output.clone())
        }
    }

    fn streams_json(width: u32, height: u32) -> String {
        format!(
            r#"{{"streams":[
                {{"index":0,"codec_type":"audio","codec_name":"aac"}},
                {{"index":1,"codec_type":"video","codec_name":"h264","width":{},"height":{}}}
            ]}}"#,
            width, height
        )
    }

    #[test]
    fn test_parse_skips_audio_streams() {
        let dims = parse_stream_dimensions(streams_json(1920, 1080).as_bytes()).unwrap();
        assert_eq!(dims, StreamDimensions { width: 1920, height: 1080 });
    }

    #[test]
    fn test_parse_skips_cover_art() {
        let json = r#"{"streams":[
            {"codec_type":"video","width":600,"height":600,"disposition":{"attached_pic":1}},
            {"codec_type":"video","width":1080,"height":1920,"disposition":{"attached_pic":0}}
        ]}"#;
        let dims = parse_stream_dimensions(json.as_bytes()).unwrap();
        assert_eq!(dims.aspect_class(), AspectClass::Portrait);
    }

    #[test]
    fn test_parse_no_video_stream() {
        let json = r#"{"streams":[{"codec_type":"audio"}]}"#;
        assert!(matches!(
            parse_stream_dimensions(json.as_bytes()),
            Err(MediaError::NoVideoStream)
        ));
        assert!(matches!(
            parse_stream_dimensions(b"{}"),
            Err(MediaError::NoVideoStream)
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_stream_dimensions(b"not json"),
            Err(MediaError::JsonParse(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_invokes_ffprobe() {
        let dir = tempfile::TempDir::new().unwrap();
        let video = dir.path().join("upload.mp4");
        std::fs::write(&video, b"fake").unwrap();

        let runner = CannedRunner::new(0, &streams_json(640, 480), "");
        let classifier = AspectClassifier::new(runner.clone()).with_binary("/opt/ffprobe");

        assert_eq!(classifier.classify(&video).await.unwrap(), AspectClass::Other);

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "/opt/ffprobe");
        assert!(calls[0].1.contains(&"-show_streams".to_string()));
        assert_eq!(calls[0].1.last().unwrap(), &video.to_string_lossy().to_string());
    }

    #[tokio::test]
    async fn test_classify_nonzero_exit() {
        let dir = tempfile::TempDir::new().unwrap();
        let video = dir.path().join("upload.mp4");
        std::fs::write(&video, b"fake").unwrap();

        let runner = CannedRunner::new(1, "", "Invalid data found when processing input");
        let classifier = AspectClassifier::new(runner);

        let err = classifier.classify(&video).await.unwrap_err();
        assert!(matches!(err, MediaError::FfprobeFailed { .. }));
        assert_eq!(
            err.diagnostics(),
            Some("Invalid data found when processing input")
        );
    }

    #[tokio::test]
    async fn test_classify_missing_file() {
        let runner = CannedRunner::new(0, "{}", "");
        let classifier = AspectClassifier::new(runner.clone());

        let result = classifier.classify("/nonexistent/upload.mp4").await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
