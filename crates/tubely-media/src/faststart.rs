//! Fast-start remux for progressive playback.
//!
//! Moves the `moov` atom to the front of an MP4 with a stream copy, so a
//! player can start before the whole file is downloaded.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::command::{FfmpegCommand, ProcessRunner};
use crate::error::{MediaError, MediaResult};

/// Suffix appended to the input path to name the remuxed output.
pub const FASTSTART_SUFFIX: &str = ".processing";

/// Sibling path the remuxed file is written to.
pub fn faststart_output_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(FASTSTART_SUFFIX);
    PathBuf::from(name)
}

/// Remuxes uploads with `-movflags faststart` via ffmpeg.
///
/// The caller owns both the input and the returned output path.
#[derive(Clone)]
pub struct FastStartTranscoder {
    runner: Arc<dyn ProcessRunner>,
    ffmpeg: String,
}

impl FastStartTranscoder {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            ffmpeg: "ffmpeg".to_string(),
        }
    }

    /// Use a specific ffmpeg binary.
    pub fn with_binary(mut self, ffmpeg: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    /// Build the remux command for an input file.
    pub fn command(input: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, faststart_output_path(input))
            .stream_copy()
            .output_args(["-movflags", "faststart"])
            .format("mp4")
    }

    /// Remux `input` and return the path of the new file.
    pub async fn process(&self, input: impl AsRef<Path>) -> MediaResult<PathBuf> {
        let input = input.as_ref();

        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }

        let cmd = Self::command(input);
        let output = self.runner.run(&self.ffmpeg, &cmd.build_args()).await?;

        if !output.success() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(output.stderr_text()),
                output.exit_code,
            ));
        }

        let processed = cmd.output().to_path_buf();
        if !processed.exists() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg produced no output file",
                Some(output.stderr_text()),
                output.exit_code,
            ));
        }

        debug!("Fast-start remux written to {}", processed.display());
        Ok(processed)
    }
}
