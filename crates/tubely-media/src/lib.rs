//! FFmpeg/FFprobe CLI wrapper for upload normalization.
//!
//! This crate provides:
//! - A subprocess runner trait with a tokio implementation (timeouts, kill on drop)
//! - FFprobe-based aspect classification
//! - FFmpeg fast-start remux (stream copy, `moov` atom first)

pub mod command;
pub mod error;
pub mod faststart;
pub mod probe;

pub use command::{check_tool, FfmpegCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use error::{MediaError, MediaResult};
pub use faststart::{faststart_output_path, FastStartTranscoder};
pub use probe::{parse_stream_dimensions, AspectClassifier, StreamDimensions};
