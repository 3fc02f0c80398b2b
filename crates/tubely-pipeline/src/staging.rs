//! Staging request bodies on local disk.

use std::path::Path;

use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::error::{UploadError, UploadResult};

pub const STAGING_PREFIX: &str = "tubely-upload";

/// A request body copied to a temp file. The file is removed on drop.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    len: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Copy at most `max_bytes` of `body` into a new temp file in `dir`.
///
/// Longer and empty bodies are rejected and leave nothing behind.
pub async fn stage_body<R>(
    body: R,
    dir: &Path,
    extension: &str,
    max_bytes: u64,
) -> UploadResult<StagedFile>
where
    R: AsyncRead + Unpin,
{
    let file = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(extension)
        .tempfile_in(dir)?;

    let mut writer = tokio::fs::File::from_std(file.as_file().try_clone()?);

    // One extra byte tells an exact fit from an overflow.
    let mut limited = body.take(max_bytes.saturating_add(1));
    let len = tokio::io::copy(&mut limited, &mut writer).await?;
    writer.flush().await?;

    if len > max_bytes {
        return Err(UploadError::validation(format!(
            "upload exceeds the {} byte limit",
            max_bytes
        )));
    }
    if len == 0 {
        return Err(UploadError::validation("upload body is empty"));
    }

    debug!(bytes = len, "Staged upload at {}", file.path().display());
    Ok(StagedFile { file, len })
}
