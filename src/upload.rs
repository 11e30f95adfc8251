use std::path::Path;

use bytes::Bytes;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

use crate::{Result, RiskRadarError};

/// MIME type sent for scan report parts.
pub const NESSUS_MIME: &str = "application/xml";

/// In-memory file payload: bytes plus the filename reported to the server.
///
/// Cloning is cheap; the contents are reference counted so a retried
/// upload rebuilds its multipart body without copying.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    filename: String,
    contents: Bytes,
    mime: String,
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("filename", &self.filename)
            .field("len", &self.contents.len())
            .field("mime", &self.mime)
            .finish()
    }
}

impl UploadFile {
    /// Creates a payload from a filename and raw bytes.
    ///
    /// Fails when the filename is empty.
    pub fn new(filename: impl Into<String>, contents: impl Into<Bytes>) -> Result<Self> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(RiskRadarError::InvalidInput(
                "filename is required for uploads".to_owned(),
            ));
        }
        Ok(Self {
            filename,
            contents: contents.into(),
            mime: NESSUS_MIME.to_owned(),
        })
    }

    /// Reads a file from disk, using its final path component as filename.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                RiskRadarError::InvalidInput(format!("path has no filename: {}", path.display()))
            })?
            .to_owned();
        let contents = tokio::fs::read(path).await.map_err(|err| {
            RiskRadarError::InvalidInput(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::new(filename, contents)
    }

    /// Overrides the MIME type of the multipart part.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn contents(&self) -> &Bytes {
        &self.contents
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Lowercase hex SHA-256 of the contents.
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.contents))
    }

    /// Whether the filename carries the `.nessus` extension (case-insensitive).
    pub fn has_nessus_extension(&self) -> bool {
        self.filename.to_ascii_lowercase().ends_with(".nessus")
    }

    pub(crate) fn to_part(&self) -> Result<reqwest::multipart::Part> {
        let length = self.contents.len() as u64;
        reqwest::multipart::Part::stream_with_length(
            reqwest::Body::from(self.contents.clone()),
            length,
        )
        .file_name(self.filename.clone())
        .mime_str(&self.mime)
        .map_err(|err| RiskRadarError::InvalidInput(format!("invalid mime type: {err}")))
    }
}

/// Result of one file in a batch upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub file: String,
    pub result: Result<JsonValue>,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Where a file stands within a batch upload.
#[derive(Clone, Copy, Debug)]
pub enum UploadStage<'a> {
    Uploading,
    Completed(&'a JsonValue),
    Failed(&'a RiskRadarError),
}

impl UploadStage<'_> {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }
}

/// Progress event passed to the batch upload callback.
///
/// Every file reports `Uploading` first and then exactly one of
/// `Completed` or `Failed`.
#[derive(Clone, Copy, Debug)]
pub struct UploadProgress<'a> {
    /// 0-based position in the batch.
    pub file_index: usize,
    pub total_files: usize,
    pub file_name: &'a str,
    pub stage: UploadStage<'a>,
}
