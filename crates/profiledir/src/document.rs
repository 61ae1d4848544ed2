//! Document encoding for profiledir.
//!
//! Uploaded documents are embedded in profiles as self-describing data URLs
//! (`data:<mime>;base64,<payload>`). This module holds the data URL type,
//! the raw file input, and the asynchronous reader that turns one into the
//! other.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// MIME type used when the file extension is not recognised.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Extensions previewed inline as images.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// An encoded document payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataUrl(String);

impl DataUrl {
    /// Encode bytes as a base64 data URL with the given MIME type.
    #[must_use]
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)))
    }

    /// The raw data URL text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the encoded text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the encoded text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The MIME type declared in the header, if the URL is well formed.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        let (header, _) = self.split()?;
        Some(header.strip_suffix(";base64").unwrap_or(header))
    }

    /// Decode the payload back to its MIME type and original bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not a base64 data URL or the payload
    /// is not valid base64.
    pub fn decode(&self) -> Result<(String, Vec<u8>)> {
        let (header, payload) = self
            .split()
            .ok_or_else(|| Error::invalid_data_url("expected 'data:<mime>;base64,<payload>'"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::invalid_data_url("payload is not base64 encoded"))?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| Error::invalid_data_url(e.to_string()))?;
        Ok((mime_type.to_string(), bytes))
    }

    fn split(&self) -> Option<(&str, &str)> {
        self.0.strip_prefix("data:")?.split_once(',')
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DataUrl {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where the bytes of a raw file come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Bytes already held in memory.
    Bytes(Vec<u8>),
    /// A file on disk, read when the document is resolved.
    Path(PathBuf),
}

/// A document supplied alongside a create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    /// Original file name, stored as the profile's document file name.
    pub name: String,
    /// Where to read the content from.
    pub source: FileSource,
}

impl RawFile {
    /// A raw file backed by in-memory bytes.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Bytes(bytes.into()),
        }
    }

    /// A raw file read from disk. The file name is taken from the path.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            source: FileSource::Path(path),
        }
    }

    /// MIME type guessed from the file name.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        mime_type_for(&self.name)
    }
}

/// Guess a MIME type from a file name's extension.
#[must_use]
pub fn mime_type_for(file_name: &str) -> &'static str {
    match extension_of(file_name).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// Lower-cased extension of a file name, if any.
#[must_use]
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// How a stored document should be previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    /// Render inline as an image.
    Image,
    /// No inline preview; offer a download.
    Document,
}

impl PreviewKind {
    /// Pick a preview strategy from the document's file name.
    #[must_use]
    pub fn for_file_name(file_name: &str) -> Self {
        match extension_of(file_name) {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => Self::Image,
            _ => Self::Document,
        }
    }
}

impl fmt::Display for PreviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Document => write!(f, "document"),
        }
    }
}

/// Turns raw files into encoded data URLs.
///
/// This is the only suspension point in a save: implementations may read
/// from disk or any other slow source.
#[async_trait]
pub trait DocumentReader: Send + Sync + fmt::Debug {
    /// Read the file and encode it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentRead`] if the content cannot be read.
    async fn read_data_url(&self, file: &RawFile) -> Result<DataUrl>;
}

/// Default reader: in-memory bytes are encoded directly, paths are read
/// with `tokio::fs`.
///
/// With a limit set, a document whose encoded form alone would exceed it is
/// rejected with [`Error::CapacityExceeded`] before any bytes are read.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentReader {
    limit: Option<u64>,
}

impl FsDocumentReader {
    /// A reader that rejects documents whose data URL would exceed `limit`
    /// bytes.
    #[must_use]
    pub fn with_limit(limit: u64) -> Self {
        Self { limit: Some(limit) }
    }

    fn check_size(&self, mime_type: &str, raw_len: u64) -> Result<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let required = encoded_data_url_len(mime_type, raw_len);
        if required > limit {
            warn!(
                "Rejected document: data URL would need {} bytes, limit is {}",
                required, limit
            );
            return Err(Error::CapacityExceeded {
                required,
                quota: limit,
            });
        }
        Ok(())
    }
}

/// Length of `data:<mime>;base64,<payload>` for `raw_len` input bytes.
fn encoded_data_url_len(mime_type: &str, raw_len: u64) -> u64 {
    let header = u64::try_from("data:;base64,".len() + mime_type.len()).unwrap_or(u64::MAX);
    let payload = raw_len.div_ceil(3).saturating_mul(4);
    header.saturating_add(payload)
}

#[async_trait]
impl DocumentReader for FsDocumentReader {
    async fn read_data_url(&self, file: &RawFile) -> Result<DataUrl> {
        let mime_type = file.mime_type();
        let data_url = match &file.source {
            FileSource::Bytes(bytes) => {
                self.check_size(mime_type, u64::try_from(bytes.len()).unwrap_or(u64::MAX))?;
                DataUrl::encode(mime_type, bytes)
            }
            FileSource::Path(path) => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|source| Error::document_read(&file.name, source))?;
                self.check_size(mime_type, metadata.len())?;

                debug!("Reading document {} from {}", file.name, path.display());
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| Error::document_read(&file.name, source))?;
                DataUrl::encode(mime_type, &bytes)
            }
        };
        debug!(
            "Encoded document {} as {} ({} bytes)",
            file.name,
            mime_type,
            data_url.len()
        );
        Ok(data_url)
    }
}
