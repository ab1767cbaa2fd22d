//! Metadata and rendering collaborators used by fetch tasks.
//!
//! Both are supplied by the host. The scheduler never decodes or resizes
//! images itself.

use async_trait::async_trait;

use crate::list::ListEntry;

/// A pre-rendered thumbnail referenced by metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThumbnailRef {
    /// Raw encoded bytes (e.g. an EXIF thumbnail).
    Bytes(Vec<u8>),
    /// A URL the renderer knows how to resolve.
    Url(String),
}

/// Structured metadata for one item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Thumbnail embedded in the file content itself.
    pub embedded_thumbnail: Option<ThumbnailRef>,
    /// Thumbnail supplied by the backend, e.g. a cloud provider.
    pub external_thumbnail: Option<ThumbnailRef>,
    /// MIME type, when known.
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    /// Reading the content failed in a way that may succeed moments later.
    #[error("read error at byte {offset}: {reason}")]
    TransientRead { offset: u64, reason: String },
    /// Metadata could not be produced.
    #[error("metadata unavailable: {0}")]
    Unavailable(String),
}

impl MetadataError {
    /// Read failures on the very first byte range are treated as races with a
    /// writer rather than as real content problems.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, MetadataError::TransientRead { offset: 0, .. })
    }
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn metadata(&self, entry: &ListEntry) -> Result<Metadata, MetadataError>;
}

/// Where a renderer should take pixels from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThumbnailSource {
    Embedded(ThumbnailRef),
    External(ThumbnailRef),
    /// Decode the original file.
    RawFile,
}

impl ThumbnailSource {
    pub fn label(&self) -> &'static str {
        match self {
            ThumbnailSource::Embedded(_) => "embedded",
            ThumbnailSource::External(_) => "external",
            ThumbnailSource::RawFile => "raw",
        }
    }
}

/// Rendered thumbnail ready for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedThumbnail {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("unsupported source")]
    Unsupported,
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(String),
}

#[async_trait]
pub trait ThumbnailRenderer: Send + Sync {
    async fn render(
        &self,
        entry: &ListEntry,
        source: &ThumbnailSource,
    ) -> Result<RenderedThumbnail, RenderError>;
}
