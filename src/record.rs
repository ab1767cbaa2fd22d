//! Cached thumbnail records.

use std::time::Duration;
use tokio::time::Instant;

/// A single cache entry for one source item.
///
/// A record with no image data that is not outdated is a terminal negative
/// result: it stays as-is until something external invalidates it.
#[derive(Clone, Debug, PartialEq)]
pub struct ThumbnailRecord {
    /// Stable identifier of the original item (its URL or path).
    pub source_id: String,
    /// Encoded image data (a `data:` URL), or `None` if pending or failed.
    pub image_data: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    outdated: bool,
    /// Inconclusive records become outdated once this instant passes.
    stale_at: Option<Instant>,
}

impl ThumbnailRecord {
    /// Placeholder stored while the first fetch for an item is in flight.
    pub fn pending(source_id: impl Into<String>) -> Self {
        Self::negative(source_id)
    }

    /// Successfully rendered thumbnail.
    pub fn ready(source_id: impl Into<String>, image_data: String, width: u32, height: u32) -> Self {
        Self {
            source_id: source_id.into(),
            image_data: Some(image_data),
            width: Some(width),
            height: Some(height),
            outdated: false,
            stale_at: None,
        }
    }

    /// Terminal negative result. Not retried without external invalidation.
    pub fn negative(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            image_data: None,
            width: None,
            height: None,
            outdated: false,
            stale_at: None,
        }
    }

    /// Negative result that flips to outdated once `retry_after` has elapsed.
    pub fn inconclusive(source_id: impl Into<String>, retry_after: Duration) -> Self {
        Self {
            stale_at: Some(Instant::now() + retry_after),
            ..Self::negative(source_id)
        }
    }

    /// Whether the record must be refetched even though it is cached.
    pub fn outdated(&self) -> bool {
        self.outdated || self.stale_at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn mark_outdated(&mut self) {
        self.outdated = true;
    }

    /// Whether this record holds usable image data.
    pub fn has_image(&self) -> bool {
        self.image_data.is_some()
    }

    /// Whether this record is valid and needs no fetch.
    pub fn is_current(&self) -> bool {
        !self.outdated()
    }
}
