//! Fetch tasks: resolve one list item to one thumbnail record.
//!
//! The fallback policy, checked in order:
//! 1. Ask the metadata provider about the item.
//! 2. A read error on the first byte range is inconclusive. The result is a
//!    negative record that turns outdated after the retry delay.
//! 3. Otherwise try the embedded thumbnail, then the external one, then the
//!    raw file. Network items never render from the raw file.
//! 4. Anything else that fails ends in a terminal negative record.

use std::time::Duration;
use tracing::debug;

use crate::backend::BackendKind;
use crate::list::ListEntry;
use crate::provider::{Metadata, MetadataProvider, ThumbnailRenderer, ThumbnailSource};
use crate::record::ThumbnailRecord;

/// Default delay before an inconclusive result is retried.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// One unit of work launched by the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchJob {
    /// Position of the item when the job was launched.
    pub index: usize,
    pub entry: ListEntry,
    pub backend: BackendKind,
}

impl FetchJob {
    pub fn source_id(&self) -> &str {
        &self.entry.source_id
    }
}

/// Completed job together with the record it produced.
#[derive(Clone, Debug)]
pub struct FetchOutcome {
    pub job: FetchJob,
    pub record: ThumbnailRecord,
}

/// Sources to try for `metadata`, most preferred first.
pub fn render_plan(metadata: &Metadata, allow_raw_fallback: bool) -> Vec<ThumbnailSource> {
    let mut plan = Vec::with_capacity(3);
    if let Some(thumb) = &metadata.embedded_thumbnail {
        plan.push(ThumbnailSource::Embedded(thumb.clone()));
    }
    if let Some(thumb) = &metadata.external_thumbnail {
        plan.push(ThumbnailSource::External(thumb.clone()));
    }
    if allow_raw_fallback {
        plan.push(ThumbnailSource::RawFile);
    }
    plan
}

/// Run one fetch to completion. Never fails: every error becomes a record.
pub async fn fetch_thumbnail(
    job: FetchJob,
    metadata: &dyn MetadataProvider,
    renderer: &dyn ThumbnailRenderer,
    retry_delay: Duration,
) -> FetchOutcome {
    let record = resolve(&job, metadata, renderer, retry_delay).await;
    FetchOutcome { job, record }
}

async fn resolve(
    job: &FetchJob,
    metadata: &dyn MetadataProvider,
    renderer: &dyn ThumbnailRenderer,
    retry_delay: Duration,
) -> ThumbnailRecord {
    let source_id = job.source_id();

    let meta = match metadata.metadata(&job.entry).await {
        Ok(meta) => meta,
        Err(e) if e.is_inconclusive() => {
            debug!(source_id, error = %e, "metadata read inconclusive, retrying later");
            return ThumbnailRecord::inconclusive(source_id, retry_delay);
        }
        Err(e) => {
            debug!(source_id, error = %e, "metadata unavailable");
            Metadata::default()
        }
    };

    for source in render_plan(&meta, job.backend.allows_raw_fallback()) {
        match renderer.render(&job.entry, &source).await {
            Ok(thumb) => {
                return ThumbnailRecord::ready(source_id, thumb.data_url, thumb.width, thumb.height);
            }
            Err(e) => {
                debug!(source_id, source = source.label(), error = %e, "render attempt failed");
            }
        }
    }

    ThumbnailRecord::negative(source_id)
}
