//! Prioritized thumbnail cache-and-fetch scheduler.
//!
//! Materializes small preview images for the visible rows of a file listing,
//! plus a prefetch tail below them, without overwhelming the storage backend.
//! Concurrency and prefetch depth follow the backend of the item under the
//! cursor, so a slow device is served one file at a time while local disks
//! get wide, deep prefetching.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lzthumb::{ThumbnailConfig, ThumbnailService};
//! # use lzthumb::{BackendClassifier, ItemList, MetadataProvider, ThumbnailRenderer};
//! # async fn run(
//! #     list: Arc<dyn ItemList>,
//! #     classifier: Arc<dyn BackendClassifier>,
//! #     metadata: Arc<dyn MetadataProvider>,
//! #     renderer: Arc<dyn ThumbnailRenderer>,
//! # ) {
//! let (handle, mut ready_rx) = ThumbnailService::new(list, classifier, metadata, renderer)
//!     .with_config(ThumbnailConfig::load())
//!     .spawn();
//!
//! // Rows 0..40 are on screen
//! handle.set_priority_window(0, 40);
//!
//! while let Some(ready) = ready_rx.recv().await {
//!     println!("row {} -> {:?}", ready.index, ready.data_url.is_some());
//! }
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod list;
pub mod provider;
pub mod record;
pub mod scheduler;
pub mod service;

pub use backend::{BackendKind, BackendProfile, ProfileTable};
pub use cache::ThumbnailCache;
pub use config::{ConfigError, ThumbnailConfig};
pub use fetch::{FetchJob, FetchOutcome};
pub use list::{BackendClassifier, ItemList, ListEntry, ListEvent};
pub use provider::{
    Metadata, MetadataError, MetadataProvider, RenderError, RenderedThumbnail, ThumbnailRef,
    ThumbnailRenderer, ThumbnailSource,
};
pub use record::ThumbnailRecord;
pub use scheduler::{Scheduler, ThumbnailReady};
pub use service::{SchedulerCommand, ThumbnailHandle, ThumbnailService};
