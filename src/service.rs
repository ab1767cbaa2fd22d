//! Async driver for the thumbnail scheduler.
//!
//! A single background task owns the [`Scheduler`] and is the only place that
//! mutates it. Hosts talk to it through a [`ThumbnailHandle`] and receive
//! [`ThumbnailReady`] notifications on a channel that should be polled in the
//! main event loop. Fetches run as futures polled by the same task, so every
//! state transition completes before the next command or completion is seen.
//!
//! Notifications never block the task. When the channel is full the
//! notification is dropped; the record is already cached and can be read back
//! with [`ThumbnailHandle::peek_cached`].

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

use crate::cache::ThumbnailCache;
use crate::config::ThumbnailConfig;
use crate::fetch::{FetchJob, FetchOutcome, fetch_thumbnail};
use crate::list::{BackendClassifier, ItemList, ListEvent};
use crate::provider::{MetadataProvider, ThumbnailRenderer};
use crate::record::ThumbnailRecord;
use crate::scheduler::{Scheduler, ThumbnailReady};

/// Capacity of the ready-notification channel.
const READY_CHANNEL_CAPACITY: usize = 64;

/// Request sent to the scheduler task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerCommand {
    SetPriorityWindow { begin: usize, end: usize },
    List(ListEvent),
}

/// Host-side collaborators and settings for one list view.
pub struct ThumbnailService {
    list: Arc<dyn ItemList>,
    classifier: Arc<dyn BackendClassifier>,
    metadata: Arc<dyn MetadataProvider>,
    renderer: Arc<dyn ThumbnailRenderer>,
    config: ThumbnailConfig,
}

impl ThumbnailService {
    pub fn new(
        list: Arc<dyn ItemList>,
        classifier: Arc<dyn BackendClassifier>,
        metadata: Arc<dyn MetadataProvider>,
        renderer: Arc<dyn ThumbnailRenderer>,
    ) -> Self {
        Self {
            list,
            classifier,
            metadata,
            renderer,
            config: ThumbnailConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ThumbnailConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the scheduler task and return its handle and ready receiver.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> (ThumbnailHandle, mpsc::Receiver<ThumbnailReady>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel::<SchedulerCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<ThumbnailReady>(READY_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let cache = Arc::new(ThumbnailCache::new(self.config.cache_capacity));

        let scheduler = Scheduler::new(
            self.list,
            self.classifier,
            cache.clone(),
            self.config.profiles.clone(),
        );
        let fetcher = Fetcher {
            metadata: self.metadata,
            renderer: self.renderer,
            retry_delay: self.config.retry_delay(),
        };

        tokio::spawn(scheduler_task(
            scheduler,
            fetcher,
            command_rx,
            ready_tx,
            cancel.clone(),
        ));

        let handle = ThumbnailHandle {
            tx: command_tx,
            cache,
            cancel,
        };
        (handle, ready_rx)
    }
}

/// Handle for driving the scheduler from the host UI.
#[derive(Clone)]
pub struct ThumbnailHandle {
    tx: mpsc::UnboundedSender<SchedulerCommand>,
    cache: Arc<ThumbnailCache>,
    cancel: CancellationToken,
}

impl ThumbnailHandle {
    /// Serve rows `begin..end` first. Ignored when `begin >= end`.
    pub fn set_priority_window(&self, begin: usize, end: usize) {
        if begin >= end {
            return;
        }
        let _ = self
            .tx
            .send(SchedulerCommand::SetPriorityWindow { begin, end });
    }

    /// Forward a list mutation to the scheduler.
    pub fn notify(&self, event: ListEvent) {
        let _ = self.tx.send(SchedulerCommand::List(event));
    }

    pub fn scan_completed(&self) {
        self.notify(ListEvent::ScanCompleted);
    }

    pub fn spliced(&self) {
        self.notify(ListEvent::Spliced);
    }

    pub fn sorted(&self) {
        self.notify(ListEvent::Sorted);
    }

    pub fn item_changed(&self, index: usize) {
        self.notify(ListEvent::Changed { index });
    }

    /// Cached record for render-time lookups. May be outdated; the caller
    /// decides whether to show it while a refresh is pending.
    pub fn peek_cached(&self, source_id: &str) -> Option<ThumbnailRecord> {
        self.cache.peek(source_id)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Stop the scheduler task. Fetches still in flight are dropped.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

struct Fetcher {
    metadata: Arc<dyn MetadataProvider>,
    renderer: Arc<dyn ThumbnailRenderer>,
    retry_delay: Duration,
}

impl Fetcher {
    fn start(&self, job: FetchJob) -> BoxFuture<'static, FetchOutcome> {
        let metadata = self.metadata.clone();
        let renderer = self.renderer.clone();
        let retry_delay = self.retry_delay;
        Box::pin(async move {
            fetch_thumbnail(job, metadata.as_ref(), renderer.as_ref(), retry_delay).await
        })
    }
}

/// Background task that owns the scheduler.
async fn scheduler_task(
    mut scheduler: Scheduler,
    fetcher: Fetcher,
    mut rx: mpsc::UnboundedReceiver<SchedulerCommand>,
    tx: mpsc::Sender<ThumbnailReady>,
    cancel: CancellationToken,
) {
    let mut in_flight: FuturesUnordered<BoxFuture<'static, FetchOutcome>> = FuturesUnordered::new();

    loop {
        for job in scheduler.drain_launches() {
            in_flight.push(fetcher.start(job));
        }

        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            command = rx.recv() => match command {
                Some(SchedulerCommand::SetPriorityWindow { begin, end }) => {
                    scheduler.set_priority_window(begin, end);
                }
                Some(SchedulerCommand::List(event)) => {
                    scheduler.handle_list_event(event);
                }
                // Every handle is gone
                None => break,
            },
            Some(outcome) = in_flight.next(), if !in_flight.is_empty() => {
                if let Some(ready) = scheduler.complete(outcome)
                    && let Err(TrySendError::Full(ready)) = tx.try_send(ready)
                {
                    trace!(source_id = %ready.source_id, "ready channel full, notification dropped");
                }
            }
        }
    }

    debug!(dropped = in_flight.len(), "thumbnail scheduler stopped");
}
