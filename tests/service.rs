//! End-to-end scheduling through `ThumbnailService` with in-memory collaborators.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use lzthumb::{
    BackendClassifier, BackendKind, ItemList, ListEntry, Metadata, MetadataError,
    MetadataProvider, RenderError, RenderedThumbnail, ThumbnailConfig, ThumbnailReady,
    ThumbnailRenderer, ThumbnailService, ThumbnailSource,
};

struct Files(Vec<ListEntry>);

impl Files {
    fn numbered(n: usize) -> Arc<Self> {
        Arc::new(Self(
            (0..n).map(|i| ListEntry::file(format!("/pics/{i:02}.png"))).collect(),
        ))
    }
}

impl ItemList for Files {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn item(&self, index: usize) -> Option<ListEntry> {
        self.0.get(index).cloned()
    }

    fn is_scanning(&self) -> bool {
        false
    }
}

struct AllLocal;

impl BackendClassifier for AllLocal {
    fn classify(&self, _entry: &ListEntry) -> BackendKind {
        BackendKind::Local
    }
}

/// Records every request, waits on a gate, and fails scripted ids once.
#[derive(Default)]
struct ScriptedMetadata {
    calls: Mutex<Vec<String>>,
    flaky_once: Mutex<HashSet<String>>,
    gate: Option<Semaphore>,
}

impl ScriptedMetadata {
    fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }
}

#[async_trait]
impl MetadataProvider for ScriptedMetadata {
    async fn metadata(&self, entry: &ListEntry) -> Result<Metadata, MetadataError> {
        self.calls.lock().push(entry.source_id.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.flaky_once.lock().remove(&entry.source_id) {
            return Err(MetadataError::TransientRead {
                offset: 0,
                reason: "unexpected eof".into(),
            });
        }
        Ok(Metadata::default())
    }
}

struct EchoRenderer;

#[async_trait]
impl ThumbnailRenderer for EchoRenderer {
    async fn render(
        &self,
        entry: &ListEntry,
        source: &ThumbnailSource,
    ) -> Result<RenderedThumbnail, RenderError> {
        assert_eq!(source, &ThumbnailSource::RawFile);
        Ok(RenderedThumbnail {
            data_url: format!("data:{}", entry.source_id),
            width: 32,
            height: 24,
        })
    }
}

async fn wait_for_calls(metadata: &ScriptedMetadata, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while metadata.calls().len() < n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("fetches were not launched");
}

async fn recv(rx: &mut tokio::sync::mpsc::Receiver<ThumbnailReady>) -> ThumbnailReady {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for thumbnail")
        .expect("scheduler stopped")
}

#[tokio::test]
async fn test_twenty_local_items_all_fetched() {
    let files = Files::numbered(20);
    let metadata = Arc::new(ScriptedMetadata::gated());

    let (handle, mut rx) = ThumbnailService::new(
        files.clone(),
        Arc::new(AllLocal),
        metadata.clone(),
        Arc::new(EchoRenderer),
    )
    .spawn();
    handle.set_priority_window(0, 5);

    // Local disks allow ten fetches at once; the window comes first.
    wait_for_calls(&metadata, 10).await;
    tokio::task::yield_now().await;
    let first_wave: HashSet<_> = metadata.calls().into_iter().collect();
    assert_eq!(first_wave.len(), 10);
    for i in 0..10 {
        assert!(first_wave.contains(&format!("/pics/{i:02}.png")));
    }

    metadata.open_gate();

    let mut ready_by_id = HashMap::new();
    for _ in 0..20 {
        let ready = recv(&mut rx).await;
        assert_eq!(files.0[ready.index].source_id, ready.source_id);
        assert_eq!(ready.data_url, Some(format!("data:{}", ready.source_id)));
        assert_eq!((ready.width, ready.height), (Some(32), Some(24)));
        assert!(ready_by_id.insert(ready.source_id.clone(), ready.index).is_none());
    }

    assert_eq!(ready_by_id.len(), 20);
    assert_eq!(metadata.calls().len(), 20);
    for entry in &files.0 {
        let record = handle.peek_cached(&entry.source_id).unwrap();
        assert!(record.has_image());
        assert!(!record.outdated());
    }
}

#[tokio::test]
async fn test_changed_item_is_refetched() {
    let files = Files::numbered(3);
    let metadata = Arc::new(ScriptedMetadata::default());

    let (handle, mut rx) = ThumbnailService::new(
        files.clone(),
        Arc::new(AllLocal),
        metadata.clone(),
        Arc::new(EchoRenderer),
    )
    .spawn();
    handle.set_priority_window(0, 3);
    for _ in 0..3 {
        recv(&mut rx).await;
    }

    handle.item_changed(1);
    let ready = recv(&mut rx).await;
    assert_eq!(ready.index, 1);
    assert_eq!(ready.source_id, "/pics/01.png");
    assert_eq!(metadata.calls().len(), 4);
    assert!(!handle.peek_cached("/pics/01.png").unwrap().outdated());
}

#[tokio::test(start_paused = true)]
async fn test_transient_read_error_retried_after_delay() {
    let files = Files::numbered(1);
    let id = files.0[0].source_id.clone();
    let metadata = Arc::new(ScriptedMetadata::default());
    metadata.flaky_once.lock().insert(id.clone());

    let config = ThumbnailConfig {
        io_retry_delay_ms: 3000,
        ..Default::default()
    };
    let (handle, mut rx) = ThumbnailService::new(
        files,
        Arc::new(AllLocal),
        metadata.clone(),
        Arc::new(EchoRenderer),
    )
    .with_config(config)
    .spawn();

    handle.set_priority_window(0, 1);
    let first = rx.recv().await.unwrap();
    assert!(first.data_url.is_none());

    let record = handle.peek_cached(&id).unwrap();
    assert!(record.image_data.is_none());
    assert!(!record.outdated());

    // Rescrolling before the delay does not retry.
    handle.set_priority_window(0, 1);
    tokio::task::yield_now().await;
    assert_eq!(metadata.calls().len(), 1);

    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(handle.peek_cached(&id).unwrap().outdated());

    handle.set_priority_window(0, 1);
    let second = rx.recv().await.unwrap();
    assert_eq!(second.data_url, Some(format!("data:{id}")));
    assert_eq!(metadata.calls().len(), 2);
}

#[tokio::test]
async fn test_fetching_continues_while_notifications_are_unread() {
    let metadata = Arc::new(ScriptedMetadata::default());
    let (handle, _rx) = ThumbnailService::new(
        Files::numbered(200),
        Arc::new(AllLocal),
        metadata.clone(),
        Arc::new(EchoRenderer),
    )
    .spawn();

    handle.set_priority_window(0, 200);
    wait_for_calls(&metadata, 200).await;
    assert_eq!(metadata.calls().len(), 200);
}

#[tokio::test]
async fn test_shutdown_closes_ready_channel() {
    let (handle, mut rx) = ThumbnailService::new(
        Files::numbered(2),
        Arc::new(AllLocal),
        Arc::new(ScriptedMetadata::gated()),
        Arc::new(EchoRenderer),
    )
    .spawn();
    handle.set_priority_window(0, 2);
    handle.shutdown();
    assert!(rx.recv().await.is_none());
}
