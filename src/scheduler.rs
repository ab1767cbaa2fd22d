//! Cursor-walking thumbnail scheduler.
//!
//! The scheduler sweeps a cursor left to right from the start of the priority
//! window, through a backend-dependent prefetch tail, and launches fetch jobs
//! for items that need one. It never blocks: [`Scheduler::advance`] either
//! makes progress or halts, and jobs it decides to launch are queued for the
//! driver to pick up with [`Scheduler::drain_launches`].
//!
//! All methods run to completion on the caller's task, so no state here is
//! shared with fetches in flight.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::backend::{BackendKind, BackendProfile, ProfileTable};
use crate::cache::ThumbnailCache;
use crate::fetch::{FetchJob, FetchOutcome};
use crate::list::{BackendClassifier, ItemList, ListEntry, ListEvent};
use crate::record::ThumbnailRecord;

/// Notification raised when a fetch completes for an item still in the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThumbnailReady {
    /// Current position of the item, re-validated by id before dispatch.
    pub index: usize,
    pub source_id: String,
    pub data_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

struct ActiveTask {
    /// Set when the item changed while its fetch was in flight.
    invalidated: bool,
}

pub struct Scheduler {
    list: Arc<dyn ItemList>,
    classifier: Arc<dyn BackendClassifier>,
    cache: Arc<ThumbnailCache>,
    profiles: ProfileTable,
    cursor: usize,
    begin: usize,
    end: usize,
    backend: Option<BackendKind>,
    profile: BackendProfile,
    active: HashMap<String, ActiveTask>,
    launches: Vec<FetchJob>,
}

impl Scheduler {
    pub fn new(
        list: Arc<dyn ItemList>,
        classifier: Arc<dyn BackendClassifier>,
        cache: Arc<ThumbnailCache>,
        profiles: ProfileTable,
    ) -> Self {
        Self {
            list,
            classifier,
            cache,
            profiles,
            cursor: 0,
            begin: 0,
            end: 0,
            backend: None,
            profile: BackendProfile::default(),
            active: HashMap::new(),
            launches: Vec::new(),
        }
    }

    /// Set the range of rows to serve first. Empty ranges are ignored.
    pub fn set_priority_window(&mut self, begin: usize, end: usize) {
        if begin >= end {
            return;
        }
        self.begin = begin;
        self.end = end;
        self.cursor = begin;
        self.advance();
    }

    /// React to a mutation of the host list.
    pub fn handle_list_event(&mut self, event: ListEvent) {
        if let ListEvent::Changed { index } = event
            && let Some(entry) = self.list.item(index)
        {
            self.cache.mark_outdated(&entry.source_id);
            if let Some(task) = self.active.get_mut(&entry.source_id) {
                task.invalidated = true;
            }
        }
        debug!(?event, "list changed, rewinding cursor");
        self.rewind();
    }

    /// Record a finished fetch, then continue scheduling.
    ///
    /// Returns the ready notification, or `None` if the item is no longer in
    /// the list.
    pub fn complete(&mut self, outcome: FetchOutcome) -> Option<ThumbnailReady> {
        let FetchOutcome { job, mut record } = outcome;
        let source_id = job.entry.source_id;

        let invalidated = self
            .active
            .remove(&source_id)
            .is_some_and(|task| task.invalidated);
        if invalidated {
            record.mark_outdated();
        }

        let ready = self.locate(job.index, &source_id).map(|index| ThumbnailReady {
            index,
            source_id: source_id.clone(),
            data_url: record.image_data.clone(),
            width: record.width,
            height: record.height,
        });
        match &ready {
            Some(ev) => debug!(
                source_id = %source_id,
                index = ev.index,
                found = record.has_image(),
                "thumbnail fetch finished"
            ),
            None => debug!(source_id = %source_id, "item left the list, dropping notification"),
        }

        self.cache.put(source_id, record);

        if invalidated {
            self.rewind();
        } else {
            self.advance();
        }
        ready
    }

    /// Walk the cursor forward, launching fetches until a halt condition hits.
    pub fn advance(&mut self) {
        loop {
            if self.list.is_scanning() {
                return;
            }
            if self.cursor >= self.list.len() {
                return;
            }
            let Some(entry) = self.list.item(self.cursor) else {
                return;
            };

            self.update_profile(&entry);

            if self.active.len() >= self.profile.max_active_tasks {
                return;
            }
            if self.cursor >= self.end.saturating_add(self.profile.prefetch_depth) {
                return;
            }

            let index = self.cursor;
            self.cursor += 1;

            if self.needs_fetch(&entry) {
                self.launch(index, entry);
            } else {
                trace!(index, source_id = %entry.source_id, "skipping");
            }
        }
    }

    /// Take the jobs launched since the last call, in launch order.
    pub fn drain_launches(&mut self) -> Vec<FetchJob> {
        std::mem::take(&mut self.launches)
    }

    /// Cached record for `source_id`, possibly outdated. Does not affect recency.
    pub fn peek_cached(&self, source_id: &str) -> Option<ThumbnailRecord> {
        self.cache.peek(source_id)
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &Arc<ThumbnailCache> {
        &self.cache
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn window(&self) -> (usize, usize) {
        (self.begin, self.end)
    }

    /// Profile currently applied to the whole scheduler.
    pub fn profile(&self) -> BackendProfile {
        self.profile
    }

    pub fn backend(&self) -> Option<BackendKind> {
        self.backend
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, source_id: &str) -> bool {
        self.active.contains_key(source_id)
    }

    fn rewind(&mut self) {
        self.cursor = self.begin;
        self.advance();
    }

    fn needs_fetch(&self, entry: &ListEntry) -> bool {
        if entry.is_directory || self.active.contains_key(&entry.source_id) {
            return false;
        }
        !self
            .cache
            .get(&entry.source_id)
            .is_some_and(|record| record.is_current())
    }

    fn update_profile(&mut self, entry: &ListEntry) {
        let kind = self.classifier.classify(entry);
        if self.backend != Some(kind) {
            self.backend = Some(kind);
            self.profile = self.profiles.profile_for(kind);
            debug!(
                ?kind,
                max_active = self.profile.max_active_tasks,
                prefetch = self.profile.prefetch_depth,
                "backend profile changed"
            );
        }
    }

    fn launch(&mut self, index: usize, entry: ListEntry) {
        let backend = self.backend.unwrap_or(BackendKind::Local);
        debug!(index, source_id = %entry.source_id, ?backend, "launching thumbnail fetch");

        self.cache
            .put_if_absent(&entry.source_id, ThumbnailRecord::pending(entry.source_id.clone()));
        self.active
            .insert(entry.source_id.clone(), ActiveTask { invalidated: false });
        self.launches.push(FetchJob {
            index,
            entry,
            backend,
        });
    }

    /// Where `source_id` lives now: `hint` if it still matches, else a scan.
    fn locate(&self, hint: usize, source_id: &str) -> Option<usize> {
        if self
            .list
            .item(hint)
            .is_some_and(|entry| entry.source_id == source_id)
        {
            return Some(hint);
        }
        self.list.position_of(source_id)
    }
}
