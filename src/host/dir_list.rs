//! Directory listing exposed to the scheduler as an item list.

use parking_lot::RwLock;
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use lzthumb::{ItemList, ListEntry};

#[derive(Default)]
pub struct DirectoryList {
    entries: RwLock<Vec<ListEntry>>,
    scanning: AtomicBool,
}

impl DirectoryList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `dir`, directories first, then by name.
    pub fn scan(&self, dir: &Path, show_hidden: bool) -> io::Result<usize> {
        self.scanning.store(true, AtomicOrdering::SeqCst);
        let result = read_entries(dir, show_hidden);
        if let Ok(items) = &result {
            *self.entries.write() = items.clone();
        }
        self.scanning.store(false, AtomicOrdering::SeqCst);
        result.map(|items| items.len())
    }

    pub fn name_at(&self, index: usize) -> Option<String> {
        let entries = self.entries.read();
        let entry = entries.get(index)?;
        Path::new(&entry.source_id)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
    }
}

impl ItemList for DirectoryList {
    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn item(&self, index: usize) -> Option<ListEntry> {
        self.entries.read().get(index).cloned()
    }

    fn is_scanning(&self) -> bool {
        self.scanning.load(AtomicOrdering::SeqCst)
    }
}

fn read_entries(dir: &Path, show_hidden: bool) -> io::Result<Vec<ListEntry>> {
    let mut items: Vec<(String, ListEntry)> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if !show_hidden && name.starts_with('.') {
                return None;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let source_id = entry.path().to_string_lossy().to_string();
            let list_entry = if is_dir {
                ListEntry::directory(source_id)
            } else {
                ListEntry::file(source_id)
            };
            Some((name.to_lowercase(), list_entry))
        })
        .collect();

    items.sort_by(|(a_name, a), (b_name, b)| match (a.is_directory, b.is_directory) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a_name.cmp(b_name),
    });

    Ok(items.into_iter().map(|(_, entry)| entry).collect())
}
