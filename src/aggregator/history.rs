//! Size-capped histories of launched applications and opened documents.

use super::{read_entry_dir, Aggregator, Collection};
use crate::error::{Error, Result};
use crate::model::Entry;
use chrono::{DateTime, Duration, Local};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Recent,
    Documents,
}

impl HistoryKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            HistoryKind::Recent => "recent",
            HistoryKind::Documents => "documents",
        }
    }
}

/// One entry file per item in a dedicated directory; the oldest item is
/// evicted when a new name would exceed the capacity.
pub struct BoundedHistory {
    kind: HistoryKind,
    dir: PathBuf,
    capacity: usize,
    items: Aggregator,
    /// Names, least recently modified first.
    order: Vec<String>,
    last_stamp: Option<DateTime<Local>>,
}

impl BoundedHistory {
    pub fn new(kind: HistoryKind, dir: PathBuf, capacity: usize) -> Self {
        Self {
            kind,
            dir,
            capacity: capacity.max(1),
            items: Aggregator::new(),
            order: Vec::new(),
            last_stamp: None,
        }
    }

    pub fn kind(&self) -> HistoryKind {
        self.kind
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Items, most recently modified first.
    pub fn newest_first(&self) -> Vec<&Entry> {
        self.order
            .iter()
            .rev()
            .filter_map(|name| self.items.get(name))
            .collect()
    }

    /// Records `entry`, evicting the oldest items first when its name is new
    /// and the history is full. Nothing changes in memory if the entry cannot
    /// be written.
    pub fn add_item(&mut self, mut entry: Entry) -> Result<&Entry> {
        entry.ensure_name();
        let name = entry.name.clone();

        match self.items.get(&name) {
            Some(existing) => entry.file_name = existing.file_name.clone(),
            None => {
                while self.items.len() >= self.capacity {
                    let Some(oldest) = self.order.first().cloned() else {
                        break;
                    };
                    info!("Evicting '{}' from {} history", oldest, self.kind.dir_name());
                    self.remove_item_by_name(&oldest)?;
                }
                entry.file_name = Some(self.free_file_name(&entry));
            }
        }

        entry.modified = Some(self.next_stamp());
        let saved = entry.save(&self.dir)?;
        self.refresh();

        // The reloaded copy is found by file, since its name went through the
        // key-file round trip.
        let file_name = saved.file_name().map(|f| f.to_string_lossy().to_string());
        self.items
            .all()
            .into_iter()
            .find(|item| item.file_name == file_name)
            .ok_or(Error::NoSuchEntry(name))
    }

    /// A file name in the history directory not held by any other item.
    fn free_file_name(&self, entry: &Entry) -> String {
        let base = entry.entry_file_name();
        let taken = |file: &str| self.dir.join(file).exists();
        if !taken(&base) {
            return base;
        }
        let stem = base.strip_suffix(".desktop").unwrap_or(&base);
        (1..)
            .map(|n| format!("{stem}-{n}.desktop"))
            .find(|file| !taken(file))
            .unwrap_or_else(|| base.clone())
    }

    /// Records an opened file as a link to its `file://` URL, keyed by its
    /// full path.
    pub fn add_document(&mut self, path: &Path) -> Result<&Entry> {
        let name = path.to_string_lossy().to_string();
        let mut entry = Entry::link(&name, &format!("file://{}", path.display()));
        entry.path = path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        self.add_item(entry)
    }

    /// Re-stamps and re-saves an item and moves it to the newest position
    /// without reloading the directory.
    pub fn touch_item(&mut self, name: &str) -> Result<()> {
        let stamp = self.next_stamp();
        let entry = self
            .items
            .get_mut(name)
            .ok_or_else(|| Error::NoSuchEntry(name.to_string()))?;
        let previous = entry.modified.replace(stamp);
        if let Err(e) = entry.save(&self.dir) {
            entry.modified = previous;
            return Err(e);
        }

        self.order.retain(|n| n != name);
        self.order.push(name.to_string());
        debug!("Touched '{}' in {} history", name, self.kind.dir_name());
        Ok(())
    }

    pub fn remove_item_by_name(&mut self, name: &str) -> Result<()> {
        let entry = self
            .items
            .get(name)
            .ok_or_else(|| Error::NoSuchEntry(name.to_string()))?;
        if let Err(e) = entry.remove(&self.dir) {
            warn!("Failed to remove '{}' from {} history: {}", name, self.kind.dir_name(), e);
            return Err(e);
        }
        self.refresh();
        Ok(())
    }

    /// Entries sorted oldest first by their stored stamp, falling back to the
    /// file modification time.
    fn load_ordered(&self) -> Result<Vec<Entry>> {
        let mut loaded: Vec<(DateTime<Local>, Entry)> = read_entry_dir(&self.dir)?
            .into_iter()
            .map(|(entry, mtime)| (entry.modified.unwrap_or_else(|| mtime.into()), entry))
            .collect();
        loaded.sort_by(|(a, ea), (b, eb)| a.cmp(b).then_with(|| ea.name.cmp(&eb.name)));
        Ok(loaded.into_iter().map(|(_, entry)| entry).collect())
    }

    /// Strictly increasing stamps, so two adds within one clock tick still
    /// order correctly.
    fn next_stamp(&mut self) -> DateTime<Local> {
        let mut now = Local::now();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now
    }
}

impl Collection for BoundedHistory {
    fn aggregator(&self) -> &Aggregator {
        &self.items
    }

    fn aggregator_mut(&mut self) -> &mut Aggregator {
        &mut self.items
    }

    fn load_from_disk(&self) -> Result<BTreeMap<String, Entry>> {
        Ok(self
            .load_ordered()?
            .into_iter()
            .map(|entry| (entry.name.clone(), entry))
            .collect())
    }

    fn refresh(&mut self) {
        let entries = match self.load_ordered() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load {} history: {}", self.kind.dir_name(), e);
                return;
            }
        };

        let mut items = BTreeMap::new();
        let mut order = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(stamp) = entry.modified {
                if self.last_stamp.is_none_or(|last| stamp > last) {
                    self.last_stamp = Some(stamp);
                }
            }
            order.retain(|n| n != &entry.name);
            order.push(entry.name.clone());
            items.insert(entry.name.clone(), entry);
        }

        self.items.replace(items);
        self.order = order;
    }
}
