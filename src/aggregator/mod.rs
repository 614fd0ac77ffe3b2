//! Disk-backed collections of entries keyed by name.

use crate::error::{Error, Result};
use crate::model::Entry;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::SystemTime;

pub mod catalog;
pub mod favorites;
pub mod history;

pub use catalog::Catalog;
pub use favorites::Favorites;
pub use history::{BoundedHistory, HistoryKind};

/// Main categories of the freedesktop menu specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    AudioVideo,
    Audio,
    Video,
    Development,
    Education,
    Game,
    Graphics,
    Network,
    Office,
    Science,
    Settings,
    System,
    Utility,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::AudioVideo,
        Category::Audio,
        Category::Video,
        Category::Development,
        Category::Education,
        Category::Game,
        Category::Graphics,
        Category::Network,
        Category::Office,
        Category::Science,
        Category::Settings,
        Category::System,
        Category::Utility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AudioVideo => "AudioVideo",
            Category::Audio => "Audio",
            Category::Video => "Video",
            Category::Development => "Development",
            Category::Education => "Education",
            Category::Game => "Game",
            Category::Graphics => "Graphics",
            Category::Network => "Network",
            Category::Office => "Office",
            Category::Science => "Science",
            Category::Settings => "Settings",
            Category::System => "System",
            Category::Utility => "Utility",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or(())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    items: BTreeMap<String, Entry>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry with the same name.
    pub fn add(&mut self, entry: Entry) -> Option<Entry> {
        self.items.insert(entry.name.clone(), entry)
    }

    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.items.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.items.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.items.get_mut(name)
    }

    pub fn all(&self) -> Vec<&Entry> {
        self.items.values().collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&Entry> {
        let Ok(category) = category.parse::<Category>() else {
            debug!("Unknown category '{}'", category);
            return Vec::new();
        };
        self.items
            .values()
            .filter(|e| e.categories.iter().any(|c| c == category.as_str()))
            .collect()
    }

    pub fn by_substring(&self, needle: &str) -> Vec<&Entry> {
        self.items
            .values()
            .filter(|e| e.has_substring(needle))
            .collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn replace(&mut self, items: BTreeMap<String, Entry>) {
        self.items = items;
    }
}

/// Shared query surface of every collection; implementors own how the set is
/// loaded from disk.
pub trait Collection {
    fn aggregator(&self) -> &Aggregator;

    fn aggregator_mut(&mut self) -> &mut Aggregator;

    fn load_from_disk(&self) -> Result<BTreeMap<String, Entry>>;

    fn refresh(&mut self);

    fn add(&mut self, entry: Entry) -> Option<Entry> {
        self.aggregator_mut().add(entry)
    }

    fn remove(&mut self, name: &str) -> Option<Entry> {
        self.aggregator_mut().remove(name)
    }

    fn get(&self, name: &str) -> Option<&Entry> {
        self.aggregator().get(name)
    }

    fn all(&self) -> Vec<&Entry> {
        self.aggregator().all()
    }

    fn by_category(&self, category: &str) -> Vec<&Entry> {
        self.aggregator().by_category(category)
    }

    fn by_substring(&self, needle: &str) -> Vec<&Entry> {
        self.aggregator().by_substring(needle)
    }

    fn has(&self, name: &str) -> bool {
        self.aggregator().has(name)
    }
}

/// Every `*.desktop` file directly inside `dir`, with its modification time.
/// A missing directory is an empty set.
pub(crate) fn read_entry_dir(dir: &Path) -> Result<Vec<(Entry, SystemTime)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for item in fs::read_dir(dir).map_err(|e| Error::io(dir, e))?.flatten() {
        let path = item.path();
        if path.extension().and_then(|s| s.to_str()) != Some("desktop") {
            continue;
        }
        let mtime = item
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        match Entry::from_file(&path) {
            Ok(entry) => entries.push((entry, mtime)),
            Err(e) => warn!("Skipping unreadable entry {:?}: {}", path, e),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, categories: &[&str]) -> Entry {
        let mut e = Entry::new(name);
        e.categories = categories.iter().map(|c| c.to_string()).collect();
        e
    }

    #[test]
    fn category_queries() {
        let mut agg = Aggregator::new();
        agg.add(entry("gimp", &["Graphics", "2DGraphics"]));
        agg.add(entry("vlc", &["AudioVideo", "Player"]));
        agg.add(entry("calc", &["Office"]));

        let names: Vec<&str> = agg.by_category("Graphics").iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["gimp"]);
        assert!(agg.by_category("Player").is_empty());
        assert!(agg.by_category("Nonsense").is_empty());
    }

    #[test]
    fn add_replaces_by_name_and_remove_returns_entry() {
        let mut agg = Aggregator::new();
        assert!(agg.add(entry("a", &[])).is_none());
        assert!(agg.add(entry("a", &["Game"])).is_some());
        assert_eq!(agg.len(), 1);
        assert!(agg.has("a"));
        assert!(agg.remove("a").is_some());
        assert!(!agg.has("a"));
        assert!(agg.is_empty());
    }

    #[test]
    fn category_names_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }
}
