use super::{read_entry_dir, Aggregator, Collection};
use crate::error::{Error, Result};
use crate::keyfile;
use crate::model::Entry;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const ORDER_FILE: &str = "order.conf";

/// Favorited entries with a user-defined display order kept in an index file
/// next to the entry files.
pub struct Favorites {
    dir: PathBuf,
    items: Aggregator,
    order: Vec<String>,
}

impl Favorites {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            items: Aggregator::new(),
            order: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Entries in display order.
    pub fn ordered(&self) -> Vec<&Entry> {
        self.order
            .iter()
            .filter_map(|name| self.items.get(name))
            .collect()
    }

    pub fn add_item(&mut self, mut entry: Entry) -> Result<&Entry> {
        entry.ensure_name();
        if let Some(existing) = self.items.get(&entry.name) {
            entry.file_name = existing.file_name.clone();
        }
        let path = entry.save(&self.dir)?;
        entry.file_name = path.file_name().map(|f| f.to_string_lossy().to_string());

        let name = entry.name.clone();
        if !self.order.contains(&name) {
            self.order.push(name.clone());
            self.save_order()?;
        }
        self.items.add(entry);
        self.items.get(&name).ok_or(Error::NoSuchEntry(name))
    }

    pub fn remove_item_by_name(&mut self, name: &str) -> Result<()> {
        let entry = self
            .items
            .get(name)
            .ok_or_else(|| Error::NoSuchEntry(name.to_string()))?;
        entry.remove(&self.dir)?;
        self.items.remove(name);
        self.order.retain(|n| n != name);
        self.save_order()
    }

    /// Swaps `name` with its neighbour towards the head (`up`) or the tail.
    /// Returns whether anything moved; the new order is not saved.
    pub fn change_order(&mut self, name: &str, up: bool) -> bool {
        let Some(pos) = self.order.iter().position(|n| n == name) else {
            return false;
        };
        let target = if up {
            match pos.checked_sub(1) {
                Some(target) => target,
                None => return false,
            }
        } else {
            if pos + 1 >= self.order.len() {
                return false;
            }
            pos + 1
        };
        self.order.swap(pos, target);
        debug!("Moved favorite '{}' from {} to {}", name, pos, target);
        true
    }

    pub fn save_order(&self) -> Result<()> {
        keyfile::write_index(&self.dir.join(ORDER_FILE), &self.order)
    }
}

impl Collection for Favorites {
    fn aggregator(&self) -> &Aggregator {
        &self.items
    }

    fn aggregator_mut(&mut self) -> &mut Aggregator {
        &mut self.items
    }

    fn load_from_disk(&self) -> Result<BTreeMap<String, Entry>> {
        Ok(read_entry_dir(&self.dir)?
            .into_iter()
            .map(|(entry, _)| (entry.name.clone(), entry))
            .collect())
    }

    /// Stored order first; entries missing from the index follow by name.
    fn refresh(&mut self) {
        let items = match self.load_from_disk() {
            Ok(items) => items,
            Err(e) => {
                warn!("Failed to load favorites: {}", e);
                return;
            }
        };

        let mut order: Vec<String> = Vec::new();
        for name in keyfile::read_index(&self.dir.join(ORDER_FILE)) {
            if items.contains_key(&name) && !order.contains(&name) {
                order.push(name);
            }
        }
        for name in items.keys() {
            if !order.contains(name) {
                order.push(name.clone());
            }
        }

        self.items.replace(items);
        self.order = order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn change_order_is_a_noop_at_the_boundaries() {
        let dir = tempdir().unwrap();
        let mut favorites = Favorites::new(dir.path().to_path_buf());
        for name in ["A", "B"] {
            favorites.add_item(Entry::new(name)).unwrap();
        }
        assert!(!favorites.change_order("A", true));
        assert!(!favorites.change_order("B", false));
        assert!(!favorites.change_order("missing", true));
        assert!(favorites.change_order("A", false));
        assert_eq!(favorites.order(), ["B", "A"]);
    }

    #[test]
    fn order_survives_a_reload_only_after_save() {
        let dir = tempdir().unwrap();
        let mut favorites = Favorites::new(dir.path().to_path_buf());
        for name in ["A", "B", "C"] {
            favorites.add_item(Entry::new(name)).unwrap();
        }
        favorites.change_order("C", true);
        favorites.refresh();
        assert_eq!(favorites.order(), ["A", "B", "C"]);

        favorites.change_order("C", true);
        favorites.save_order().unwrap();
        favorites.refresh();
        assert_eq!(favorites.order(), ["A", "C", "B"]);
    }

    #[test]
    fn removing_drops_file_and_order_slot() {
        let dir = tempdir().unwrap();
        let mut favorites = Favorites::new(dir.path().to_path_buf());
        favorites.add_item(Entry::new("A")).unwrap();
        favorites.add_item(Entry::new("B")).unwrap();
        favorites.remove_item_by_name("A").unwrap();
        favorites.refresh();
        assert_eq!(favorites.order(), ["B"]);
        assert!(!favorites.has("A"));
    }
}
