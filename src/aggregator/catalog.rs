use super::{Aggregator, Collection};
use crate::config::Config;
use crate::error::Result;
use crate::model::Entry;
use crate::sources::{bin::BinSource, desktop::DesktopSource, Source};
use log::{info, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Installed applications plus a name index of executables on `PATH`.
pub struct Catalog {
    desktop: DesktopSource,
    bin: Option<BinSource>,
    exclude: Vec<Regex>,
    apps: Aggregator,
    binaries: BTreeMap<String, Entry>,
}

impl Catalog {
    pub fn new(dirs: Vec<PathBuf>, bin: Option<BinSource>, exclude: &[String]) -> Self {
        let exclude = exclude
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring invalid exclude pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();

        Self {
            desktop: DesktopSource::new(dirs),
            bin,
            exclude,
            apps: Aggregator::new(),
            binaries: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let bin = config.catalog.scan_path.then(BinSource::from_env);
        Self::new(DesktopSource::standard_dirs(), bin, &config.catalog.exclude)
    }

    /// The directory user overrides are written to.
    pub fn user_dir(&self) -> Option<&PathBuf> {
        self.desktop.dirs.first()
    }

    pub fn binary(&self, name: &str) -> Option<&Entry> {
        self.binaries.get(name)
    }

    /// Application entry, or the executable of that exact name.
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.apps.get(name).or_else(|| self.binaries.get(name))
    }

    fn is_excluded(&self, entry: &Entry) -> bool {
        let file_name = entry.file_name.as_deref().unwrap_or_default();
        self.exclude
            .iter()
            .any(|re| re.is_match(&entry.name) || re.is_match(file_name))
    }

    fn load_binaries(&self) -> BTreeMap<String, Entry> {
        let Some(bin) = &self.bin else {
            return BTreeMap::new();
        };
        let mut binaries = BTreeMap::new();
        match bin.scan() {
            Ok(entries) => {
                for entry in entries {
                    // Earlier PATH directories win.
                    binaries.entry(entry.name.clone()).or_insert(entry);
                }
            }
            Err(e) => warn!("Failed to scan PATH: {}", e),
        }
        binaries
    }
}

impl Collection for Catalog {
    fn aggregator(&self) -> &Aggregator {
        &self.apps
    }

    fn aggregator_mut(&mut self) -> &mut Aggregator {
        &mut self.apps
    }

    fn load_from_disk(&self) -> Result<BTreeMap<String, Entry>> {
        let mut items = BTreeMap::new();
        let entries = self.desktop.scan().unwrap_or_else(|e| {
            warn!("Failed to scan application directories: {}", e);
            Vec::new()
        });
        for entry in entries {
            if self.is_excluded(&entry) {
                continue;
            }
            items.entry(entry.name.clone()).or_insert(entry);
        }
        Ok(items)
    }

    fn refresh(&mut self) {
        match self.load_from_disk() {
            Ok(items) => self.apps.replace(items),
            Err(e) => warn!("Failed to load the application catalog: {}", e),
        }
        self.binaries = self.load_binaries();
        info!(
            "Catalog: {} applications, {} executables",
            self.apps.len(),
            self.binaries.len()
        );
    }

    fn get(&self, name: &str) -> Option<&Entry> {
        self.find(name)
    }

    fn has(&self, name: &str) -> bool {
        self.apps.has(name) || self.binaries.contains_key(name)
    }

    /// Applications matching the text, plus the executable whose name is
    /// exactly the text.
    fn by_substring(&self, needle: &str) -> Vec<&Entry> {
        let mut found = self.apps.by_substring(needle);
        if !self.apps.has(needle) {
            if let Some(binary) = self.binaries.get(needle) {
                found.push(binary);
            }
        }
        found
    }
}
