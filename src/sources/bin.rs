use crate::model::Entry;
use crate::sources::Source;
use anyhow::Result;
use log::{debug, info};
use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Every executable file on a `PATH`-style search list.
pub struct BinSource {
    pub search_path: String,
}

impl BinSource {
    pub fn new(search_path: &str) -> Self {
        Self {
            search_path: search_path.to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(&env::var("PATH").unwrap_or_default())
    }
}

impl Source for BinSource {
    fn scan(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for path_str in self.search_path.split(':').filter(|p| !p.is_empty()) {
            let path = Path::new(path_str);
            if !path.exists() {
                continue;
            }
            debug!("Scanning binaries in {:?}", path);
            let Ok(read_dir) = fs::read_dir(path) else {
                continue;
            };
            for entry in read_dir.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                if let Ok(metadata) = fs::metadata(&path) {
                    // Check if executable
                    if metadata.permissions().mode() & 0o111 != 0 {
                        entries.push(Entry::from_executable(&path));
                    }
                }
            }
        }
        info!("BinSource: found {} entries", entries.len());
        Ok(entries)
    }
}
