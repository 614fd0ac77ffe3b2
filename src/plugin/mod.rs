//! Plugin descriptors, native module loading and the runtime registry.

use crate::keyfile::KeyFile;
use crate::model::desktop_file::ENTRY_GROUP;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub mod abi;
pub mod handle;
pub mod loader;
pub mod registry;

pub use handle::{PluginHandle, SharedHandle};
pub use loader::{DynamicLoader, LoadedModule, ModuleLoader, StaticLoader};
pub use registry::{update_interval, Capability, LoadedPlugin, PluginRegistry, RegistrySettings};

const GROUP_KEY: &str = "X-Launcher-Plugin-Group";
const AUTHOR_KEY: &str = "X-Launcher-Plugin-Author";
const VERSION_KEY: &str = "X-Launcher-Plugin-Version";
const LOCATION_KEY: &str = "X-Launcher-Plugin-Location";
const LIBRARY_KEY: &str = "X-Launcher-Plugin-Library";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PluginGroup {
    SimpleWidget,
    Tab,
    Generic,
}

impl PluginGroup {
    pub const ALL: [PluginGroup; 3] = [PluginGroup::SimpleWidget, PluginGroup::Tab, PluginGroup::Generic];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simple-widget" | "simplewidget" => Some(PluginGroup::SimpleWidget),
            "tab" => Some(PluginGroup::Tab),
            "generic" => Some(PluginGroup::Generic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginGroup::SimpleWidget => "simple-widget",
            PluginGroup::Tab => "tab",
            PluginGroup::Generic => "generic",
        }
    }
}

impl fmt::Display for PluginGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata from a plugin's descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    pub name: String,
    /// Group as written; see [`PluginDescriptor::group`].
    pub group: String,
    pub author: String,
    pub comment: String,
    pub url: String,
    pub version: String,
    /// Directory holding the compiled module.
    pub location: PathBuf,
    /// Module file name inside `location`.
    pub library: String,
    pub descriptor_path: PathBuf,
}

impl PluginDescriptor {
    pub fn group(&self) -> Option<PluginGroup> {
        PluginGroup::parse(&self.group)
    }

    pub fn module_path(&self) -> PathBuf {
        self.location.join(&self.library)
    }

    /// `None` when the file has no entry group or no name.
    pub fn from_key_file(key_file: &KeyFile, descriptor_path: &Path) -> Option<Self> {
        let group = key_file.group(ENTRY_GROUP)?;
        let name = group.get_string("Name").filter(|n| !n.trim().is_empty())?;
        let base = descriptor_path.parent().unwrap_or(Path::new("."));

        let location = match group.get_string(LOCATION_KEY) {
            Some(loc) if Path::new(&loc).is_absolute() => PathBuf::from(loc),
            Some(loc) => base.join(loc),
            None => base.to_path_buf(),
        };
        let library = group
            .get_string(LIBRARY_KEY)
            .unwrap_or_else(|| format!("lib{}.so", name.to_lowercase()));
        let text = |key: &str| group.get_string(key).unwrap_or_default();

        Some(Self {
            group: text(GROUP_KEY),
            author: text(AUTHOR_KEY),
            comment: text("Comment"),
            url: text("URL"),
            version: text(VERSION_KEY),
            location,
            library,
            descriptor_path: descriptor_path.to_path_buf(),
            name,
        })
    }
}

/// Scans each directory (and one level of subdirectories) for `*.desktop`
/// descriptors. The first descriptor found for a name wins.
pub fn discover_descriptors(dirs: &[PathBuf]) -> BTreeMap<String, PluginDescriptor> {
    let mut descriptors: BTreeMap<String, PluginDescriptor> = BTreeMap::new();

    for dir in dirs.iter().filter(|d| d.is_dir()) {
        for item in WalkDir::new(dir)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = item.path();
            if path.extension().and_then(|s| s.to_str()) != Some("desktop") {
                continue;
            }
            let descriptor = match KeyFile::load(path) {
                Ok(kf) => PluginDescriptor::from_key_file(&kf, path),
                Err(e) => {
                    warn!("Failed to read plugin descriptor {:?}: {}", path, e);
                    continue;
                }
            };
            let Some(descriptor) = descriptor else {
                warn!("Ignoring plugin descriptor without a name: {:?}", path);
                continue;
            };

            if let Some(existing) = descriptors.get(&descriptor.name) {
                warn!(
                    "Plugin '{}' at {:?} is shadowed by {:?}",
                    descriptor.name, path, existing.descriptor_path
                );
                continue;
            }
            info!("Discovered plugin '{}' ({}) at {:?}", descriptor.name, descriptor.group, path);
            descriptors.insert(descriptor.name.clone(), descriptor);
        }
    }

    descriptors
}
