//! Publishing plugin instances on the message bus.

use crate::error::Result;
use crate::plugin::{PluginGroup, SharedHandle};
use log::debug;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

pub mod dbus;

pub use dbus::SessionBus;

/// What gets published for one plugin instance.
#[derive(Clone)]
pub struct Adaptor {
    pub name: String,
    pub index: usize,
    pub group: PluginGroup,
    pub handle: SharedHandle,
}

/// Name registration and object publishing, owned by the host and shared
/// with every component that publishes.
pub trait Bus: Send + Sync {
    /// Claims a well-known service name; claiming an owned name again is a
    /// no-op.
    fn claim_name(&self, name: &str) -> Result<()>;

    fn publish(&self, path: &str, adaptor: Adaptor) -> Result<()>;

    fn withdraw(&self, path: &str, group: PluginGroup) -> Result<()>;
}

/// `/<plugin-name>/<index>`, with the name reduced to the bus path alphabet.
pub fn object_path(plugin: &str, index: usize) -> String {
    let element: String = plugin
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let element = if element.is_empty() { "_".to_string() } else { element };
    format!("/{element}/{index}")
}

/// Keeps adaptors in memory; used when no session bus is wanted.
#[derive(Default)]
pub struct MemoryBus {
    names: Mutex<HashSet<String>>,
    objects: Mutex<BTreeMap<String, Adaptor>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        let names = self.names.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = names.iter().cloned().collect();
        names.sort();
        names
    }

    pub fn paths(&self) -> Vec<String> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.keys().cloned().collect()
    }

    pub fn adaptor(&self, path: &str) -> Option<Adaptor> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.get(path).cloned()
    }
}

impl Bus for MemoryBus {
    fn claim_name(&self, name: &str) -> Result<()> {
        let mut names = self.names.lock().unwrap_or_else(|e| e.into_inner());
        if names.insert(name.to_string()) {
            debug!("Claimed service name {}", name);
        }
        Ok(())
    }

    fn publish(&self, path: &str, adaptor: Adaptor) -> Result<()> {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.insert(path.to_string(), adaptor);
        Ok(())
    }

    fn withdraw(&self, path: &str, _group: PluginGroup) -> Result<()> {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_paths_use_the_bus_alphabet() {
        assert_eq!(object_path("clock", 0), "/clock/0");
        assert_eq!(object_path("net-speed.v2", 3), "/net_speed_v2/3");
        assert_eq!(object_path("", 1), "/_/1");
    }

    #[test]
    fn claiming_twice_keeps_one_name() {
        let bus = MemoryBus::new();
        bus.claim_name("org.launcher.Launcher").unwrap();
        bus.claim_name("org.launcher.Launcher").unwrap();
        assert_eq!(bus.names(), vec!["org.launcher.Launcher"]);
    }
}
