//! Runtime table of loaded plugin instances.
//!
//! An instance moves through four states. A module is *loaded* once it has
//! been opened and its table checked against the descriptor's group. It is
//! *initialized* after it has the host context, read its settings and run
//! `init`. It is *running* once published on the bus. On unload it gets
//! `quit` first, then leaves the table, the bus and memory.

use super::abi::{HostContext, ABI_VERSION};
use super::handle::{self, PluginHandle, SharedHandle};
use super::loader::ModuleLoader;
use super::{discover_descriptors, PluginDescriptor, PluginGroup};
use crate::bus::{object_path, Adaptor, Bus};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::keyfile::{read_index, write_index};
use calloop::channel::Sender;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub descriptor_dirs: Vec<PathBuf>,
    /// Root under which per-instance settings files live.
    pub settings_dir: PathBuf,
    pub enabled_file: PathBuf,
    pub service_name: String,
    /// Shortest interval between automatic simple-widget updates.
    pub update_floor: Duration,
}

impl RegistrySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            descriptor_dirs: config.plugin_dirs(),
            settings_dir: config.plugin_settings_dir(),
            enabled_file: config.enabled_plugins_file(),
            service_name: config.plugins.service_name.clone(),
            update_floor: Duration::from_millis(config.plugins.update_floor_ms),
        }
    }
}

/// Automatic update period for a simple widget asking for `raw_ms`.
/// `None` when the plugin asks for no automatic updates.
pub fn update_interval(raw_ms: i32, floor: Duration) -> Option<Duration> {
    if raw_ms <= 0 {
        return None;
    }
    Some(Duration::from_millis(raw_ms as u64).max(floor))
}

/// The group-specific surface of an instance.
pub enum Capability {
    SimpleWidget {
        handle: SharedHandle,
        interval: Option<Duration>,
    },
    Tab {
        handle: SharedHandle,
    },
    Generic {
        handle: SharedHandle,
    },
}

impl Capability {
    pub fn handle(&self) -> &SharedHandle {
        match self {
            Capability::SimpleWidget { handle, .. }
            | Capability::Tab { handle }
            | Capability::Generic { handle } => handle,
        }
    }

    pub fn group(&self) -> PluginGroup {
        match self {
            Capability::SimpleWidget { .. } => PluginGroup::SimpleWidget,
            Capability::Tab { .. } => PluginGroup::Tab,
            Capability::Generic { .. } => PluginGroup::Generic,
        }
    }
}

pub struct LoadedPlugin {
    pub name: String,
    pub index: usize,
    /// Unique per load, so a reused index is never mistaken for its
    /// previous occupant.
    pub serial: u64,
    pub settings_path: PathBuf,
    pub object_path: String,
    pub capability: Capability,
}

type UpdateRoute = Mutex<Option<Sender<usize>>>;

extern "C" fn request_update(data: *mut c_void, index: u32) {
    if data.is_null() {
        return;
    }
    // `data` is the registry's boxed route, alive until every instance is gone.
    let route = unsafe { &*(data as *const UpdateRoute) };
    let route = route.lock().unwrap_or_else(|e| e.into_inner());
    match route.as_ref() {
        Some(sender) => {
            if sender.send(index as usize).is_err() {
                debug!("Update request for instance {} outlived the event loop", index);
            }
        }
        None => debug!("Update request for instance {} with no event loop", index),
    }
}

pub struct PluginRegistry {
    settings: RegistrySettings,
    loader: Box<dyn ModuleLoader>,
    bus: Arc<dyn Bus>,
    descriptors: BTreeMap<String, PluginDescriptor>,
    instances: BTreeMap<usize, LoadedPlugin>,
    next_serial: u64,
    host: Box<HostContext>,
    // Declared after `host` and dropped after every instance.
    updates: Box<UpdateRoute>,
}

impl PluginRegistry {
    pub fn new(settings: RegistrySettings, loader: Box<dyn ModuleLoader>, bus: Arc<dyn Bus>) -> Self {
        let updates: Box<UpdateRoute> = Box::new(Mutex::new(None));
        let host = Box::new(HostContext {
            data: &*updates as *const UpdateRoute as *mut c_void,
            request_update,
        });
        Self {
            settings,
            loader,
            bus,
            descriptors: BTreeMap::new(),
            instances: BTreeMap::new(),
            next_serial: 0,
            host,
            updates,
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn bus(&self) -> &Arc<dyn Bus> {
        &self.bus
    }

    /// Rebuilds the descriptor table. Running instances are untouched.
    pub fn discover(&mut self) -> usize {
        self.descriptors = discover_descriptors(&self.settings.descriptor_dirs);
        info!("{} plugin descriptors available", self.descriptors.len());
        self.descriptors.len()
    }

    pub fn descriptors(&self) -> &BTreeMap<String, PluginDescriptor> {
        &self.descriptors
    }

    pub fn descriptor(&self, name: &str) -> Option<&PluginDescriptor> {
        self.descriptors.get(name)
    }

    /// All descriptors when `group` is `None`.
    pub fn list_by_group(&self, group: Option<PluginGroup>) -> BTreeMap<&str, &PluginDescriptor> {
        self.descriptors
            .iter()
            .filter(|(_, d)| group.is_none() || d.group() == group)
            .map(|(name, d)| (name.as_str(), d))
            .collect()
    }

    /// Loads, initializes and publishes a new instance of `name`. Returns
    /// its index, or `None` after logging why it could not be loaded.
    pub fn load(&mut self, name: &str) -> Option<usize> {
        match self.try_load(name) {
            Ok(index) => Some(index),
            Err(e @ Error::UnknownGroup { .. }) => {
                warn!("{}", e);
                None
            }
            Err(e) => {
                error!("Failed to load plugin '{}': {}", name, e);
                None
            }
        }
    }

    fn try_load(&mut self, name: &str) -> Result<usize> {
        let descriptor = self
            .descriptors
            .get(name)
            .ok_or_else(|| Error::UnknownPlugin(name.to_string()))?;
        let group = descriptor.group().ok_or_else(|| Error::UnknownGroup {
            plugin: name.to_string(),
            group: descriptor.group.clone(),
        })?;

        let module = self.loader.open(descriptor)?;
        let vtable = module.vtable();
        if vtable.abi_version != ABI_VERSION {
            return Err(Error::AbiMismatch {
                plugin: name.to_string(),
                expected: ABI_VERSION,
                found: vtable.abi_version,
            });
        }
        if !vtable.supports(group) {
            return Err(Error::GroupMismatch {
                plugin: name.to_string(),
                group: group.to_string(),
            });
        }

        let index = self.free_index();
        let settings_path = self.configuration_path(&format!("{name}-{index}.conf"));
        let plugin = PluginHandle::create(name, group, module);
        plugin.set_host(&self.host, index);
        plugin.read_settings(&settings_path);
        plugin.init();
        debug!("Initialized plugin '{}' as instance {}", name, index);

        let interval = plugin.interval();
        let handle: SharedHandle = Arc::new(Mutex::new(plugin));
        let capability = match group {
            PluginGroup::SimpleWidget => Capability::SimpleWidget {
                interval: update_interval(interval, self.settings.update_floor),
                handle: handle.clone(),
            },
            PluginGroup::Tab => Capability::Tab {
                handle: handle.clone(),
            },
            PluginGroup::Generic => Capability::Generic {
                handle: handle.clone(),
            },
        };

        let path = object_path(name, index);
        let adaptor = Adaptor {
            name: name.to_string(),
            index,
            group,
            handle: handle.clone(),
        };
        let published = self
            .bus
            .claim_name(&self.settings.service_name)
            .and_then(|()| self.bus.publish(&path, adaptor));
        if let Err(e) = published {
            handle::lock(&handle).quit(&settings_path);
            return Err(e);
        }

        info!("Plugin '{}' ({}) running at {}", name, group, path);
        self.next_serial += 1;
        self.instances.insert(
            index,
            LoadedPlugin {
                name: name.to_string(),
                index,
                serial: self.next_serial,
                settings_path,
                object_path: path,
                capability,
            },
        );
        Ok(index)
    }

    fn free_index(&self) -> usize {
        (0..)
            .find(|i| !self.instances.contains_key(i))
            .unwrap_or(self.instances.len())
    }

    /// Quits and destroys instance `index`. `false` when no such instance.
    pub fn unload(&mut self, index: usize, config_path: &Path) -> bool {
        let Some(plugin) = self.instances.remove(&index) else {
            debug!("No plugin instance {} to unload", index);
            return false;
        };

        handle::lock(plugin.capability.handle()).quit(config_path);
        if let Err(e) = self.bus.withdraw(&plugin.object_path, plugin.capability.group()) {
            warn!("Failed to withdraw {} from the bus: {}", plugin.object_path, e);
        }
        info!("Unloaded plugin '{}' instance {}", plugin.name, index);
        true
    }

    pub fn unload_all(&mut self) {
        let indexes = self.indexes();
        for index in indexes {
            if let Some(path) = self.settings_path(index) {
                self.unload(index, &path);
            }
        }
    }

    /// Maps a settings file name to its absolute location under the
    /// per-user settings root.
    pub fn configuration_path(&self, file_name: &str) -> PathBuf {
        let path = self.settings.settings_dir.join(file_name);
        std::path::absolute(&path).unwrap_or(path)
    }

    pub fn settings_path(&self, index: usize) -> Option<PathBuf> {
        self.instances.get(&index).map(|p| p.settings_path.clone())
    }

    pub fn instance(&self, index: usize) -> Option<&LoadedPlugin> {
        self.instances.get(&index)
    }

    pub fn indexes(&self) -> Vec<usize> {
        self.instances.keys().copied().collect()
    }

    pub fn instances(&self) -> impl Iterator<Item = &LoadedPlugin> {
        self.instances.values()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Sends future `request_update` calls from plugins to `sender`.
    /// Until a route is set those requests are dropped.
    pub fn route_updates(&self, sender: Sender<usize>) {
        *self.updates.lock().unwrap_or_else(|e| e.into_inner()) = Some(sender);
    }

    /// Runs `update` on instance `index`. `false` when no such instance.
    pub fn update(&self, index: usize) -> bool {
        match self.instances.get(&index) {
            Some(plugin) => {
                handle::lock(plugin.capability.handle()).update();
                true
            }
            None => {
                debug!("Dropping update for missing instance {}", index);
                false
            }
        }
    }

    pub fn enabled(&self) -> Vec<String> {
        read_index(&self.settings.enabled_file)
    }

    pub fn enable(&self, name: &str) -> Result<()> {
        let mut names = self.enabled();
        if names.iter().any(|n| n == name) {
            return Ok(());
        }
        names.push(name.to_string());
        write_index(&self.settings.enabled_file, &names)
    }

    pub fn disable(&self, name: &str) -> Result<()> {
        let mut names = self.enabled();
        let before = names.len();
        names.retain(|n| n != name);
        if names.len() == before {
            return Ok(());
        }
        write_index(&self.settings.enabled_file, &names)
    }

    /// Loads one instance of every enabled plugin, in enabled-set order.
    pub fn load_enabled(&mut self) -> Vec<usize> {
        self.enabled()
            .iter()
            .filter_map(|name| self.load(name))
            .collect()
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        self.unload_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_clamps_to_the_floor() {
        let floor = Duration::from_millis(1000);
        assert_eq!(update_interval(200, floor), Some(floor));
        assert_eq!(update_interval(5000, floor), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn non_positive_interval_disables_updates() {
        assert_eq!(update_interval(0, Duration::from_millis(1000)), None);
        assert_eq!(update_interval(-5, Duration::from_millis(1000)), None);
    }
}
