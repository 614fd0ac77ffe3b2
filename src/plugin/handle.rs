//! Safe wrapper around one native plugin instance.

use super::abi::{HostContext, PluginVTable, SimpleWidgetVTable};
use super::loader::LoadedModule;
use super::PluginGroup;
use log::warn;
use std::ffi::{c_char, c_void, CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub type SharedHandle = Arc<Mutex<PluginHandle>>;

pub fn lock(handle: &SharedHandle) -> MutexGuard<'_, PluginHandle> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct PluginHandle {
    name: String,
    group: PluginGroup,
    instance: *mut c_void,
    // Keeps the module mapped while `instance` lives.
    module: LoadedModule,
}

// Instances are only touched through the owning mutex.
unsafe impl Send for PluginHandle {}

impl PluginHandle {
    /// Instantiates the module's plugin. The caller has checked that the
    /// table supports `group`.
    pub fn create(name: &str, group: PluginGroup, module: LoadedModule) -> Self {
        let instance = (module.vtable().create)();
        Self {
            name: name.to_string(),
            group,
            instance,
            module,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> PluginGroup {
        self.group
    }

    fn vtable(&self) -> &PluginVTable {
        self.module.vtable()
    }

    pub fn set_host(&self, host: &HostContext, index: usize) {
        (self.vtable().set_host)(self.instance, host, index as u32);
    }

    pub fn init(&self) {
        (self.vtable().init)(self.instance);
    }

    /// Always reaches the plugin. A path it cannot be given arrives empty.
    pub fn quit(&self, config_path: &Path) {
        let path = self.c_path(config_path).unwrap_or_default();
        (self.vtable().quit)(self.instance, path.as_ptr());
    }

    pub fn read_settings(&self, config_path: &Path) {
        if let Some(path) = self.c_path(config_path) {
            (self.vtable().read_settings)(self.instance, path.as_ptr());
        }
    }

    pub fn save_settings(&self) {
        (self.vtable().save_settings)(self.instance);
    }

    pub fn write_settings(&self, config_path: &Path) {
        if let Some(path) = self.c_path(config_path) {
            (self.vtable().write_settings)(self.instance, path.as_ptr());
        }
    }

    pub fn update(&self) {
        if let Some(update) = self.vtable().update {
            update(self.instance);
        }
    }

    pub fn config_widget(&self) -> u64 {
        self.vtable()
            .config_widget
            .map(|f| f(self.instance))
            .unwrap_or(0)
    }

    pub fn background(&self) -> String {
        self.simple(|t, i| read_c_str((t.background)(i)))
            .unwrap_or_default()
    }

    pub fn data(&self) -> String {
        self.simple(|t, i| read_c_str((t.data)(i))).unwrap_or_default()
    }

    pub fn height(&self) -> i32 {
        self.simple(|t, i| (t.height)(i)).unwrap_or(0)
    }

    pub fn width(&self) -> i32 {
        self.simple(|t, i| (t.width)(i)).unwrap_or(0)
    }

    pub fn interval(&self) -> i32 {
        self.simple(|t, i| (t.interval)(i)).unwrap_or(0)
    }

    pub fn activate(&self) {
        self.simple(|t, i| (t.activate)(i));
    }

    pub fn widget(&self) -> u64 {
        let table = self.vtable().tab;
        if table.is_null() {
            return 0;
        }
        unsafe { ((*table).widget)(self.instance) }
    }

    fn simple<T>(
        &self,
        f: impl FnOnce(&SimpleWidgetVTable, *mut c_void) -> T,
    ) -> Option<T> {
        let table = self.vtable().simple_widget;
        if table.is_null() {
            return None;
        }
        Some(f(unsafe { &*table }, self.instance))
    }

    fn c_path(&self, path: &Path) -> Option<CString> {
        match CString::new(path.as_os_str().as_bytes()) {
            Ok(path) => Some(path),
            Err(_) => {
                warn!("Settings path {:?} for plugin '{}' contains NUL", path, self.name);
                None
            }
        }
    }
}

impl Drop for PluginHandle {
    fn drop(&mut self) {
        (self.vtable().destroy)(self.instance);
    }
}

fn read_c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
