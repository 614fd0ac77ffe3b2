//! C-compatible boundary between the host and native plugin modules.
//!
//! A module exports [`ENTRY_SYMBOL`], a function returning a pointer to a
//! static [`PluginVTable`]. The table must stay valid for as long as the
//! module is loaded. Every function receives the opaque instance pointer that
//! `create` returned. Strings returned by a plugin are NUL-terminated and
//! owned by the plugin; they stay valid until the next call on the same
//! instance.

use super::PluginGroup;
use std::ffi::{c_char, c_void};

/// Bumped on any layout change of the tables below.
pub const ABI_VERSION: u32 = 1;

pub const ENTRY_SYMBOL: &[u8] = b"launcher_plugin_entry\0";

pub type EntryFn = unsafe extern "C" fn() -> *const PluginVTable;

pub const GROUP_SIMPLE_WIDGET: u32 = 0;
pub const GROUP_TAB: u32 = 1;
pub const GROUP_GENERIC: u32 = 2;

impl PluginGroup {
    pub fn abi_tag(&self) -> u32 {
        match self {
            PluginGroup::SimpleWidget => GROUP_SIMPLE_WIDGET,
            PluginGroup::Tab => GROUP_TAB,
            PluginGroup::Generic => GROUP_GENERIC,
        }
    }
}

/// Handed to every instance so it can ask the host for an update.
#[repr(C)]
pub struct HostContext {
    pub data: *mut c_void,
    pub request_update: extern "C" fn(data: *mut c_void, index: u32),
}

// `data` points at a mutex-guarded sender owned by the registry.
unsafe impl Send for HostContext {}
unsafe impl Sync for HostContext {}

#[repr(C)]
pub struct PluginVTable {
    pub abi_version: u32,
    pub group: u32,
    pub create: extern "C" fn() -> *mut c_void,
    pub destroy: extern "C" fn(instance: *mut c_void),
    pub set_host: extern "C" fn(instance: *mut c_void, host: *const HostContext, index: u32),
    pub init: extern "C" fn(instance: *mut c_void),
    pub quit: extern "C" fn(instance: *mut c_void, config_path: *const c_char),
    pub read_settings: extern "C" fn(instance: *mut c_void, config_path: *const c_char),
    pub save_settings: extern "C" fn(instance: *mut c_void),
    pub write_settings: extern "C" fn(instance: *mut c_void, config_path: *const c_char),
    pub update: Option<extern "C" fn(instance: *mut c_void)>,
    /// Opaque handle of the configuration sub-widget, 0 when there is none.
    pub config_widget: Option<extern "C" fn(instance: *mut c_void) -> u64>,
    /// Required for [`GROUP_SIMPLE_WIDGET`], null otherwise.
    pub simple_widget: *const SimpleWidgetVTable,
    /// Required for [`GROUP_TAB`], null otherwise.
    pub tab: *const TabVTable,
}

// Tables are immutable statics inside the module.
unsafe impl Sync for PluginVTable {}

#[repr(C)]
pub struct SimpleWidgetVTable {
    pub background: extern "C" fn(instance: *mut c_void) -> *const c_char,
    pub data: extern "C" fn(instance: *mut c_void) -> *const c_char,
    pub height: extern "C" fn(instance: *mut c_void) -> i32,
    pub width: extern "C" fn(instance: *mut c_void) -> i32,
    /// Milliseconds between updates; zero or less disables the timer.
    pub interval: extern "C" fn(instance: *mut c_void) -> i32,
    pub activate: extern "C" fn(instance: *mut c_void),
}

#[repr(C)]
pub struct TabVTable {
    pub widget: extern "C" fn(instance: *mut c_void) -> u64,
}

impl PluginVTable {
    /// Whether the table provides what `group` needs.
    pub fn supports(&self, group: PluginGroup) -> bool {
        if self.group != group.abi_tag() {
            return false;
        }
        match group {
            PluginGroup::SimpleWidget => !self.simple_widget.is_null(),
            PluginGroup::Tab => !self.tab.is_null(),
            PluginGroup::Generic => true,
        }
    }
}
