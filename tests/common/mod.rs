//! `extern "C"` plugins linked into the test binaries, plus descriptor
//! helpers shared by the registry and runtime tests.
#![allow(dead_code)]

use launcher::plugin::abi::{
    HostContext, PluginVTable, SimpleWidgetVTable, TabVTable, ABI_VERSION, GROUP_GENERIC,
    GROUP_SIMPLE_WIDGET, GROUP_TAB,
};
use launcher::plugin::handle::{self, SharedHandle};
use launcher::plugin::StaticLoader;
use std::ffi::{c_char, c_void, CStr, CString};
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Mutex;

struct Counter {
    updates: u32,
    data: CString,
    host: *const HostContext,
    index: u32,
    settings: Option<PathBuf>,
}

fn state<'a>(instance: *mut c_void) -> &'a mut Counter {
    unsafe { &mut *(instance as *mut Counter) }
}

/// Every path handed to `quit`, across all instances in the test binary.
pub static QUIT_PATHS: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

fn c_path(path: *const c_char) -> PathBuf {
    PathBuf::from(unsafe { CStr::from_ptr(path) }.to_string_lossy().into_owned())
}

extern "C" fn create() -> *mut c_void {
    Box::into_raw(Box::new(Counter {
        updates: 0,
        data: CString::default(),
        host: ptr::null(),
        index: 0,
        settings: None,
    })) as *mut c_void
}

extern "C" fn destroy(instance: *mut c_void) {
    drop(unsafe { Box::from_raw(instance as *mut Counter) });
}

extern "C" fn set_host(instance: *mut c_void, host: *const HostContext, index: u32) {
    let counter = state(instance);
    counter.host = host;
    counter.index = index;
}

extern "C" fn init(_: *mut c_void) {}

extern "C" fn quit(instance: *mut c_void, config_path: *const c_char) {
    QUIT_PATHS.lock().unwrap().push(c_path(config_path));
    write_settings(instance, config_path);
}

extern "C" fn read_settings(instance: *mut c_void, config_path: *const c_char) {
    state(instance).settings = Some(c_path(config_path));
}

extern "C" fn save_settings(_: *mut c_void) {}

extern "C" fn write_settings(instance: *mut c_void, config_path: *const c_char) {
    let path = c_path(config_path);
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = fs::write(&path, format!("updates={}\n", state(instance).updates));
}

extern "C" fn update(instance: *mut c_void) {
    let counter = state(instance);
    counter.updates += 1;
    counter.data = CString::new(counter.updates.to_string()).unwrap_or_default();
}

extern "C" fn background(_: *mut c_void) -> *const c_char {
    c"#202020".as_ptr()
}

extern "C" fn data(instance: *mut c_void) -> *const c_char {
    state(instance).data.as_ptr()
}

extern "C" fn height(_: *mut c_void) -> i32 {
    32
}

extern "C" fn width(_: *mut c_void) -> i32 {
    96
}

extern "C" fn interval(_: *mut c_void) -> i32 {
    10
}

extern "C" fn activate(instance: *mut c_void) {
    let counter = state(instance);
    if let Some(host) = unsafe { counter.host.as_ref() } {
        (host.request_update)(host.data, counter.index);
    }
}

extern "C" fn config_widget(_: *mut c_void) -> u64 {
    42
}

extern "C" fn tab_widget(_: *mut c_void) -> u64 {
    7
}

static SIMPLE: SimpleWidgetVTable = SimpleWidgetVTable {
    background,
    data,
    height,
    width,
    interval,
    activate,
};

static TAB: TabVTable = TabVTable { widget: tab_widget };

pub static CLOCK: PluginVTable = PluginVTable {
    abi_version: ABI_VERSION,
    group: GROUP_SIMPLE_WIDGET,
    create,
    destroy,
    set_host,
    init,
    quit,
    read_settings,
    save_settings,
    write_settings,
    update: Some(update),
    config_widget: None,
    simple_widget: &SIMPLE,
    tab: ptr::null(),
};

pub static NOTES: PluginVTable = PluginVTable {
    abi_version: ABI_VERSION,
    group: GROUP_GENERIC,
    create,
    destroy,
    set_host,
    init,
    quit,
    read_settings,
    save_settings,
    write_settings,
    update: None,
    config_widget: Some(config_widget),
    simple_widget: ptr::null(),
    tab: ptr::null(),
};

pub static BROWSER: PluginVTable = PluginVTable {
    abi_version: ABI_VERSION,
    group: GROUP_TAB,
    create,
    destroy,
    set_host,
    init,
    quit,
    read_settings,
    save_settings,
    write_settings,
    update: Some(update),
    config_widget: None,
    simple_widget: ptr::null(),
    tab: &TAB,
};

pub static OUTDATED: PluginVTable = PluginVTable {
    abi_version: ABI_VERSION + 1,
    group: GROUP_GENERIC,
    create,
    destroy,
    set_host,
    init,
    quit,
    read_settings,
    save_settings,
    write_settings,
    update: None,
    config_widget: None,
    simple_widget: ptr::null(),
    tab: ptr::null(),
};

pub fn write_descriptor(dir: &Path, name: &str, group: &str) {
    fs::write(
        dir.join(format!("{}.desktop", name.to_lowercase())),
        format!("[Desktop Entry]\nName={name}\nComment={name} plugin\nX-Launcher-Plugin-Group={group}\n"),
    )
    .unwrap();
}

pub fn static_loader() -> StaticLoader {
    StaticLoader::new()
        .with("Clock", &CLOCK)
        .with("Notes", &NOTES)
        .with("Browser", &BROWSER)
        .with("Outdated", &OUTDATED)
        .with("Liar", &NOTES)
        .with("Sidebar", &NOTES)
}

/// How many times `update` has run on a counting plugin.
pub fn updates(widget: &SharedHandle) -> u32 {
    handle::lock(widget).data().parse().unwrap_or(0)
}
