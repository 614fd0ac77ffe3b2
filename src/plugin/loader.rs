use super::abi::{EntryFn, PluginVTable, ENTRY_SYMBOL};
use super::PluginDescriptor;
use crate::error::{Error, Result};
use libloading::Library;
use log::debug;
use std::collections::HashMap;

/// A resolved plugin table, plus the library that keeps it mapped.
pub struct LoadedModule {
    vtable: *const PluginVTable,
    _library: Option<Library>,
}

// The table is immutable and the library handle is thread-safe.
unsafe impl Send for LoadedModule {}

impl LoadedModule {
    pub fn from_static(vtable: &'static PluginVTable) -> Self {
        Self {
            vtable,
            _library: None,
        }
    }

    pub fn vtable(&self) -> &PluginVTable {
        // Non-null by construction and valid while `_library` is alive.
        unsafe { &*self.vtable }
    }
}

pub trait ModuleLoader: Send {
    fn open(&self, descriptor: &PluginDescriptor) -> Result<LoadedModule>;
}

/// Opens `<location>/<library>` as a shared object.
#[derive(Debug, Default)]
pub struct DynamicLoader;

impl ModuleLoader for DynamicLoader {
    fn open(&self, descriptor: &PluginDescriptor) -> Result<LoadedModule> {
        let path = descriptor.module_path();
        debug!("Opening plugin module {:?}", path);

        let library = unsafe { Library::new(&path) }.map_err(|source| Error::ModuleOpen {
            plugin: descriptor.name.clone(),
            path: path.clone(),
            source,
        })?;

        let symbol_missing = || Error::SymbolNotFound {
            plugin: descriptor.name.clone(),
            path: path.clone(),
            symbol: String::from_utf8_lossy(&ENTRY_SYMBOL[..ENTRY_SYMBOL.len() - 1]).to_string(),
        };

        let vtable = unsafe {
            let entry = library
                .get::<EntryFn>(ENTRY_SYMBOL)
                .map_err(|_| symbol_missing())?;
            entry()
        };
        if vtable.is_null() {
            return Err(symbol_missing());
        }

        Ok(LoadedModule {
            vtable,
            _library: Some(library),
        })
    }
}

/// Modules linked into the host, looked up by plugin name.
#[derive(Default)]
pub struct StaticLoader {
    modules: HashMap<String, &'static PluginVTable>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, vtable: &'static PluginVTable) {
        self.modules.insert(name.to_string(), vtable);
    }

    pub fn with(mut self, name: &str, vtable: &'static PluginVTable) -> Self {
        self.register(name, vtable);
        self
    }
}

impl ModuleLoader for StaticLoader {
    fn open(&self, descriptor: &PluginDescriptor) -> Result<LoadedModule> {
        self.modules
            .get(&descriptor.name)
            .copied()
            .map(LoadedModule::from_static)
            .ok_or_else(|| Error::SymbolNotFound {
                plugin: descriptor.name.clone(),
                path: descriptor.module_path(),
                symbol: "static module".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const LIBC_CANDIDATES: &[&str] = &[
        "/lib/x86_64-linux-gnu/libc.so.6",
        "/usr/lib/x86_64-linux-gnu/libc.so.6",
        "/lib/aarch64-linux-gnu/libc.so.6",
        "/usr/lib/aarch64-linux-gnu/libc.so.6",
        "/lib64/libc.so.6",
        "/usr/lib64/libc.so.6",
        "/usr/lib/libc.so.6",
        "/lib/libc.so.6",
    ];

    /// A shared object that exists on the host but exports no plugin entry.
    fn system_libc() -> Option<PathBuf> {
        LIBC_CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
    }

    fn descriptor(location: PathBuf) -> PluginDescriptor {
        PluginDescriptor {
            name: "Missing".to_string(),
            group: "generic".to_string(),
            author: String::new(),
            comment: String::new(),
            url: String::new(),
            version: String::new(),
            location,
            library: "libmissing.so".to_string(),
            descriptor_path: PathBuf::new(),
        }
    }

    #[test]
    fn missing_module_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DynamicLoader.open(&descriptor(dir.path().to_path_buf()));
        assert!(matches!(result, Err(Error::ModuleOpen { .. })));
    }

    #[test]
    fn static_loader_reports_unknown_names() {
        let loader = StaticLoader::new();
        let result = loader.open(&descriptor(PathBuf::from("/nowhere")));
        assert!(matches!(result, Err(Error::SymbolNotFound { .. })));
    }

    #[test]
    fn module_without_the_entry_symbol_is_rejected() {
        let Some(libc) = system_libc() else {
            eprintln!("no libc.so.6 found, skipping");
            return;
        };
        let mut descriptor = descriptor(libc.parent().unwrap().to_path_buf());
        descriptor.library = libc.file_name().unwrap().to_string_lossy().to_string();

        match DynamicLoader.open(&descriptor) {
            Err(Error::SymbolNotFound { symbol, path, .. }) => {
                assert_eq!(symbol, "launcher_plugin_entry");
                assert_eq!(path, libc);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("libc should not export a plugin entry"),
        }
    }
}
