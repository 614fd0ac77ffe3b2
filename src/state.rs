use crate::aggregator::{BoundedHistory, Catalog, Collection, Favorites, HistoryKind};
use crate::bus::Bus;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor;
use crate::matcher::FuzzyMatcher;
use crate::model::{Entry, ExecArgs};
use crate::plugin::{DynamicLoader, PluginRegistry, RegistrySettings};
use log::{info, warn};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// The shell as shared between the event loop and bus handlers.
pub type SharedShell = Arc<Mutex<Shell>>;

pub fn lock(shell: &Mutex<Shell>) -> MutexGuard<'_, Shell> {
    shell.lock().unwrap_or_else(|e| e.into_inner())
}

/// Everything the launcher owns at runtime.
pub struct Shell {
    config: Config,
    terminal: Option<String>,
    pub catalog: Catalog,
    pub favorites: Favorites,
    pub recent: BoundedHistory,
    pub documents: BoundedHistory,
    pub registry: PluginRegistry,
}

impl Shell {
    /// Builds the shell with native plugin loading on the given bus.
    pub fn new(config: Config, bus: Arc<dyn Bus>) -> Self {
        let registry = PluginRegistry::new(
            RegistrySettings::from_config(&config),
            Box::new(DynamicLoader),
            bus,
        );
        let catalog = Catalog::from_config(&config);
        Self::with_parts(config, catalog, registry)
    }

    pub fn with_parts(config: Config, catalog: Catalog, registry: PluginRegistry) -> Self {
        Self {
            terminal: executor::terminal_command(config.general.terminal.as_deref()),
            favorites: Favorites::new(config.favorites_dir()),
            recent: BoundedHistory::new(
                HistoryKind::Recent,
                config.recent_dir(),
                config.history.recent_size,
            ),
            documents: BoundedHistory::new(
                HistoryKind::Documents,
                config.documents_dir(),
                config.history.documents_size,
            ),
            catalog,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn load_collections(&mut self) {
        self.catalog.refresh();
        self.favorites.refresh();
        self.recent.refresh();
        self.documents.refresh();
    }

    /// Loads every collection from disk, then discovers plugins and loads
    /// the enabled ones.
    pub fn boot(&mut self) {
        self.load_collections();
        self.registry.discover();
        let loaded = self.registry.load_enabled();
        info!("Shell ready with {} plugin instances", loaded.len());
    }

    /// Favorites first, then recent history, then the catalog.
    pub fn resolve(&self, name: &str) -> Option<&Entry> {
        self.favorites
            .get(name)
            .or_else(|| self.recent.get(name))
            .or_else(|| self.catalog.get(name))
    }

    /// Launches `name` and records it in the recent history.
    pub fn run(&mut self, name: &str, args: &ExecArgs) -> bool {
        let Some(entry) = self.resolve(name).cloned() else {
            warn!("Nothing named '{}' to run", name);
            return false;
        };
        if !entry.launch(args, self.terminal.as_deref()) {
            return false;
        }
        if let Err(e) = self.recent.add_item(entry) {
            warn!("Failed to record '{}' in recent history: {}", name, e);
        }
        true
    }

    pub fn favorite(&mut self, name: &str) -> Result<()> {
        let entry = self
            .recent
            .get(name)
            .or_else(|| self.catalog.get(name))
            .cloned()
            .ok_or_else(|| Error::NoSuchEntry(name.to_string()))?;
        self.favorites.add_item(entry)?;
        Ok(())
    }

    pub fn unfavorite(&mut self, name: &str) -> Result<()> {
        self.favorites.remove_item_by_name(name)
    }

    /// Moves a favorite one slot and persists the new order.
    pub fn move_favorite(&mut self, name: &str, up: bool) -> Result<bool> {
        if !self.favorites.change_order(name, up) {
            return Ok(false);
        }
        self.favorites.save_order()?;
        Ok(true)
    }

    /// Writes a hidden copy of a catalog entry into the user application
    /// directory, which shadows the installed one.
    pub fn hide(&mut self, name: &str) -> Result<()> {
        let mut entry = self
            .catalog
            .aggregator()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchEntry(name.to_string()))?;
        let dir = self
            .catalog
            .user_dir()
            .cloned()
            .ok_or_else(|| Error::NoSuchEntry(name.to_string()))?;

        // `file_name` holds the desktop-file id, so the copy shadows the original.
        entry.hidden = true;
        entry.save(&dir)?;
        info!("Hid '{}' via {:?}", name, dir);
        self.catalog.refresh();
        Ok(())
    }

    pub fn touch_recent(&mut self, name: &str) -> Result<()> {
        self.recent.touch_item(name)
    }

    /// Records the file in the document history and opens it.
    pub fn open_document(&mut self, path: &Path) -> bool {
        let entry = match self.documents.add_document(path) {
            Ok(entry) => entry.clone(),
            Err(e) => {
                warn!("Failed to record document {:?}: {}", path, e);
                return false;
            }
        };
        entry.launch(&ExecArgs::new(), self.terminal.as_deref())
    }

    /// Catalog entries containing `query`, best fuzzy match first.
    pub fn search(&self, query: &str) -> Vec<&Entry> {
        FuzzyMatcher::new().rank(query, self.catalog.by_substring(query))
    }

    pub fn shutdown(&mut self) {
        self.registry.unload_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::plugin::StaticLoader;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _data: TempDir,
        _user_apps: TempDir,
        system_apps: TempDir,
        shell: Shell,
    }

    fn fixture() -> Fixture {
        let data = tempdir().unwrap();
        let user_apps = tempdir().unwrap();
        let system_apps = tempdir().unwrap();
        for (file, name) in [("editor.desktop", "Editor"), ("files.desktop", "Files"), ("term.desktop", "Terminal")] {
            fs::write(
                system_apps.path().join(file),
                format!("[Desktop Entry]\nName={name}\nExec={}\nComment=Edit things\n", name.to_lowercase()),
            )
            .unwrap();
        }

        let mut config = Config::default();
        config.general.data_dir = Some(data.path().to_path_buf());
        let catalog = Catalog::new(
            vec![user_apps.path().to_path_buf(), system_apps.path().to_path_buf()],
            None,
            &[],
        );
        let registry = PluginRegistry::new(
            RegistrySettings::from_config(&config),
            Box::new(StaticLoader::new()),
            Arc::new(MemoryBus::new()),
        );
        let mut shell = Shell::with_parts(config, catalog, registry);
        shell.boot();

        Fixture {
            _data: data,
            _user_apps: user_apps,
            system_apps,
            shell,
        }
    }

    #[test]
    fn favorites_keep_a_persisted_order() {
        let mut f = fixture();
        f.shell.favorite("Editor").unwrap();
        f.shell.favorite("Files").unwrap();
        assert!(f.shell.move_favorite("Files", true).unwrap());
        assert!(!f.shell.move_favorite("Files", true).unwrap());

        f.shell.favorites.refresh();
        assert_eq!(f.shell.favorites.order(), ["Files", "Editor"]);

        f.shell.unfavorite("Files").unwrap();
        assert_eq!(f.shell.favorites.order(), ["Editor"]);
    }

    #[test]
    fn unknown_names_are_reported() {
        let mut f = fixture();
        assert!(matches!(f.shell.favorite("Nope"), Err(Error::NoSuchEntry(_))));
        assert!(!f.shell.run("Nope", &ExecArgs::new()));
        assert!(f.shell.touch_recent("Nope").is_err());
    }

    #[test]
    fn hide_shadows_the_installed_entry() {
        let mut f = fixture();
        f.shell.hide("Files").unwrap();
        assert!(!f.shell.catalog.has("Files"));
        assert!(f.system_apps.path().join("files.desktop").exists());
        assert!(f.shell.catalog.has("Editor"));
    }

    #[test]
    fn search_ranks_name_matches_first() {
        let mut f = fixture();
        let names: Vec<String> = f.shell.search("edit").into_iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["Editor", "Files", "Terminal"]);
    }
}
