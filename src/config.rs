use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub plugins: PluginConfig,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GeneralConfig {
    /// Terminal command prefix, e.g. `alacritty -e`.
    #[serde(default)]
    pub terminal: Option<String>,
    /// Overrides the per-user data root.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_size")]
    pub recent_size: usize,
    #[serde(default = "default_history_size")]
    pub documents_size: usize,
}

fn default_history_size() -> usize { 20 }

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            recent_size: default_history_size(),
            documents_size: default_history_size(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_true")]
    pub scan_path: bool,
    /// Regexes matched against entry names and file names.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_true() -> bool { true }

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            scan_path: true,
            exclude: Vec::new(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PluginConfig {
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
    #[serde(default = "default_update_floor_ms")]
    pub update_floor_ms: u64,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Publish on the session bus; otherwise adaptors stay in-process.
    #[serde(default = "default_true")]
    pub bus: bool,
}

fn default_update_floor_ms() -> u64 { 1000 }
fn default_service_name() -> String { "org.launcher.Launcher".to_string() }

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            update_floor_ms: default_update_floor_ms(),
            service_name: default_service_name(),
            bus: true,
        }
    }
}

const SYSTEM_PLUGIN_DIRS: [&str; 2] = ["/usr/local/share/launcher/plugins", "/usr/share/launcher/plugins"];

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "launcher", "launcher")
}

impl Config {
    pub fn data_root(&self) -> PathBuf {
        if let Some(dir) = &self.general.data_dir {
            return dir.clone();
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".launcher"))
    }

    pub fn favorites_dir(&self) -> PathBuf {
        self.data_root().join("favorites")
    }

    pub fn recent_dir(&self) -> PathBuf {
        self.data_root().join("recent")
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.data_root().join("documents")
    }

    pub fn user_plugin_dir(&self) -> PathBuf {
        self.data_root().join("plugins")
    }

    pub fn plugin_settings_dir(&self) -> PathBuf {
        self.data_root().join("plugin-settings")
    }

    pub fn enabled_plugins_file(&self) -> PathBuf {
        self.user_plugin_dir().join("enabled.conf")
    }

    /// Descriptor directories in precedence order: user, configured, system.
    pub fn plugin_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.user_plugin_dir()];
        dirs.extend(self.plugins.dirs.iter().cloned());
        dirs.extend(SYSTEM_PLUGIN_DIRS.iter().map(PathBuf::from));
        dirs
    }
}

pub fn config_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    toml::from_str(&content).map_err(|source| Error::Config {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config_from(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config.history.recent_size, 20);
        assert!(config.catalog.scan_path);
        assert_eq!(config.plugins.update_floor_ms, 1000);
        assert_eq!(config.plugins.service_name, "org.launcher.Launcher");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[general]\ndata_dir = \"/tmp/launcher\"\n[history]\nrecent_size = 5\n[catalog]\nexclude = [\"^Ads\"]\n",
        )
        .unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.history.recent_size, 5);
        assert_eq!(config.history.documents_size, 20);
        assert_eq!(config.catalog.exclude, vec!["^Ads"]);
        assert_eq!(config.favorites_dir(), PathBuf::from("/tmp/launcher/favorites"));
        assert_eq!(config.plugin_dirs()[0], PathBuf::from("/tmp/launcher/plugins"));
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[history]\nrecent_size = \"many\"\n").unwrap();
        assert!(matches!(load_config_from(&path), Err(Error::Config { .. })));
    }
}
