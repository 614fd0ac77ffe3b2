use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No entry named '{0}'")]
    NoSuchEntry(String),

    #[error("Unknown plugin '{0}'")]
    UnknownPlugin(String),

    #[error("Plugin '{plugin}' declares unknown group '{group}'")]
    UnknownGroup { plugin: String, group: String },

    #[error("Failed to open module '{path}' for plugin '{plugin}': {source}")]
    ModuleOpen {
        plugin: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("Entry symbol '{symbol}' not found in '{path}' for plugin '{plugin}'")]
    SymbolNotFound {
        plugin: String,
        path: PathBuf,
        symbol: String,
    },

    #[error("Incompatible ABI for plugin '{plugin}': expected {expected}, found {found}")]
    AbiMismatch {
        plugin: String,
        expected: u32,
        found: u32,
    },

    #[error("Plugin '{plugin}' does not implement the '{group}' capability set")]
    GroupMismatch { plugin: String, group: String },

    #[error("Invalid bus object path '{0}'")]
    ObjectPath(String),

    #[error("Object path '{0}' is already published")]
    PathInUse(String),

    #[error("Bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("Event loop error: {0}")]
    EventLoop(#[from] calloop::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
