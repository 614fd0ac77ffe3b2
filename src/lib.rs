//! Application launcher core: a catalog of desktop entries, bounded run and
//! document histories, ordered favorites, and a registry of native plugins
//! published on the session bus.

pub mod aggregator;
pub mod bus;
pub mod config;
pub mod error;
pub mod executor;
pub mod keyfile;
pub mod matcher;
pub mod model;
pub mod plugin;
pub mod runtime;
pub mod sources;
pub mod state;

pub use error::{Error, Result};
pub use runtime::Runtime;
pub use state::{lock, SharedShell, Shell};
