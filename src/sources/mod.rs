use crate::model::Entry;
use anyhow::Result;

/// Something that can enumerate launchable entries.
pub trait Source {
    fn scan(&self) -> Result<Vec<Entry>>;
}

pub mod bin;
pub mod desktop;
