use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod desktop_file;
pub mod exec;

pub use exec::{ExecArgs, ExecValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EntryType {
    #[default]
    Application,
    Link,
    Directory,
}

impl EntryType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Application" => Some(EntryType::Application),
            "Link" => Some(EntryType::Link),
            "Directory" => Some(EntryType::Directory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Application => "Application",
            EntryType::Link => "Link",
            EntryType::Directory => "Directory",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A launchable resource backed by a desktop entry file.
///
/// Text fields use the empty string for "unset"; only non-empty values are
/// written back by [`Entry::save`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Entry {
    pub entry_type: EntryType,
    pub name: String,
    pub generic_name: String,
    pub comment: String,
    pub icon: String,
    pub exec: String,
    pub try_exec: String,
    /// Working directory for applications, the target for directories.
    pub path: String,
    pub url: String,
    pub terminal: bool,
    pub categories: Vec<String>,
    pub keywords: Vec<String>,
    pub mime_types: Vec<String>,
    pub hidden: bool,
    pub no_display: bool,
    /// Last modification marker kept by the history collections.
    pub modified: Option<DateTime<Local>>,
    /// File name inside the owning directory, e.g. `firefox.desktop`.
    pub file_name: Option<String>,
    /// Where the entry was read from, if it came from disk.
    #[serde(skip)]
    pub source: Option<PathBuf>,
    /// Every raw key of the entry group, as read.
    #[serde(skip)]
    pub properties: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Synthetic application entry for a bare executable.
    pub fn from_executable(path: &Path) -> Self {
        let mut entry = Self {
            exec: path.to_string_lossy().to_string(),
            ..Default::default()
        };
        entry.ensure_name();
        entry
    }

    pub fn link(name: &str, url: &str) -> Self {
        Self {
            entry_type: EntryType::Link,
            name: name.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn should_be_shown(&self) -> bool {
        !self.hidden && !self.no_display
    }

    pub fn entry_file_name(&self) -> String {
        match &self.file_name {
            Some(file_name) if !file_name.is_empty() => file_name.clone(),
            _ => format!("{}.desktop", sanitize_file_stem(&self.name)),
        }
    }

    pub fn has_substring(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.name, &self.generic_name, &self.comment]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
            || self
                .keywords
                .iter()
                .any(|keyword| keyword.to_lowercase().contains(&needle))
    }

    /// Fills an empty name from the executable, the file name or the URL.
    pub fn ensure_name(&mut self) {
        if !self.name.is_empty() {
            return;
        }

        let from_exec = self
            .exec
            .split_whitespace()
            .next()
            .and_then(|cmd| Path::new(cmd).file_name())
            .map(|n| n.to_string_lossy().to_string());
        let from_file = self
            .file_name
            .as_deref()
            .and_then(|f| Path::new(f).file_stem())
            .map(|n| n.to_string_lossy().to_string());

        self.name = from_exec
            .or(from_file)
            .unwrap_or_else(|| self.url.clone());
    }

    pub fn launch(&self, args: &ExecArgs, terminal: Option<&str>) -> bool {
        crate::executor::launch(self, args, terminal)
    }
}

fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c == '/' || c == '\0' { '_' } else { c })
        .collect();
    if stem.is_empty() { "entry".to_string() } else { stem }
}
