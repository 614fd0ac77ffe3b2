//! Reading and writing entries as `[Desktop Entry]` files.

use super::{Entry, EntryType};
use crate::error::{Error, Result};
use crate::keyfile::{self, Group, KeyFile, Locale};
use chrono::{DateTime, Local};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENTRY_GROUP: &str = "Desktop Entry";
pub const MODIFIED_KEY: &str = "X-Launcher-Modified";

/// Vendor quirk: some desktop environments write the link target as `URL[$e]`.
const QUIRK_URL_KEY: &str = "URL[$e]";

impl Entry {
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_with_locale(path, &Locale::from_env())
    }

    pub fn from_file_with_locale(path: &Path, locale: &Locale) -> Result<Self> {
        let key_file = KeyFile::load(path)?;
        let mut entry = Self::from_key_file(&key_file, locale);
        entry.file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string());
        entry.source = Some(path.to_path_buf());
        entry.ensure_name();
        Ok(entry)
    }

    /// Builds an entry from the `[Desktop Entry]` group. Malformed values fall
    /// back to defaults; a file without the group yields a blank entry.
    pub fn from_key_file(key_file: &KeyFile, locale: &Locale) -> Self {
        let empty = Group::new(ENTRY_GROUP);
        let group = key_file.group(ENTRY_GROUP).unwrap_or(&empty);

        let mut entry = Entry::default();
        for (key, value) in group.iter() {
            entry.properties.insert(key.to_string(), value.to_string());
        }
        if let Some(url) = entry.properties.remove(QUIRK_URL_KEY) {
            debug!("Remapping {} to URL", QUIRK_URL_KEY);
            entry.properties.entry("URL".to_string()).or_insert(url);
        }

        entry.entry_type = match group.get("Type") {
            None => EntryType::Application,
            Some(raw) => EntryType::parse(raw).unwrap_or_else(|| {
                warn!("Unknown entry type '{}', treating it as Application", raw);
                EntryType::Application
            }),
        };

        entry.name = group.get_localized("Name", locale).unwrap_or_default();
        entry.generic_name = group.get_localized("GenericName", locale).unwrap_or_default();
        entry.comment = group.get_localized("Comment", locale).unwrap_or_default();
        entry.icon = group.get_localized("Icon", locale).unwrap_or_default();

        entry.categories = group.get_localized_list("Categories", locale);
        entry.keywords = group.get_localized_list("Keywords", locale);
        entry.mime_types = group.get_localized_list("MimeType", locale);

        let string = |key: &str| {
            entry
                .properties
                .get(key)
                .map(|v| keyfile::unescape(v))
                .unwrap_or_default()
        };
        let exec = string("Exec");
        let try_exec = string("TryExec");
        let path = string("Path");
        let url = string("URL");
        entry.exec = exec;
        entry.try_exec = try_exec;
        entry.path = path;
        entry.url = url;

        entry.terminal = group.get_bool("Terminal").unwrap_or(false);
        entry.hidden = group.get_bool("Hidden").unwrap_or(false);
        entry.no_display = group.get_bool("NoDisplay").unwrap_or(false);

        entry.modified = group.get(MODIFIED_KEY).and_then(|raw| {
            DateTime::parse_from_rfc3339(raw.trim())
                .map(|t| t.with_timezone(&Local))
                .map_err(|e| warn!("Ignoring malformed {} '{}': {}", MODIFIED_KEY, raw, e))
                .ok()
        });

        entry
    }

    /// Known, non-empty properties as a key file.
    pub fn to_key_file(&self) -> KeyFile {
        let mut key_file = KeyFile::new();
        let group = key_file.group_mut(ENTRY_GROUP);

        group.set("Type", self.entry_type.as_str());

        let strings = [
            ("Name", &self.name),
            ("GenericName", &self.generic_name),
            ("Comment", &self.comment),
            ("Icon", &self.icon),
            ("Exec", &self.exec),
            ("TryExec", &self.try_exec),
            ("Path", &self.path),
            ("URL", &self.url),
        ];
        for (key, value) in strings {
            if !value.is_empty() {
                group.set(key, &keyfile::escape(value));
            }
        }

        let lists = [
            ("Categories", &self.categories),
            ("Keywords", &self.keywords),
            ("MimeType", &self.mime_types),
        ];
        for (key, values) in lists {
            if !values.is_empty() {
                group.set(key, &keyfile::join_list(values));
            }
        }

        let flags = [
            ("Terminal", self.terminal),
            ("Hidden", self.hidden),
            ("NoDisplay", self.no_display),
        ];
        for (key, value) in flags {
            if value {
                group.set(key, "true");
            }
        }

        if let Some(modified) = &self.modified {
            group.set(
                MODIFIED_KEY,
                &modified.to_rfc3339_opts(chrono::SecondsFormat::Nanos, false),
            );
        }

        key_file
    }

    /// Writes the entry to `dir/<entry file name>` and returns that path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.entry_file_name());
        self.to_key_file().save(&path).map_err(|e| {
            warn!("Failed to save entry '{}': {}", self.name, e);
            e
        })?;
        debug!("Saved entry '{}' to {:?}", self.name, path);
        Ok(path)
    }

    pub fn remove(&self, dir: &Path) -> Result<()> {
        let path = dir.join(self.entry_file_name());
        fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
        debug!("Removed entry file {:?}", path);
        Ok(())
    }
}
