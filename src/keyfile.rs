//! Reader and writer for freedesktop key files: `[Group]` headers followed by
//! `Key=value` lines, with `Key[locale]` variants for translated values.

use crate::error::{Error, Result};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    name: String,
    entries: Vec<(String, String)>,
}

impl Group {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw value as written in the file, escapes untouched.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(unescape)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key).map(split_list).unwrap_or_default()
    }

    /// First present variant among the locale candidates, then the plain key.
    pub fn get_localized(&self, key: &str, locale: &Locale) -> Option<String> {
        locale
            .candidates()
            .iter()
            .find_map(|tag| self.get_string(&format!("{key}[{tag}]")))
            .or_else(|| self.get_string(key))
    }

    pub fn get_localized_list(&self, key: &str, locale: &Locale) -> Vec<String> {
        locale
            .candidates()
            .iter()
            .find_map(|tag| self.get(&format!("{key}[{tag}]")))
            .or_else(|| self.get(key))
            .map(split_list)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFile {
    groups: Vec<Group>,
}

impl KeyFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(content: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();

        for line in content.lines() {
            // Trailing whitespace belongs to the value.
            let line = line.trim_start();
            let trimmed = line.trim_end();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                groups.push(Group::new(&trimmed[1..trimmed.len() - 1]));
                continue;
            }

            // Keys before the first group header are ignored.
            let Some(group) = groups.last_mut() else {
                continue;
            };
            if let Some((key, value)) = line.split_once('=') {
                group.set(key.trim(), value.trim_start());
            }
        }

        Self { groups }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::parse(&content))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(path, self.to_string()).map_err(|e| Error::io(path, e))
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_mut(&mut self, name: &str) -> &mut Group {
        if let Some(pos) = self.groups.iter().position(|g| g.name == name) {
            return &mut self.groups[pos];
        }
        self.groups.push(Group::new(name));
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }
}

impl fmt::Display for KeyFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", group.name)?;
            for (key, value) in group.iter() {
                writeln!(f, "{key}={value}")?;
            }
        }
        Ok(())
    }
}

/// Locale used to pick `Key[locale]` variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locale {
    language: Option<String>,
    country: Option<String>,
}

impl Locale {
    /// Parses POSIX locale names such as `de_DE.UTF-8@euro`. `C` and `POSIX`
    /// carry no translation tag.
    pub fn parse(raw: &str) -> Self {
        let base = raw.split(['.', '@']).next().unwrap_or_default();
        if base.is_empty() || base == "C" || base == "POSIX" {
            return Self::default();
        }
        let (language, country) = match base.split_once(['_', '-']) {
            Some((lang, country)) => (lang, Some(country.to_string())),
            None => (base, None),
        };
        Self {
            language: Some(language.to_string()),
            country,
        }
    }

    pub fn from_env() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|v| !v.is_empty())
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    /// Tags tried in order: full `lang_COUNTRY`, then the language alone.
    pub fn candidates(&self) -> Vec<String> {
        let Some(language) = &self.language else {
            return Vec::new();
        };
        let mut tags = Vec::with_capacity(2);
        if let Some(country) = &self.country {
            tags.push(format!("{language}_{country}"));
        }
        tags.push(language.clone());
        tags
    }
}

const INDEX_GROUP: &str = "General";
const INDEX_KEY: &str = "Order";

/// Reads the ordered list stored in a one-value index file. A missing file is
/// an empty list.
pub fn read_index(path: &Path) -> Vec<String> {
    if !path.exists() {
        return Vec::new();
    }
    match KeyFile::load(path) {
        Ok(kf) => kf
            .group(INDEX_GROUP)
            .map(|g| g.get_list(INDEX_KEY))
            .unwrap_or_default(),
        Err(e) => {
            log::warn!("Failed to read index {:?}: {}", path, e);
            Vec::new()
        }
    }
}

pub fn write_index<S: AsRef<str>>(path: &Path, items: &[S]) -> Result<()> {
    let mut kf = KeyFile::new();
    kf.group_mut(INDEX_GROUP).set(INDEX_KEY, &join_list(items));
    kf.save(path)
}

pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            ' ' if i == 0 || i == last => out.push_str("\\s"),
            c => out.push(c),
        }
    }
    out
}

/// Splits a `;`-separated list value. `\;` keeps a literal semicolon and
/// commas are never separators.
pub fn split_list(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                chars.next();
                current.push(';');
            }
            '\\' => {
                current.push('\\');
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ';' => items.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| unescape(item.trim()))
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&escape(item.as_ref()).replace(';', "\\;"));
        out.push(';');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_groups_and_ignores_comments() {
        let kf = KeyFile::parse(
            "# comment\nOrphan=1\n[Desktop Entry]\nName = Files\nExec=nautilus\n\n[Desktop Action new]\nName=New\n",
        );
        let main = kf.group("Desktop Entry").unwrap();
        assert_eq!(main.get("Name"), Some("Files"));
        assert_eq!(main.get("Exec"), Some("nautilus"));
        assert_eq!(main.get("Orphan"), None);
        assert_eq!(kf.group("Desktop Action new").unwrap().get("Name"), Some("New"));
    }

    #[test]
    fn localized_lookup_prefers_full_tag_then_language() {
        let kf = KeyFile::parse("[G]\nName=Files\nName[de]=Dateien\nName[pt_BR]=Arquivos\n");
        let group = kf.group("G").unwrap();
        assert_eq!(
            group.get_localized("Name", &Locale::parse("pt_BR.UTF-8")).as_deref(),
            Some("Arquivos")
        );
        assert_eq!(
            group.get_localized("Name", &Locale::parse("de_AT.UTF-8")).as_deref(),
            Some("Dateien")
        );
        assert_eq!(
            group.get_localized("Name", &Locale::parse("C")).as_deref(),
            Some("Files")
        );
    }

    #[test]
    fn list_values_keep_commas_and_escaped_semicolons() {
        assert_eq!(
            split_list("Hello, World;a\\;b;;last"),
            vec!["Hello, World", "a;b", "last"]
        );
        assert_eq!(join_list(&["a;b", "c"]), "a\\;b;c;");
    }

    #[test]
    fn index_files_keep_their_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.conf");
        assert!(read_index(&path).is_empty());
        write_index(&path, &["b", "a", "c"]).unwrap();
        assert_eq!(read_index(&path), vec!["b", "a", "c"]);
    }

    #[test]
    fn escapes_survive_a_write_and_read() {
        let mut kf = KeyFile::new();
        kf.group_mut("G").set("Comment", &escape(" two\nlines \\ here"));
        let parsed = KeyFile::parse(&kf.to_string());
        assert_eq!(
            parsed.group("G").unwrap().get_string("Comment").as_deref(),
            Some(" two\nlines \\ here")
        );
    }

    #[test]
    fn trailing_spaces_are_kept() {
        assert_eq!(escape("Tool "), "Tool\\s");
        assert_eq!(escape("a b"), "a b");

        let mut kf = KeyFile::new();
        kf.group_mut("G").set("Name", &escape("Tool "));
        kf.group_mut("G").set("Comment", &escape("ends in space "));
        let parsed = KeyFile::parse(&kf.to_string());
        let group = parsed.group("G").unwrap();
        assert_eq!(group.get_string("Name").as_deref(), Some("Tool "));
        assert_eq!(group.get_string("Comment").as_deref(), Some("ends in space "));

        let raw = KeyFile::parse("  [G]  \r\nName=Tool  \r\n");
        assert_eq!(raw.group("G").unwrap().get("Name"), Some("Tool  "));
    }
}
