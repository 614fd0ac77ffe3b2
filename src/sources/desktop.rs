use crate::model::Entry;
use crate::sources::Source;
use anyhow::Result;
use directories::BaseDirs;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DEFAULT_DATA_DIRS: &str = "/usr/local/share:/usr/share";

/// Desktop entries found under a list of application directories. Earlier
/// directories shadow later ones by desktop-file id.
pub struct DesktopSource {
    pub dirs: Vec<PathBuf>,
}

impl DesktopSource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// `$XDG_DATA_HOME/applications` followed by every
    /// `$XDG_DATA_DIRS/applications`.
    pub fn standard_dirs() -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(base_dirs) = BaseDirs::new() {
            dirs.push(base_dirs.data_dir().join("applications"));
        }

        let data_dirs = env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIRS.to_string());
        for dir in data_dirs.split(':').filter(|d| !d.is_empty()) {
            let apps = Path::new(dir).join("applications");
            if !dirs.contains(&apps) {
                dirs.push(apps);
            }
        }
        dirs
    }
}

impl Source for DesktopSource {
    fn scan(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        let mut seen_ids = HashSet::new();

        for dir in &self.dirs {
            if !dir.exists() {
                continue;
            }
            debug!("Scanning desktop files in {:?}", dir);

            // The directory itself plus one level of subdirectories.
            for item in WalkDir::new(dir)
                .max_depth(2)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = item.path();
                if path.extension().and_then(|s| s.to_str()) != Some("desktop") {
                    continue;
                }
                let id = desktop_file_id(dir, path);
                if !seen_ids.insert(id.clone()) {
                    continue;
                }

                match Entry::from_file(path) {
                    Ok(mut entry) if entry.should_be_shown() => {
                        entry.file_name = Some(id);
                        entries.push(entry);
                    }
                    Ok(_) => debug!("Skipping hidden entry {:?}", path),
                    Err(e) => warn!("Skipping unreadable entry {:?}: {}", path, e),
                }
            }
        }
        info!("DesktopSource: found {} entries", entries.len());
        Ok(entries)
    }
}

/// `kde/okular.desktop` under a root becomes `kde-okular.desktop`.
fn desktop_file_id(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('/', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn user_directory_shadows_system_entry() {
        let user = tempdir().unwrap();
        let system = tempdir().unwrap();
        fs::write(
            user.path().join("app.desktop"),
            "[Desktop Entry]\nName=App\nExec=app\nHidden=true\n",
        )
        .unwrap();
        fs::write(
            system.path().join("app.desktop"),
            "[Desktop Entry]\nName=App\nExec=app\n",
        )
        .unwrap();
        fs::write(
            system.path().join("other.desktop"),
            "[Desktop Entry]\nName=Other\nExec=other\n",
        )
        .unwrap();

        let source = DesktopSource::new(vec![user.path().to_path_buf(), system.path().to_path_buf()]);
        let names: Vec<String> = source.scan().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Other"]);
    }

    #[test]
    fn scans_one_level_of_subdirectories() {
        let root = tempdir().unwrap();
        let nested = root.path().join("vendor");
        let too_deep = nested.join("deeper");
        fs::create_dir_all(&too_deep).unwrap();
        fs::write(nested.join("a.desktop"), "[Desktop Entry]\nName=A\nExec=a\n").unwrap();
        fs::write(too_deep.join("b.desktop"), "[Desktop Entry]\nName=B\nExec=b\n").unwrap();

        let source = DesktopSource::new(vec![root.path().to_path_buf()]);
        let names: Vec<String> = source.scan().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["A"]);
    }
}
