use crate::model::{Entry, EntryType, ExecArgs};
use log::{debug, error, info, warn};
use std::env;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

const DEFAULT_WORKING_DIR: &str = "/";
const URL_HANDLER: &str = "xdg-open";

/// Terminal command prefix: the configured command verbatim, otherwise
/// `$TERMINAL -e`.
pub fn terminal_command(configured: Option<&str>) -> Option<String> {
    if let Some(cmd) = configured.filter(|c| !c.trim().is_empty()) {
        return Some(cmd.to_string());
    }
    env::var("TERMINAL")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .map(|t| format!("{} -e", t.trim()))
}

pub fn launch(entry: &Entry, args: &ExecArgs, terminal: Option<&str>) -> bool {
    match entry.entry_type {
        EntryType::Application => launch_application(entry, args, terminal),
        EntryType::Link => {
            if entry.url.is_empty() {
                warn!("Link '{}' has no URL", entry.name);
                return false;
            }
            open_url(&entry.url)
        }
        EntryType::Directory => {
            let dir = if entry.path.is_empty() {
                DEFAULT_WORKING_DIR
            } else {
                entry.path.as_str()
            };
            open_url(&format!("file://{}", dir))
        }
    }
}

fn launch_application(entry: &Entry, args: &ExecArgs, terminal: Option<&str>) -> bool {
    if !entry.try_exec.is_empty() && !is_resolvable(&entry.try_exec) {
        warn!(
            "Skipping '{}': TryExec '{}' is not available",
            entry.name, entry.try_exec
        );
        return false;
    }

    let tokens = entry.generate_exec(args, terminal);
    if tokens.is_empty() {
        warn!("'{}' has nothing to execute", entry.name);
        return false;
    }

    let dir = if entry.path.is_empty() {
        DEFAULT_WORKING_DIR
    } else {
        entry.path.as_str()
    };

    match spawn_detached(&tokens, Path::new(dir)) {
        Ok(()) => {
            info!("Launched '{}': {:?}", entry.name, tokens);
            true
        }
        Err(e) => {
            error!("Failed to launch '{}': {}", entry.name, e);
            false
        }
    }
}

pub fn open_url(url: &str) -> bool {
    let tokens = [URL_HANDLER.to_string(), url.to_string()];
    match spawn_detached(&tokens, Path::new(DEFAULT_WORKING_DIR)) {
        Ok(()) => {
            debug!("Opened {}", url);
            true
        }
        Err(e) => {
            error!("Failed to open {}: {}", url, e);
            false
        }
    }
}

fn is_resolvable(program: &str) -> bool {
    let path = Path::new(program);
    if path.is_absolute() {
        return path
            .metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false);
    }
    which::which(program).is_ok()
}

/// Starts the command as the leader of a new process group. A background
/// thread reaps it.
fn spawn_detached(tokens: &[String], dir: &Path) -> io::Result<()> {
    let Some((program, rest)) = tokens.split_first() else {
        return Ok(());
    };

    let mut command = Command::new(program);
    command
        .args(rest)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0);

    let mut child = command.spawn()?;
    thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_try_exec_skips_launch() {
        let mut entry = Entry::new("ghost");
        entry.exec = "true".to_string();
        entry.try_exec = "definitely-not-installed-binary-xyz".to_string();
        assert!(!launch(&entry, &ExecArgs::new(), None));
    }

    #[test]
    fn empty_command_is_not_launched() {
        let entry = Entry::new("empty");
        assert!(!launch(&entry, &ExecArgs::new(), None));
    }

    #[test]
    fn configured_terminal_wins() {
        assert_eq!(
            terminal_command(Some("alacritty -e")).as_deref(),
            Some("alacritty -e")
        );
    }

    #[test]
    fn absolute_try_exec_must_be_executable() {
        assert!(is_resolvable("/bin/sh"));
        assert!(!is_resolvable("/nonexistent/tool"));
    }

    #[test]
    fn detached_commands_lead_their_own_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("ids");
        let script = format!(
            "echo $$ $(cut -d' ' -f5 /proc/$$/stat) > {}.tmp && mv {0}.tmp {0}",
            out.display()
        );
        spawn_detached(&["sh".to_string(), "-c".to_string(), script], dir.path()).unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !out.exists() && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(20));
        }
        let ids = std::fs::read_to_string(&out).unwrap();
        let ids: Vec<&str> = ids.split_whitespace().collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1]);
    }
}
