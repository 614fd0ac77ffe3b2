//! Session-bus transport: plugin and host adaptors served through zbus.

use super::{Adaptor, Bus};
use crate::error::{Error, Result};
use crate::model::ExecArgs;
use crate::plugin::handle::{self, SharedHandle};
use crate::plugin::PluginGroup;
use crate::state::{lock, SharedShell, Shell};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use zbus::blocking::Connection;
use zbus::dbus_interface;
use zbus::fdo;
use zbus::zvariant::ObjectPath;

pub const HOST_PATH: &str = "/org/launcher/Launcher";

pub struct SessionBus {
    connection: Connection,
    claimed: Mutex<HashSet<String>>,
}

impl SessionBus {
    pub fn connect() -> Result<Self> {
        let connection = Connection::session()?;
        info!("Connected to the session bus");
        Ok(Self::with_connection(connection))
    }

    pub fn with_connection(connection: Connection) -> Self {
        Self {
            connection,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Publishes the launcher's own operations at [`HOST_PATH`].
    pub fn serve_host(&self, shell: SharedShell) -> Result<()> {
        self.connection
            .object_server()
            .at(HOST_PATH, HostInterface { shell })?;
        info!("Host interface published at {}", HOST_PATH);
        Ok(())
    }
}

fn checked_path(path: &str) -> Result<&str> {
    ObjectPath::try_from(path).map_err(|_| Error::ObjectPath(path.to_string()))?;
    Ok(path)
}

impl Bus for SessionBus {
    fn claim_name(&self, name: &str) -> Result<()> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        if claimed.contains(name) {
            return Ok(());
        }
        self.connection.request_name(name)?;
        info!("Claimed service name {}", name);
        claimed.insert(name.to_string());
        Ok(())
    }

    fn publish(&self, path: &str, adaptor: Adaptor) -> Result<()> {
        let path = checked_path(path)?;
        let server = self.connection.object_server();
        let handle = adaptor.handle;

        if !server.at(path, PluginInterface { handle: handle.clone() })? {
            return Err(Error::PathInUse(path.to_string()));
        }
        let added = match adaptor.group {
            PluginGroup::SimpleWidget => server.at(path, SimpleWidgetInterface { handle }),
            PluginGroup::Tab => server.at(path, TabInterface { handle }),
            PluginGroup::Generic => server.at(path, GenericInterface { handle }),
        };
        let failure = match added {
            Ok(true) => None,
            Ok(false) => Some(Error::PathInUse(path.to_string())),
            Err(e) => Some(Error::from(e)),
        };
        if let Some(e) = failure {
            if let Err(rollback) = server.remove::<PluginInterface, _>(path) {
                warn!("Failed to roll back {}: {}", path, rollback);
            }
            return Err(e);
        }
        debug!("Published '{}' instance {} at {}", adaptor.name, adaptor.index, path);
        Ok(())
    }

    fn withdraw(&self, path: &str, group: PluginGroup) -> Result<()> {
        let path = checked_path(path)?;
        let server = self.connection.object_server();

        server.remove::<PluginInterface, _>(path)?;
        match group {
            PluginGroup::SimpleWidget => server.remove::<SimpleWidgetInterface, _>(path)?,
            PluginGroup::Tab => server.remove::<TabInterface, _>(path)?,
            PluginGroup::Generic => server.remove::<GenericInterface, _>(path)?,
        };
        debug!("Withdrew {}", path);
        Ok(())
    }
}

struct PluginInterface {
    handle: SharedHandle,
}

#[dbus_interface(name = "org.launcher.Plugin")]
impl PluginInterface {
    fn init(&self) {
        handle::lock(&self.handle).init();
    }

    fn quit(&self, config_path: String) {
        handle::lock(&self.handle).quit(Path::new(&config_path));
    }

    fn read_settings(&self, config_path: String) {
        handle::lock(&self.handle).read_settings(Path::new(&config_path));
    }

    fn save_settings(&self) {
        handle::lock(&self.handle).save_settings();
    }

    fn write_settings(&self, config_path: String) {
        handle::lock(&self.handle).write_settings(Path::new(&config_path));
    }

    fn update(&self) {
        handle::lock(&self.handle).update();
    }
}

struct SimpleWidgetInterface {
    handle: SharedHandle,
}

#[dbus_interface(name = "org.launcher.SimpleWidget")]
impl SimpleWidgetInterface {
    fn background(&self) -> String {
        handle::lock(&self.handle).background()
    }

    fn data(&self) -> String {
        handle::lock(&self.handle).data()
    }

    fn height(&self) -> i32 {
        handle::lock(&self.handle).height()
    }

    fn width(&self) -> i32 {
        handle::lock(&self.handle).width()
    }

    fn update_interval(&self) -> i32 {
        handle::lock(&self.handle).interval()
    }

    fn activate(&self) {
        handle::lock(&self.handle).activate();
    }
}

struct TabInterface {
    handle: SharedHandle,
}

#[dbus_interface(name = "org.launcher.Tab")]
impl TabInterface {
    fn widget(&self) -> u64 {
        handle::lock(&self.handle).widget()
    }

    fn update(&self) {
        handle::lock(&self.handle).update();
    }
}

struct GenericInterface {
    handle: SharedHandle,
}

#[dbus_interface(name = "org.launcher.Generic")]
impl GenericInterface {
    fn config_widget(&self) -> u64 {
        handle::lock(&self.handle).config_widget()
    }
}

struct HostInterface {
    shell: SharedShell,
}

impl HostInterface {
    fn shell(&self) -> MutexGuard<'_, Shell> {
        lock(&self.shell)
    }
}

fn failed(e: Error) -> fdo::Error {
    fdo::Error::Failed(e.to_string())
}

#[dbus_interface(name = "org.launcher.Launcher")]
impl HostInterface {
    fn run(&self, name: String) -> bool {
        self.shell().run(&name, &ExecArgs::new())
    }

    fn favorite(&self, name: String) -> fdo::Result<()> {
        self.shell().favorite(&name).map_err(failed)
    }

    fn unfavorite(&self, name: String) -> fdo::Result<()> {
        self.shell().unfavorite(&name).map_err(failed)
    }

    fn hide(&self, name: String) -> fdo::Result<()> {
        self.shell().hide(&name).map_err(failed)
    }

    fn touch_recent(&self, name: String) -> fdo::Result<()> {
        self.shell().touch_recent(&name).map_err(failed)
    }

    fn open_document(&self, path: String) -> bool {
        self.shell().open_document(Path::new(&path))
    }

    fn search(&self, query: String) -> Vec<String> {
        self.shell()
            .search(&query)
            .into_iter()
            .map(|entry| entry.name.clone())
            .collect()
    }
}
