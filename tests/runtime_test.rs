mod common;

use common::*;
use launcher::aggregator::Catalog;
use launcher::bus::MemoryBus;
use launcher::config::Config;
use launcher::plugin::{PluginRegistry, RegistrySettings, SharedHandle};
use launcher::{lock, Runtime, SharedShell, Shell};
use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};

struct Fixture {
    _root: TempDir,
    shell: SharedShell,
}

fn fixture(update_floor: Duration) -> Fixture {
    let root = tempdir().unwrap();
    let plugins = root.path().join("plugins");
    fs::create_dir_all(&plugins).unwrap();
    write_descriptor(&plugins, "Clock", "simple-widget");
    write_descriptor(&plugins, "Browser", "tab");

    let mut config = Config::default();
    config.general.data_dir = Some(root.path().join("data"));
    let settings = RegistrySettings {
        descriptor_dirs: vec![plugins],
        settings_dir: root.path().join("settings"),
        enabled_file: root.path().join("enabled.conf"),
        service_name: "org.launcher.Test".to_string(),
        update_floor,
    };
    let registry = PluginRegistry::new(settings, Box::new(static_loader()), Arc::new(MemoryBus::new()));
    let catalog = Catalog::new(Vec::new(), None, &[]);
    let mut shell = Shell::with_parts(config, catalog, registry);
    shell.registry.discover();

    Fixture {
        _root: root,
        shell: Arc::new(Mutex::new(shell)),
    }
}

fn load(shell: &SharedShell, name: &str) -> (usize, SharedHandle) {
    let mut shell = lock(shell);
    let index = shell.registry.load(name).unwrap();
    let handle = shell.registry.instance(index).unwrap().capability.handle().clone();
    (index, handle)
}

/// Dispatches until `done` holds or five seconds pass.
fn dispatch_until(runtime: &mut Runtime, shell: &mut SharedShell, done: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() && Instant::now() < deadline {
        runtime.dispatch(Some(Duration::from_millis(20)), shell).unwrap();
    }
}

#[test]
fn widget_timers_fire_on_the_loop() {
    let mut f = fixture(Duration::from_millis(20));
    let (_, clock) = load(&f.shell, "Clock");
    load(&f.shell, "Browser");

    let mut runtime = Runtime::new().unwrap();
    assert_eq!(runtime.sync_timers(&f.shell).unwrap(), 1);
    assert_eq!(runtime.sync_timers(&f.shell).unwrap(), 0);

    dispatch_until(&mut runtime, &mut f.shell, || updates(&clock) >= 2);
    assert!(updates(&clock) >= 2);
}

#[test]
fn host_requests_are_served_by_the_loop() {
    let mut f = fixture(Duration::from_secs(3600));
    let (_, clock) = load(&f.shell, "Clock");

    let mut runtime = Runtime::new().unwrap();
    runtime.watch_requests(&f.shell).unwrap();
    runtime.sync_timers(&f.shell).unwrap();

    launcher::plugin::handle::lock(&clock).activate();
    assert_eq!(updates(&clock), 0);

    dispatch_until(&mut runtime, &mut f.shell, || updates(&clock) >= 1);
    assert_eq!(updates(&clock), 1);
}

#[test]
fn timers_of_unloaded_instances_stop() {
    let mut f = fixture(Duration::from_millis(20));
    let (index, old) = load(&f.shell, "Clock");

    let mut runtime = Runtime::new().unwrap();
    runtime.sync_timers(&f.shell).unwrap();
    {
        let mut shell = lock(&f.shell);
        let settings = shell.registry.settings_path(index).unwrap();
        shell.registry.unload(index, &settings);
    }

    // The reused index belongs to a new instance with its own timer.
    let (reused, new) = load(&f.shell, "Clock");
    assert_eq!(reused, index);
    assert_eq!(runtime.sync_timers(&f.shell).unwrap(), 1);

    dispatch_until(&mut runtime, &mut f.shell, || updates(&new) >= 3);
    assert!(updates(&new) >= 3);
    assert_eq!(updates(&old), 0);
}

#[test]
fn run_returns_once_stopped() {
    let mut f = fixture(Duration::from_secs(3600));
    let mut runtime = Runtime::new().unwrap();
    let signal = runtime.signal();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        signal.stop();
        signal.wakeup();
    });
    runtime.run(&mut f.shell).unwrap();
    stopper.join().unwrap();
}
