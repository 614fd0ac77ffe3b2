use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use launcher::aggregator::{Category, Collection};
use launcher::bus::{Bus, MemoryBus, SessionBus};
use launcher::config::{load_config, load_config_from, Config};
use launcher::model::{Entry, ExecArgs};
use launcher::plugin::PluginGroup;
use launcher::{lock, Runtime, SharedShell, Shell};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file to use instead of the per-user one
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List installed applications
    List {
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Search applications by name, comment or keyword
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Launch an application, favorite or recent item
    Run { name: String, files: Vec<String> },
    Favorite { name: String },
    Unfavorite { name: String },
    /// Show favorites in display order
    Favorites,
    /// Move a favorite one slot towards the head, or the tail with --down
    Move {
        name: String,
        #[arg(long)]
        down: bool,
    },
    /// Hide an application from the catalog
    Hide { name: String },
    /// Recently run items, newest first
    Recent,
    /// Recently opened documents, newest first
    Documents,
    /// Open a file and remember it
    Open { path: PathBuf },
    /// List discovered plugins
    Plugins {
        #[arg(short, long)]
        group: Option<String>,
    },
    Enable { name: String },
    Disable { name: String },
    /// Publish the launcher and its plugins on the session bus
    Serve,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    if let Command::Serve = args.command {
        return serve(config);
    }

    let mut shell = Shell::new(config, Arc::new(MemoryBus::new()));
    match args.command {
        Command::List { category, json } => {
            shell.catalog.refresh();
            let entries = match category {
                Some(category) => {
                    if category.parse::<Category>().is_err() {
                        warn!("Unknown category '{}'", category);
                    }
                    shell.catalog.by_category(&category)
                }
                None => shell.catalog.all(),
            };
            print_entries(&entries, json)?;
        }
        Command::Search { query, json } => {
            shell.catalog.refresh();
            print_entries(&shell.search(&query), json)?;
        }
        Command::Run { name, files } => {
            shell.load_collections();
            let exec_args = ExecArgs::new()
                .with('F', files.clone())
                .with('U', files);
            if !shell.run(&name, &exec_args) {
                anyhow::bail!("Could not launch '{}'", name);
            }
        }
        Command::Favorite { name } => {
            shell.load_collections();
            shell.favorite(&name)?;
        }
        Command::Unfavorite { name } => {
            shell.favorites.refresh();
            shell.unfavorite(&name)?;
        }
        Command::Favorites => {
            shell.favorites.refresh();
            print_entries(&shell.favorites.ordered(), false)?;
        }
        Command::Move { name, down } => {
            shell.favorites.refresh();
            if !shell.move_favorite(&name, !down)? {
                info!("'{}' did not move", name);
            }
        }
        Command::Hide { name } => {
            shell.catalog.refresh();
            shell.hide(&name)?;
        }
        Command::Recent => {
            shell.recent.refresh();
            print_entries(&shell.recent.newest_first(), false)?;
        }
        Command::Documents => {
            shell.documents.refresh();
            print_entries(&shell.documents.newest_first(), false)?;
        }
        Command::Open { path } => {
            let path = std::path::absolute(&path)
                .with_context(|| format!("Cannot resolve {:?}", path))?;
            shell.documents.refresh();
            if !shell.open_document(&path) {
                anyhow::bail!("Could not open {:?}", path);
            }
        }
        Command::Plugins { group } => {
            let group = match group {
                Some(raw) => Some(
                    PluginGroup::parse(&raw)
                        .with_context(|| format!("Unknown plugin group '{}'", raw))?,
                ),
                None => None,
            };
            shell.registry.discover();
            let enabled = shell.registry.enabled();
            for (name, descriptor) in shell.registry.list_by_group(group) {
                let mark = if enabled.iter().any(|n| n == name) { "*" } else { " " };
                println!("{} {:<24} {:<14} {}", mark, name, descriptor.group, descriptor.version);
            }
        }
        Command::Enable { name } => {
            shell.registry.discover();
            if shell.registry.descriptor(&name).is_none() {
                warn!("No plugin named '{}' is installed", name);
            }
            shell.registry.enable(&name)?;
        }
        Command::Disable { name } => shell.registry.disable(&name)?,
        Command::Serve => {}
    }

    Ok(())
}

fn print_entries(entries: &[&Entry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    for entry in entries {
        if entry.comment.is_empty() {
            println!("{}", entry.name);
        } else {
            println!("{}\t{}", entry.name, entry.comment);
        }
    }
    Ok(())
}

fn serve(config: Config) -> Result<()> {
    let service_name = config.plugins.service_name.clone();

    // Block the signals before the bus spawns its threads.
    let mut runtime = Runtime::new()?;
    runtime.stop_on_signals()?;

    let mut session = None;
    let bus: Arc<dyn Bus> = if config.plugins.bus {
        match SessionBus::connect() {
            Ok(connected) => {
                let connected = Arc::new(connected);
                session = Some(connected.clone());
                connected
            }
            Err(e) => {
                warn!("Session bus unavailable, keeping plugins in-process: {}", e);
                Arc::new(MemoryBus::new())
            }
        }
    } else {
        Arc::new(MemoryBus::new())
    };

    let mut shell: SharedShell = Arc::new(Mutex::new(Shell::new(config, bus.clone())));
    runtime.watch_requests(&shell)?;
    lock(&shell).boot();
    bus.claim_name(&service_name)?;
    if let Some(session) = &session {
        session.serve_host(shell.clone())?;
    }
    let timers = runtime.sync_timers(&shell)?;
    info!("Serving as {} with {} widget timers", service_name, timers);

    runtime.run(&mut shell)?;

    info!("Shutting down");
    lock(&shell).shutdown();
    Ok(())
}
